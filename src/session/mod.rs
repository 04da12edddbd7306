//! # Session Module
//!
//! Connects the packet decoder to a publish/subscribe transport.
//!
//! This module handles:
//! - Deriving data and command topics from the device MAC address
//! - Starting and halting the device stream
//! - Decoding inbound buffers and keeping a bounded display history
//! - Reporting packet-index gaps (detection only, no recovery)

pub mod replay;
pub mod sink;
pub mod transport;

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::command::StreamCommand;
use crate::config::SessionConfig;
use crate::error::{FasciaError, Result};
use crate::packet::decoder::{DecodedRecord, PacketDecoder};
use crate::packet::format::render_decoded;
use transport::{QoS, Transport};

/// Prefix of the topic the device streams packets on
pub const DATA_TOPIC_PREFIX: &str = "fascia_";

/// Prefix of the topic the device listens for commands on
pub const COMMAND_TOPIC_PREFIX: &str = "/PortalMessages_";

/// Device MAC address as entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// # Errors
    ///
    /// Returns `DeviceAddressRequired` if the address is blank
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(FasciaError::DeviceAddressRequired);
        }
        Ok(Self(address.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Topic carrying packet buffers (`fascia_{mac}`)
    pub fn data_topic(&self) -> String {
        format!("{}{}", DATA_TOPIC_PREFIX, self.0)
    }

    /// Topic accepting stream commands (`/PortalMessages_{mac}`)
    pub fn command_topic(&self) -> String {
        format!("{}{}", COMMAND_TOPIC_PREFIX, self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connection state shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Subscribed(String),
    SubscriptionFailed(String),
    Closed,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Attempting to connect..."),
            Self::Subscribed(topic) => write!(f, "Connected and subscribed to {}", topic),
            Self::SubscriptionFailed(e) => write!(f, "Subscription error: {}", e),
            Self::Closed => write!(f, "Connection closed"),
        }
    }
}

/// One inbound buffer after decoding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivedPacket {
    pub received_at: DateTime<Utc>,

    /// Decoded channels, `None` if the buffer was malformed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<DecodedRecord>,

    /// Rendered text block, or the parse error text
    #[serde(skip)]
    pub text: String,

    /// Decode failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Display collaborator receiving every decoded packet
#[cfg_attr(test, mockall::automock)]
pub trait RecordSink {
    fn show(&mut self, packet: &ReceivedPacket);
}

/// Packet counters for the lifetime of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Buffers received
    pub received: u64,
    /// Buffers that failed to decode
    pub parse_errors: u64,
    /// Packet indices skipped between consecutive packets
    pub missing: u64,
    /// Packets whose index did not advance
    pub out_of_order: u64,
}

/// Streaming session with one device
pub struct Session<T: Transport> {
    transport: T,
    device: DeviceAddress,
    decoder: PacketDecoder,
    command_qos: QoS,
    history_limit: usize,
    history: VecDeque<String>,
    status: ConnectionStatus,
    streaming: bool,
    last_packet_number: Option<i32>,
    stats: SessionStats,
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.device)
            .field("status", &self.status)
            .field("streaming", &self.streaming)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Subscribe to the device data topic
    ///
    /// A failed subscription does not fail the call; it is reported through
    /// [`Session::status`] as the connection itself stays usable.
    ///
    /// # Errors
    ///
    /// Returns error if the address is blank or the configured QoS is invalid
    pub async fn connect(
        mut transport: T,
        address: &str,
        decoder: PacketDecoder,
        config: &SessionConfig,
    ) -> Result<Self> {
        let device = DeviceAddress::parse(address)?;
        let command_qos = QoS::try_from(config.command_qos)?;

        let topic = device.data_topic();
        info!("Subscribing to topic: {}", topic);

        let status = match transport.subscribe(&topic).await {
            Ok(()) => {
                info!("Subscribed to {}", topic);
                ConnectionStatus::Subscribed(topic)
            }
            Err(e) => {
                error!("Subscription error: {}", e);
                ConnectionStatus::SubscriptionFailed(e.to_string())
            }
        };

        Ok(Self {
            transport,
            device,
            decoder,
            command_qos,
            history_limit: config.history_limit.max(1),
            history: VecDeque::new(),
            status,
            streaming: false,
            last_packet_number: None,
            stats: SessionStats::default(),
        })
    }

    pub fn device(&self) -> &DeviceAddress {
        &self.device
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self.status, ConnectionStatus::Subscribed(_))
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Rendered packets, oldest first
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Ask the device to start streaming (`'D'`)
    pub async fn start_stream(&mut self) -> Result<()> {
        self.send_command(StreamCommand::Start).await
    }

    /// Ask the device to halt streaming (`'H'`)
    pub async fn stop_stream(&mut self) -> Result<()> {
        self.send_command(StreamCommand::Halt).await
    }

    /// Publish a command to the device command topic
    ///
    /// The streaming flag changes only once the transport confirms delivery.
    pub async fn send_command(&mut self, command: StreamCommand) -> Result<()> {
        let topic = self.device.command_topic();
        info!("Sending command {} to topic: {}", command, topic);

        match self
            .transport
            .publish(&topic, &command.payload(), self.command_qos)
            .await
        {
            Ok(()) => {
                info!("Command {} sent successfully", command);
                self.streaming = command.streaming_after();
                Ok(())
            }
            Err(e) => {
                error!("Error sending command {}: {}", command, e);
                Err(e)
            }
        }
    }

    /// Decode one inbound buffer and append its text to the history
    pub fn handle_buffer(&mut self, buffer: &[u8]) -> ReceivedPacket {
        let received_at = Utc::now();
        self.stats.received += 1;

        let decoded = self.decoder.decode(buffer);
        let text = render_decoded(&decoded);

        let packet = match decoded {
            Ok(record) => {
                self.track_sequence(&record);
                ReceivedPacket {
                    received_at,
                    record: Some(record),
                    text,
                    error: None,
                }
            }
            Err(e) => {
                self.stats.parse_errors += 1;
                ReceivedPacket {
                    received_at,
                    record: None,
                    text,
                    error: Some(e.to_string()),
                }
            }
        };

        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(packet.text.clone());

        packet
    }

    /// Forward inbound buffers to `sink` until the transport ends
    ///
    /// The streaming flag is left as is, so a later [`Session::disconnect`]
    /// still halts the device.
    ///
    /// # Returns
    ///
    /// Number of buffers handled
    pub async fn run(&mut self, sink: &mut dyn RecordSink) -> u64 {
        let mut handled = 0;

        while let Some(buffer) = self.transport.next_buffer().await {
            let packet = self.handle_buffer(&buffer);
            sink.show(&packet);
            handled += 1;
        }

        info!("Connection closed after {} buffers", handled);
        self.status = ConnectionStatus::Closed;
        handled
    }

    /// Halt the stream if running, close the transport and clear the history
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.streaming {
            if let Err(e) = self.stop_stream().await {
                warn!("Failed to halt stream before disconnect: {}", e);
            }
        }

        info!("Disconnecting...");
        let result = self.transport.close().await;

        self.history.clear();
        self.streaming = false;
        self.last_packet_number = None;
        self.status = ConnectionStatus::Disconnected;
        result
    }

    fn track_sequence(&mut self, record: &DecodedRecord) {
        let Some(current) = record.packet_number() else {
            return;
        };

        if let Some(previous) = self.last_packet_number {
            let step = i64::from(current) - i64::from(previous);
            if step > 1 {
                self.stats.missing += (step - 1) as u64;
                debug!("Packet gap: {} -> {} ({} missing)", previous, current, step - 1);
            } else if step < 1 {
                self.stats.out_of_order += 1;
                debug!("Packet out of order: {} after {}", current, previous);
                return;
            }
        }

        self.last_packet_number = Some(current);
    }
}
