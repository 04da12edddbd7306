//! Trait abstraction for the publish/subscribe transport

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{FasciaError, Result};

/// Delivery guarantee for a published message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = FasciaError;

    fn try_from(level: u8) -> Result<Self> {
        match level {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(FasciaError::Transport(format!("Unsupported QoS level {}", other))),
        }
    }
}

/// Trait for publish/subscribe operations used by a session
#[async_trait]
pub trait Transport: Send {
    /// Subscribe to a topic carrying packet buffers
    async fn subscribe(&mut self, topic: &str) -> Result<()>;

    /// Publish a payload; `Ok` once delivery is confirmed
    async fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<()>;

    /// Next buffer from the subscribed topic, `None` once the connection ends
    async fn next_buffer(&mut self) -> Option<Bytes>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}

/// Message recorded by [`LoopbackTransport::publish`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

/// In-process transport fed through a channel
///
/// Inbound buffers are pushed through the [`mpsc::Sender`] returned by
/// [`LoopbackTransport::new`]; published messages are recorded for inspection.
/// Used to replay captured packets and to drive sessions in tests.
#[derive(Debug)]
pub struct LoopbackTransport {
    inbound: mpsc::Receiver<Bytes>,
    subscriptions: Vec<String>,
    published: Vec<PublishedMessage>,
    publish_error: Option<String>,
    subscribe_error: Option<String>,
    closed: bool,
}

impl LoopbackTransport {
    /// Create a transport and the sender that feeds it
    ///
    /// # Arguments
    ///
    /// * `capacity` - Inbound buffers queued before senders wait
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let transport = Self {
            inbound: rx,
            subscriptions: Vec::new(),
            published: Vec::new(),
            publish_error: None,
            subscribe_error: None,
            closed: false,
        };
        (transport, tx)
    }

    /// Make subsequent publishes fail with the given message
    pub fn set_publish_error(&mut self, error: Option<&str>) {
        self.publish_error = error.map(str::to_string);
    }

    /// Make subsequent subscriptions fail with the given message
    pub fn set_subscribe_error(&mut self, error: Option<&str>) {
        self.subscribe_error = error.map(str::to_string);
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn published(&self) -> &[PublishedMessage] {
        &self.published
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn subscribe(&mut self, topic: &str) -> Result<()> {
        if let Some(error) = &self.subscribe_error {
            return Err(FasciaError::Transport(error.clone()));
        }
        self.subscriptions.push(topic.to_string());
        debug!("Subscribed to {}", topic);
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8], qos: QoS) -> Result<()> {
        if self.closed {
            return Err(FasciaError::Transport("connection closed".to_string()));
        }
        if let Some(error) = &self.publish_error {
            return Err(FasciaError::Transport(error.clone()));
        }
        self.published.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
        });
        Ok(())
    }

    async fn next_buffer(&mut self) -> Option<Bytes> {
        if self.closed {
            return None;
        }
        self.inbound.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.inbound.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qos_levels() {
        assert_eq!(QoS::try_from(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(QoS::try_from(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(QoS::try_from(2).unwrap(), QoS::ExactlyOnce);
        assert!(QoS::try_from(3).is_err());
    }

    #[tokio::test]
    async fn test_loopback_delivers_buffers_in_order() {
        let (mut transport, tx) = LoopbackTransport::new(4);
        tx.send(Bytes::from_static(b"one")).await.unwrap();
        tx.send(Bytes::from_static(b"two")).await.unwrap();
        drop(tx);

        assert_eq!(transport.next_buffer().await.unwrap(), Bytes::from_static(b"one"));
        assert_eq!(transport.next_buffer().await.unwrap(), Bytes::from_static(b"two"));
        assert!(transport.next_buffer().await.is_none());
    }

    #[tokio::test]
    async fn test_loopback_records_publishes() {
        let (mut transport, _tx) = LoopbackTransport::new(1);
        transport.publish("/cmd", b"D", QoS::ExactlyOnce).await.unwrap();

        assert_eq!(
            transport.published(),
            &[PublishedMessage {
                topic: "/cmd".to_string(),
                payload: vec![b'D'],
                qos: QoS::ExactlyOnce,
            }]
        );
    }

    #[tokio::test]
    async fn test_loopback_publish_error() {
        let (mut transport, _tx) = LoopbackTransport::new(1);
        transport.set_publish_error(Some("broker unavailable"));

        let result = transport.publish("/cmd", b"H", QoS::AtMostOnce).await;
        match result {
            Err(FasciaError::Transport(msg)) => assert_eq!(msg, "broker unavailable"),
            other => panic!("Expected Transport error, got: {:?}", other),
        }
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn test_loopback_closed() {
        let (mut transport, tx) = LoopbackTransport::new(1);
        transport.close().await.unwrap();

        assert!(transport.is_closed());
        assert!(tx.send(Bytes::new()).await.is_err());
        assert!(transport.next_buffer().await.is_none());
        assert!(transport.publish("/cmd", b"D", QoS::ExactlyOnce).await.is_err());
    }
}
