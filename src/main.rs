//! # Fascia Telemetry
//!
//! Decode biosensor telemetry packets into human-readable channel values.
//!
//! Replays a raw packet capture (a file or stdin holding concatenated packets)
//! through a device session and prints each decoded packet.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

use fascia_telemetry::config::{Config, OutputFormat};
use fascia_telemetry::packet::decoder::PacketDecoder;
use fascia_telemetry::session::replay::feed_capture;
use fascia_telemetry::session::sink::{JsonlSink, TextSink};
use fascia_telemetry::session::transport::LoopbackTransport;
use fascia_telemetry::session::{ConnectionStatus, RecordSink, Session};

/// Inbound buffers queued between the capture reader and the session
const INBOUND_QUEUE_DEPTH: usize = 64;

/// How long shutdown waits for blocking reads (stdin) before leaving them behind
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "fascia-telemetry", version, about = "Decode Fascia biosensor telemetry packets")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "FASCIA_CONFIG")]
    config: Option<PathBuf>,

    /// Device MAC address (overrides the configuration file)
    #[arg(short, long, env = "FASCIA_MAC")]
    mac: Option<String>,

    /// Raw packet capture to replay; reads stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output format (overrides the configuration file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
}

/// Main entry point for Fascia Telemetry
///
/// # Control Flow
///
/// 1. Set up logging (stderr) and load configuration
/// 2. Build the packet decoder; a broken gain table stops here
/// 3. Connect a session, subscribe to `fascia_{mac}` and send `'D'`
/// 4. Feed the capture into the session and print every packet
/// 5. On end of input or Ctrl+C send `'H'` and disconnect
///
/// # Examples
///
/// ```bash
/// fascia-telemetry --mac A4CF12B3C4D5 --input capture.bin
/// ```
fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Fascia Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let runtime = build_runtime()?;
    let result = runtime.block_on(run(args));

    // A stdin read parked on the blocking pool cannot be cancelled, and
    // dropping the runtime would wait for it
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    result
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")
}

/// Replay the capture through a device session until input ends or Ctrl+C
async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let mac = args.mac.clone().unwrap_or_else(|| config.device.mac_address.clone());
    let format = args.format.unwrap_or(config.output.format);

    let decoder = PacketDecoder::standard().context("Invalid channel schema")?;
    let packet_len = decoder.schema().total_len();

    let (transport, inbound) = LoopbackTransport::new(INBOUND_QUEUE_DEPTH);

    info!("{}", ConnectionStatus::Connecting);
    let mut session = Session::connect(transport, &mac, decoder, &config.session)
        .await
        .context("Failed to start device session")?;

    if !session.is_subscribed() {
        bail!("{}", session.status());
    }
    info!("{}", session.status());

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open capture {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let feeder = tokio::spawn(feed_capture(reader, inbound, packet_len));

    let mut sink: Box<dyn RecordSink> = match format {
        OutputFormat::Text => Box::new(TextSink::new(std::io::stdout())),
        OutputFormat::Jsonl => Box::new(JsonlSink::new(std::io::stdout())),
    };

    session.start_stream().await?;

    tokio::select! {
        handled = session.run(sink.as_mut()) => {
            info!("Input exhausted after {} packets", handled);
        }

        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    session.disconnect().await?;

    // stdin may never reach EOF after Ctrl+C; the blocked read itself is
    // abandoned by the shutdown timeout in main
    if !feeder.is_finished() {
        feeder.abort();
    }

    match feeder.await {
        Ok(Ok(count)) => info!("Replayed {} buffers", count),
        Ok(Err(e)) => warn!("Capture read failed: {}", e),
        Err(e) if e.is_cancelled() => debug!("Capture reader stopped"),
        Err(e) => warn!("Capture reader task failed: {}", e),
    }

    let stats = session.stats();
    info!(
        "Received {} packets ({} parse errors, {} missing, {} out of order)",
        stats.received, stats.parse_errors, stats.missing, stats.out_of_order
    );

    Ok(())
}
