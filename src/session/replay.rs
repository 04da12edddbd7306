//! Replay of raw packet captures through a transport channel

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::Result;

/// Split a byte stream into fixed-size buffers and push them into `tx`
///
/// A short trailing chunk is still forwarded so the receiving side reports it
/// as a malformed packet.
///
/// # Arguments
///
/// * `reader` - Concatenated raw packets
/// * `tx` - Inbound side of a transport
/// * `packet_len` - Bytes per packet
///
/// # Returns
///
/// * `Result<u64>` - Number of buffers forwarded
pub async fn feed_capture<R>(mut reader: R, tx: mpsc::Sender<Bytes>, packet_len: usize) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let packet_len = packet_len.max(1);
    let mut forwarded = 0;

    loop {
        let mut buf = BytesMut::zeroed(packet_len);
        let mut filled = 0;

        while filled < packet_len {
            let n = reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            break;
        }

        buf.truncate(filled);
        if tx.send(buf.freeze()).await.is_err() {
            debug!("Transport closed, stopping replay");
            break;
        }
        forwarded += 1;

        if filled < packet_len {
            warn!("Capture ends with a partial packet ({} of {} bytes)", filled, packet_len);
            break;
        }
    }

    debug!("Replayed {} buffers", forwarded);
    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_feed_whole_packets() {
        let capture: Vec<u8> = (0..12u8).collect();
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = feed_capture(&capture[..], tx, 4).await.unwrap();

        assert_eq!(forwarded, 3);
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(&[0, 1, 2, 3]));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(&[4, 5, 6, 7]));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(&[8, 9, 10, 11]));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_feed_partial_trailing_packet() {
        let capture = [0xAAu8; 10];
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = feed_capture(&capture[..], tx, 4).await.unwrap();

        assert_eq!(forwarded, 3);
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert_eq!(rx.recv().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_feed_empty_capture() {
        let (tx, mut rx) = mpsc::channel(1);
        assert_eq!(feed_capture(&[0u8; 0][..], tx, 68).await.unwrap(), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_feed_stops_when_receiver_dropped() {
        let capture = [0u8; 40];
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert_eq!(feed_capture(&capture[..], tx, 4).await.unwrap(), 0);
    }
}
