//! Record sinks writing decoded packets to a byte stream

use std::io::Write;

use tracing::error;

use super::{ReceivedPacket, RecordSink};

/// Writes each packet as its text block followed by a blank line
#[derive(Debug)]
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for TextSink<W> {
    fn show(&mut self, packet: &ReceivedPacket) {
        if let Err(e) = writeln!(self.out, "{}\n", packet.text) {
            error!("Failed to write packet: {}", e);
        }
    }
}

/// Writes each packet as one JSON object per line
#[derive(Debug)]
pub struct JsonlSink<W: Write> {
    out: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for JsonlSink<W> {
    fn show(&mut self, packet: &ReceivedPacket) {
        let line = match serde_json::to_string(packet) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize packet: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(self.out, "{}", line) {
            error!("Failed to write packet: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::decoder::PacketDecoder;
    use crate::packet::format::{format_record, PARSE_ERROR_TEXT};
    use crate::packet::schema::PACKET_LEN;
    use chrono::Utc;

    fn decoded_packet() -> ReceivedPacket {
        let record = PacketDecoder::standard()
            .unwrap()
            .decode(&[0u8; PACKET_LEN])
            .unwrap();
        ReceivedPacket {
            received_at: Utc::now(),
            text: format_record(&record),
            record: Some(record),
            error: None,
        }
    }

    #[test]
    fn test_text_sink_writes_block() {
        let mut sink = TextSink::new(Vec::new());
        sink.show(&decoded_packet());

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.starts_with("packet_number: 0\nvalidity_number: 0\n"));
        assert!(out.ends_with("board_timestamp: 0\n\n"));
    }

    #[test]
    fn test_jsonl_sink_writes_one_line() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.show(&decoded_packet());
        sink.show(&ReceivedPacket {
            received_at: Utc::now(),
            record: None,
            text: PARSE_ERROR_TEXT.to_string(),
            error: Some("Malformed packet: expected at least 68 bytes, got 3".to_string()),
        });

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["record"]["packet_number"], 0);
        assert_eq!(first["record"]["ads_1"], 0.0);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["error"], "Malformed packet: expected at least 68 bytes, got 3");
        assert!(second.get("record").is_none());
    }
}
