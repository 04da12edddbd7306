//! # Record Formatting
//!
//! Renders decoded records as the multi-line text block shown to the user.
//!
//! ```text
//! packet_number: 1234
//! ads_1: 2250000.00µV
//! temp: 36.50°C
//! ```

use tracing::warn;

use super::decoder::{ChannelValue, DecodedRecord, PacketDecoder};
use super::transform::millidegrees_to_celsius;
use crate::error::Result;

/// Text shown in place of a packet that could not be decoded
pub const PARSE_ERROR_TEXT: &str = "Error parsing data";

/// Name of the temperature channel (scaled at display time)
pub const TEMPERATURE_CHANNEL: &str = "temp";

/// Decimal places for scaled values
const SCALED_DECIMALS: usize = 2;

/// Format a decoded record, one `name: value` line per channel
///
/// - Amplifier channels: `ads_1: 12.34µV`
/// - Temperature: millidegrees scaled to `temp: 36.50°C`
/// - Everything else: raw integer
pub fn format_record(record: &DecodedRecord) -> String {
    record
        .iter()
        .map(|(name, value)| format_channel(name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a single channel line
pub fn format_channel(name: &str, value: ChannelValue) -> String {
    match value {
        ChannelValue::Microvolts(uv) => format!("{}: {}µV", name, to_fixed(uv, SCALED_DECIMALS)),
        ChannelValue::Int(raw) if name == TEMPERATURE_CHANNEL => format!(
            "{}: {}°C",
            name,
            to_fixed(millidegrees_to_celsius(raw), SCALED_DECIMALS)
        ),
        ChannelValue::Int(raw) => format!("{}: {}", name, raw),
    }
}

/// Decode and format a raw buffer
///
/// Never fails: a buffer that cannot be decoded renders as
/// [`PARSE_ERROR_TEXT`].
///
/// # Examples
///
/// ```
/// use fascia_telemetry::packet::decoder::PacketDecoder;
/// use fascia_telemetry::packet::format::{render_packet, PARSE_ERROR_TEXT};
///
/// let decoder = PacketDecoder::standard()?;
/// assert_eq!(render_packet(&decoder, &[0u8; 3]), PARSE_ERROR_TEXT);
/// # Ok::<(), fascia_telemetry::error::FasciaError>(())
/// ```
pub fn render_packet(decoder: &PacketDecoder, buffer: &[u8]) -> String {
    render_decoded(&decoder.decode(buffer))
}

/// Format the outcome of a decode, logging the failure if there is one
pub fn render_decoded(decoded: &Result<DecodedRecord>) -> String {
    match decoded {
        Ok(record) => format_record(record),
        Err(e) => {
            warn!("Error parsing data: {}", e);
            PARSE_ERROR_TEXT.to_string()
        }
    }
}

/// Fixed-point formatting with ties rounded away from zero
///
/// `format!("{:.2}")` rounds exact ties to even (`0.125` → `0.12`); the display
/// rounds them away from zero (`0.125` → `0.13`). Negative zero prints unsigned,
/// while small negatives keep their sign (`-0.001` → `-0.00`).
pub fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let magnitude = value.abs();
    // Exact decimal expansion well past the rounding digit
    let exact = format!("{:.*}", digits + 32, magnitude);
    let cut = exact.len() - 32;
    let (kept, rest) = exact.split_at(cut);
    let kept = kept.trim_end_matches('.');
    let is_tie = rest.starts_with('5') && rest[1..].bytes().all(|b| b == b'0');

    let rounded = if is_tie {
        round_up_decimal(kept)
    } else {
        format!("{:.*}", digits, magnitude)
    };

    if value < 0.0 {
        format!("-{}", rounded)
    } else {
        rounded
    }
}

/// Add one unit in the last place to a non-negative decimal string
fn round_up_decimal(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    let mut carry = true;

    for b in bytes.iter_mut().rev() {
        if !carry {
            break;
        }
        match *b {
            b'.' => continue,
            b'9' => *b = b'0',
            _ => {
                *b += 1;
                carry = false;
            }
        }
    }

    let mut out = String::with_capacity(bytes.len() + 1);
    if carry {
        out.push('1');
    }
    out.extend(bytes.into_iter().map(char::from));
    out
}
