//! # Packet Decoder
//!
//! Walks a [`ChannelSchema`] over a raw buffer and produces a [`DecodedRecord`].

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::trace;

use super::schema::{ChannelSchema, FieldWidth, Transform};
use super::transform::{adc_to_microvolts, sign_extend_24};
use super::validity::ValidityFlags;
use crate::error::{FasciaError, Result};

/// Decoded value of one channel
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ChannelValue {
    /// Raw integer passthrough
    Int(i32),
    /// Amplifier reading scaled to microvolts
    Microvolts(f64),
}

impl ChannelValue {
    /// Integer value, if the channel is a raw passthrough
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Microvolts(_) => None,
        }
    }

    /// Numeric value as a float
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(v) => f64::from(v),
            Self::Microvolts(v) => v,
        }
    }
}

/// One decoded packet, channels in schema order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecord {
    channels: Vec<(&'static str, ChannelValue)>,
}

impl DecodedRecord {
    /// Look up a channel value by name
    pub fn get(&self, name: &str) -> Option<ChannelValue> {
        self.channels
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, v)| v)
    }

    /// Channels in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ChannelValue)> + '_ {
        self.channels.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Device packet index
    pub fn packet_number(&self) -> Option<i32> {
        self.get("packet_number").and_then(|v| v.as_int())
    }

    /// Per-channel validity bitfield
    pub fn validity(&self) -> Option<ValidityFlags> {
        self.get("validity_number")
            .and_then(|v| v.as_int())
            .map(ValidityFlags::from_raw)
    }

    /// Device clock at sampling time
    pub fn board_timestamp(&self) -> Option<i32> {
        self.get("board_timestamp").and_then(|v| v.as_int())
    }

    fn push(&mut self, name: &'static str, value: ChannelValue) {
        self.channels.push((name, value));
    }
}

impl Serialize for DecodedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.channels.len()))?;
        for (name, value) in &self.channels {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Table-driven packet decoder
///
/// Stateless: holds only the immutable schema, so one decoder can be shared
/// across threads and tasks.
#[derive(Debug, Clone)]
pub struct PacketDecoder {
    schema: ChannelSchema,
}

impl PacketDecoder {
    pub fn new(schema: ChannelSchema) -> Self {
        Self { schema }
    }

    /// Decoder for the standard biosensor packet
    ///
    /// # Errors
    ///
    /// Returns error if the built-in gain table does not cover every
    /// amplifier channel.
    pub fn standard() -> Result<Self> {
        Ok(Self::new(ChannelSchema::standard()?))
    }

    pub fn schema(&self) -> &ChannelSchema {
        &self.schema
    }

    /// Decode a raw packet
    ///
    /// # Arguments
    ///
    /// * `buffer` - Raw little-endian packet bytes
    ///
    /// # Returns
    ///
    /// * `Result<DecodedRecord>` - Channels in schema order
    ///
    /// # Errors
    ///
    /// Returns `MalformedPacket` if the buffer is shorter than the schema.
    /// Field values are never range-checked.
    ///
    /// # Examples
    ///
    /// ```
    /// use fascia_telemetry::packet::decoder::PacketDecoder;
    /// use fascia_telemetry::packet::schema::PACKET_LEN;
    ///
    /// let decoder = PacketDecoder::standard()?;
    /// let record = decoder.decode(&[0u8; PACKET_LEN])?;
    /// assert_eq!(record.len(), 20);
    /// assert!(decoder.decode(&[0u8; PACKET_LEN - 1]).is_err());
    /// # Ok::<(), fascia_telemetry::error::FasciaError>(())
    /// ```
    pub fn decode(&self, buffer: &[u8]) -> Result<DecodedRecord> {
        let expected = self.schema.total_len();
        if buffer.len() < expected {
            return Err(FasciaError::MalformedPacket {
                expected,
                actual: buffer.len(),
            });
        }

        if buffer.len() > expected {
            trace!("Ignoring {} trailing bytes", buffer.len() - expected);
        }

        let mut record = DecodedRecord {
            channels: Vec::with_capacity(self.schema.fields().len()),
        };
        let mut cursor = 0;

        for field in self.schema.fields() {
            let raw = match field.width() {
                FieldWidth::Int32 => i32::from_le_bytes([
                    buffer[cursor],
                    buffer[cursor + 1],
                    buffer[cursor + 2],
                    buffer[cursor + 3],
                ]),
                FieldWidth::Int16 => {
                    i32::from(i16::from_le_bytes([buffer[cursor], buffer[cursor + 1]]))
                }
            };
            cursor += field.width().size();

            let value = match field.transform {
                Transform::Raw => ChannelValue::Int(raw),
                Transform::Microvolts { gain } => ChannelValue::Microvolts(adc_to_microvolts(
                    sign_extend_24(raw),
                    gain,
                    self.schema.reference_voltage(),
                )),
            };

            record.push(field.name(), value);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::schema::{ChannelDescriptor, CHANNEL_DESCRIPTORS, PACKET_LEN, REFERENCE_VOLTAGE};

    fn put_i32(buf: &mut [u8], offset: usize, value: i32) {
        buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn put_i16(buf: &mut [u8], offset: usize, value: i16) {
        buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_decode_zero_packet() {
        let decoder = PacketDecoder::standard().unwrap();
        let record = decoder.decode(&[0u8; PACKET_LEN]).unwrap();

        assert_eq!(record.len(), CHANNEL_DESCRIPTORS.len());
        for (name, value) in record.iter() {
            assert_eq!(value.as_f64(), 0.0, "channel {} should be zero", name);
        }
    }

    #[test]
    fn test_decode_too_short() {
        let decoder = PacketDecoder::standard().unwrap();

        for len in [0, 1, PACKET_LEN - 1] {
            let result = decoder.decode(&vec![0u8; len]);
            match result {
                Err(FasciaError::MalformedPacket { expected, actual }) => {
                    assert_eq!(expected, PACKET_LEN);
                    assert_eq!(actual, len);
                }
                other => panic!("Expected MalformedPacket, got: {:?}", other),
            }
        }
    }

    #[test]
    fn test_decode_trailing_bytes_ignored() {
        let decoder = PacketDecoder::standard().unwrap();
        let mut buf = vec![0xAAu8; PACKET_LEN + 12];
        buf[..PACKET_LEN].fill(0);
        put_i32(&mut buf, 0, 7);

        let record = decoder.decode(&buf).unwrap();
        assert_eq!(record.packet_number(), Some(7));
        assert_eq!(record.len(), 20);
    }

    #[test]
    fn test_decode_field_values() {
        let decoder = PacketDecoder::standard().unwrap();
        let mut buf = [0u8; PACKET_LEN];
        put_i32(&mut buf, 0, 1234); // packet_number
        put_i32(&mut buf, 4, 0x7_FFFF); // validity_number
        put_i32(&mut buf, 8, 0x7F_FFFF); // ads_1, max positive
        put_i32(&mut buf, 12, 0x80_0000); // ads_2, max negative
        put_i32(&mut buf, 16, 0xFF_FFFF); // ads_3, -1
        put_i16(&mut buf, 40, -321); // imu_1
        put_i16(&mut buf, 50, i16::MAX); // imu_6
        put_i32(&mut buf, 52, 4096); // eda
        put_i32(&mut buf, 56, 36_500); // temp
        put_i32(&mut buf, 60, -77); // ppg
        put_i32(&mut buf, 64, 987_654); // board_timestamp

        let record = decoder.decode(&buf).unwrap();

        assert_eq!(record.packet_number(), Some(1234));
        assert_eq!(record.get("validity_number"), Some(ChannelValue::Int(0x7_FFFF)));

        let ads_1 = record.get("ads_1").unwrap().as_f64();
        assert!((ads_1 - 2_250_000.0).abs() < 1e-6);

        let ads_2 = record.get("ads_2").unwrap().as_f64();
        let expected = -8_388_608.0 * (4.5e6 / (2.0 * 8_388_607.0));
        assert!((ads_2 - expected).abs() < 1e-6);

        let ads_3 = record.get("ads_3").unwrap().as_f64();
        let expected = -(4.5e6 / (12.0 * 8_388_607.0));
        assert!((ads_3 - expected).abs() < 1e-12);

        assert_eq!(record.get("imu_1"), Some(ChannelValue::Int(-321)));
        assert_eq!(record.get("imu_6"), Some(ChannelValue::Int(i32::from(i16::MAX))));
        assert_eq!(record.get("eda"), Some(ChannelValue::Int(4096)));
        assert_eq!(record.get("temp"), Some(ChannelValue::Int(36_500)));
        assert_eq!(record.get("ppg"), Some(ChannelValue::Int(-77)));
        assert_eq!(record.board_timestamp(), Some(987_654));
    }

    #[test]
    fn test_voltage_channels_are_float_others_int() {
        let decoder = PacketDecoder::standard().unwrap();
        let record = decoder.decode(&[0u8; PACKET_LEN]).unwrap();

        for (name, value) in record.iter() {
            if name.starts_with("ads_") {
                assert!(matches!(value, ChannelValue::Microvolts(_)), "{}", name);
            } else {
                assert!(matches!(value, ChannelValue::Int(_)), "{}", name);
            }
        }
    }

    #[test]
    fn test_ads_slot_with_high_byte_set() {
        let decoder = PacketDecoder::standard().unwrap();
        let record = decoder.decode(&[0xFFu8; PACKET_LEN]).unwrap();

        // 0xFFFFFFFF complements to 0x00FFFFFF counts
        let expected = adc_to_microvolts(0x00FF_FFFF, 2, REFERENCE_VOLTAGE);
        match record.get("ads_1") {
            Some(ChannelValue::Microvolts(uv)) => assert_eq!(uv, expected),
            other => panic!("Expected microvolts, got: {:?}", other),
        }
        assert_eq!(record.get("packet_number"), Some(ChannelValue::Int(-1)));
    }

    #[test]
    fn test_record_order_matches_schema() {
        let decoder = PacketDecoder::standard().unwrap();
        let buffers = [[0u8; PACKET_LEN], [0xFFu8; PACKET_LEN], [0x5Au8; PACKET_LEN]];

        for buf in buffers.iter() {
            let record = decoder.decode(buf).unwrap();
            let names: Vec<&str> = record.iter().map(|(n, _)| n).collect();
            let expected: Vec<&str> = CHANNEL_DESCRIPTORS.iter().map(|d| d.name).collect();
            assert_eq!(names, expected);
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let decoder = PacketDecoder::standard().unwrap();
        let buf: Vec<u8> = (0..PACKET_LEN as u8).map(|b| b.wrapping_mul(37)).collect();

        let first = decoder.decode(&buf).unwrap();
        let second = decoder.decode(&buf).unwrap();

        for ((n1, v1), (n2, v2)) in first.iter().zip(second.iter()) {
            assert_eq!(n1, n2);
            assert_eq!(v1.as_f64().to_bits(), v2.as_f64().to_bits());
        }
    }

    #[test]
    fn test_decode_custom_schema() {
        let descriptors = [ChannelDescriptor::short("x"), ChannelDescriptor::ads("v")];
        let schema = ChannelSchema::new(&descriptors, &[("v", 1)], REFERENCE_VOLTAGE).unwrap();
        let decoder = PacketDecoder::new(schema);

        let mut buf = [0u8; 6];
        put_i16(&mut buf, 0, -2);
        put_i32(&mut buf, 2, 1);

        let record = decoder.decode(&buf).unwrap();
        assert_eq!(record.get("x"), Some(ChannelValue::Int(-2)));
        let v = record.get("v").unwrap().as_f64();
        assert!((v - 4.5e6 / 8_388_607.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_serializes_in_order() {
        let decoder = PacketDecoder::standard().unwrap();
        let mut buf = [0u8; PACKET_LEN];
        put_i32(&mut buf, 0, 42);

        let record = decoder.decode(&buf).unwrap();
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.starts_with("{\"packet_number\":42,\"validity_number\":0,\"ads_1\":0.0"));
        assert!(json.ends_with("\"board_timestamp\":0}"));
    }

    #[test]
    fn test_decoder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PacketDecoder>();
        assert_send_sync::<DecodedRecord>();
    }
}
