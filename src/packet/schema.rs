//! # Channel Schema
//!
//! Byte layout of one biosensor packet and the per-channel decode transforms.
//!
//! All fields are little-endian signed integers laid out back to back. Offsets
//! are never stored in the descriptor table; they are derived by summing the
//! widths of the preceding fields.

use std::collections::HashMap;

use crate::error::{FasciaError, Result};

/// Reference voltage of the analog front end in volts
pub const REFERENCE_VOLTAGE: f64 = 4.5;

/// Number of amplifier (ADS) channels
pub const ADS_CHANNEL_COUNT: usize = 8;

/// Number of IMU axes
pub const IMU_AXIS_COUNT: usize = 6;

/// Width of a packet field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// 4-byte little-endian signed integer
    Int32,
    /// 2-byte little-endian signed integer
    Int16,
}

impl FieldWidth {
    /// Size of the field in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Int32 => 4,
            Self::Int16 => 2,
        }
    }
}

/// Static description of one packet field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Channel name, unique within a schema
    pub name: &'static str,

    /// Encoded width
    pub width: FieldWidth,

    /// Amplifier channel scaled to microvolts at decode time
    pub voltage: bool,
}

impl ChannelDescriptor {
    pub const fn int(name: &'static str) -> Self {
        Self { name, width: FieldWidth::Int32, voltage: false }
    }

    pub const fn short(name: &'static str) -> Self {
        Self { name, width: FieldWidth::Int16, voltage: false }
    }

    pub const fn ads(name: &'static str) -> Self {
        Self { name, width: FieldWidth::Int32, voltage: true }
    }
}

/// Packet layout in wire order
pub const CHANNEL_DESCRIPTORS: [ChannelDescriptor; 20] = [
    ChannelDescriptor::int("packet_number"),
    ChannelDescriptor::int("validity_number"),
    ChannelDescriptor::ads("ads_1"), // Pz
    ChannelDescriptor::ads("ads_2"), // Cz
    ChannelDescriptor::ads("ads_3"), // Fp1
    ChannelDescriptor::ads("ads_4"), // Fp2
    ChannelDescriptor::ads("ads_5"), // EMG1
    ChannelDescriptor::ads("ads_6"), // EMG2
    ChannelDescriptor::ads("ads_7"), // EOG1
    ChannelDescriptor::ads("ads_8"), // EOG2
    ChannelDescriptor::short("imu_1"),
    ChannelDescriptor::short("imu_2"),
    ChannelDescriptor::short("imu_3"),
    ChannelDescriptor::short("imu_4"),
    ChannelDescriptor::short("imu_5"),
    ChannelDescriptor::short("imu_6"),
    ChannelDescriptor::int("eda"),
    ChannelDescriptor::int("temp"),
    ChannelDescriptor::int("ppg"),
    ChannelDescriptor::int("board_timestamp"),
];

/// Programmable gain of each amplifier channel
pub const ADS_GAINS: [(&str, u8); ADS_CHANNEL_COUNT] = [
    ("ads_1", 2),
    ("ads_2", 2),
    ("ads_3", 12),
    ("ads_4", 12),
    ("ads_5", 4),
    ("ads_6", 4),
    ("ads_7", 4),
    ("ads_8", 4),
];

/// Sum of the widths of a descriptor table
pub const fn total_width(descriptors: &[ChannelDescriptor]) -> usize {
    let mut total = 0;
    let mut i = 0;

    while i < descriptors.len() {
        total += descriptors[i].width.size();
        i += 1;
    }

    total
}

/// Length of a packet described by [`CHANNEL_DESCRIPTORS`] (68 bytes)
pub const PACKET_LEN: usize = total_width(&CHANNEL_DESCRIPTORS);

/// Decode-time transform of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Raw integer passthrough
    Raw,
    /// 24-bit sign extension followed by ADC-to-microvolt scaling
    Microvolts { gain: u8 },
}

/// Descriptor resolved against a gain table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemaField {
    pub descriptor: ChannelDescriptor,
    pub offset: usize,
    pub transform: Transform,
}

impl SchemaField {
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn width(&self) -> FieldWidth {
        self.descriptor.width
    }
}

/// Validated packet layout with precomputed offsets and gains
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSchema {
    fields: Vec<SchemaField>,
    reference_voltage: f64,
    total_len: usize,
}

impl ChannelSchema {
    /// Build a schema from a descriptor table and a gain table
    ///
    /// # Arguments
    ///
    /// * `descriptors` - Fields in wire order
    /// * `gains` - `(channel, gain)` entries for the voltage channels
    /// * `reference_voltage` - ADC reference in volts
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A channel name appears twice in either table
    /// - A voltage channel has no gain entry
    /// - A gain entry is zero
    pub fn new(
        descriptors: &[ChannelDescriptor],
        gains: &[(&str, u8)],
        reference_voltage: f64,
    ) -> Result<Self> {
        let mut gain_by_name: HashMap<&str, u8> = HashMap::with_capacity(gains.len());
        for &(name, gain) in gains {
            if gain_by_name.insert(name, gain).is_some() {
                return Err(FasciaError::DuplicateChannel(name.to_string()));
            }
        }

        let mut fields: Vec<SchemaField> = Vec::with_capacity(descriptors.len());
        let mut offset = 0;

        for descriptor in descriptors {
            if fields.iter().any(|f| f.name() == descriptor.name) {
                return Err(FasciaError::DuplicateChannel(descriptor.name.to_string()));
            }

            let transform = if descriptor.voltage {
                let gain = gain_by_name
                    .get(descriptor.name)
                    .copied()
                    .ok_or_else(|| FasciaError::MissingGain(descriptor.name.to_string()))?;

                if gain == 0 {
                    return Err(FasciaError::InvalidGain {
                        channel: descriptor.name.to_string(),
                        gain,
                    });
                }

                Transform::Microvolts { gain }
            } else {
                Transform::Raw
            };

            fields.push(SchemaField { descriptor: *descriptor, offset, transform });
            offset += descriptor.width.size();
        }

        Ok(Self {
            fields,
            reference_voltage,
            total_len: offset,
        })
    }

    /// Schema of the biosensor packet ([`CHANNEL_DESCRIPTORS`], [`ADS_GAINS`])
    ///
    /// # Examples
    ///
    /// ```
    /// use fascia_telemetry::packet::schema::{ChannelSchema, PACKET_LEN};
    ///
    /// let schema = ChannelSchema::standard()?;
    /// assert_eq!(schema.total_len(), PACKET_LEN);
    /// # Ok::<(), fascia_telemetry::error::FasciaError>(())
    /// ```
    pub fn standard() -> Result<Self> {
        Self::new(&CHANNEL_DESCRIPTORS, &ADS_GAINS, REFERENCE_VOLTAGE)
    }

    /// Fields in wire order
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Look up a field by channel name
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Minimum buffer length accepted by the decoder
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn reference_voltage(&self) -> f64 {
        self.reference_voltage
    }
}
