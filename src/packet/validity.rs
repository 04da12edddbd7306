//! # Validity Bitfield
//!
//! Layout of the `validity_number` field. The device sets one bit per channel
//! it considers trustworthy in that packet:
//!
//! ```text
//! bit  0      packet index
//! bit  1      validity word
//! bits 2..10  ads_1..ads_8
//! bits 10..16 imu_1..imu_6
//! bit  16     eda
//! bit  17     temp
//! bit  18     ppg
//! ```
//!
//! The decoder passes the word through untouched; these helpers only read it.

/// Group of channels sharing a contiguous run of validity bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelGroup {
    PacketIndex,
    Validity,
    Ads,
    Imu,
    Eda,
    Temperature,
    Ppg,
}

impl ChannelGroup {
    /// All groups in bit order
    pub const ALL: [ChannelGroup; 7] = [
        Self::PacketIndex,
        Self::Validity,
        Self::Ads,
        Self::Imu,
        Self::Eda,
        Self::Temperature,
        Self::Ppg,
    ];

    /// Number of bits (one per channel)
    pub const fn bit_count(self) -> u32 {
        match self {
            Self::PacketIndex => 1,
            Self::Validity => 1,
            Self::Ads => 8,
            Self::Imu => 6,
            Self::Eda => 1,
            Self::Temperature => 1,
            Self::Ppg => 1,
        }
    }

    /// Index of the first bit
    pub const fn start_bit(self) -> u32 {
        match self {
            Self::PacketIndex => 0,
            Self::Validity => 1,
            Self::Ads => 2,
            Self::Imu => 10,
            Self::Eda => 16,
            Self::Temperature => 17,
            Self::Ppg => 18,
        }
    }

    /// Mask covering every bit of the group
    pub const fn mask(self) -> u32 {
        ((1u32 << self.bit_count()) - 1) << self.start_bit()
    }

    /// Resolve a channel name to its group and position within the group
    pub fn locate(name: &str) -> Option<(ChannelGroup, u32)> {
        let indexed = |prefix: &str, group: ChannelGroup| -> Option<(ChannelGroup, u32)> {
            let n: u32 = name.strip_prefix(prefix)?.parse().ok()?;
            (1..=group.bit_count()).contains(&n).then(|| (group, n - 1))
        };

        match name {
            "packet_number" => Some((Self::PacketIndex, 0)),
            "validity_number" => Some((Self::Validity, 0)),
            "eda" => Some((Self::Eda, 0)),
            "temp" => Some((Self::Temperature, 0)),
            "ppg" => Some((Self::Ppg, 0)),
            _ => indexed("ads_", Self::Ads).or_else(|| indexed("imu_", Self::Imu)),
        }
    }
}

/// Per-packet channel validity word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityFlags(u32);

impl ValidityFlags {
    /// Every defined bit set
    pub const ALL_VALID: ValidityFlags = ValidityFlags((1 << 19) - 1);

    pub fn from_raw(raw: i32) -> Self {
        Self(raw as u32)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// True when every channel of the group is flagged valid
    pub fn group_valid(self, group: ChannelGroup) -> bool {
        self.0 & group.mask() == group.mask()
    }

    /// Validity of a single channel
    ///
    /// Returns `None` for names outside the packet layout (e.g. `board_timestamp`,
    /// which has no validity bit).
    pub fn channel_valid(self, name: &str) -> Option<bool> {
        let (group, index) = ChannelGroup::locate(name)?;
        Some(self.0 & (1 << (group.start_bit() + index)) != 0)
    }

    /// Names of the flagged-invalid channels, in bit order
    pub fn invalid_channels(self) -> Vec<String> {
        let mut invalid = Vec::new();

        for group in ChannelGroup::ALL {
            for index in 0..group.bit_count() {
                if self.0 & (1 << (group.start_bit() + index)) == 0 {
                    invalid.push(channel_name(group, index));
                }
            }
        }

        invalid
    }
}

fn channel_name(group: ChannelGroup, index: u32) -> String {
    match group {
        ChannelGroup::PacketIndex => "packet_number".to_string(),
        ChannelGroup::Validity => "validity_number".to_string(),
        ChannelGroup::Ads => format!("ads_{}", index + 1),
        ChannelGroup::Imu => format!("imu_{}", index + 1),
        ChannelGroup::Eda => "eda".to_string(),
        ChannelGroup::Temperature => "temp".to_string(),
        ChannelGroup::Ppg => "ppg".to_string(),
    }
}
