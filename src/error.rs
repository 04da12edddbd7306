//! # Error Types
//!
//! Custom error types for Fascia Telemetry using `thiserror`.

use thiserror::Error;

/// Main error type for Fascia Telemetry
#[derive(Debug, Error)]
pub enum FasciaError {
    /// Buffer shorter than the channel schema
    #[error("Malformed packet: expected at least {expected} bytes, got {actual}")]
    MalformedPacket { expected: usize, actual: usize },

    /// Voltage channel declared without a gain entry
    #[error("Missing gain for voltage channel '{0}'")]
    MissingGain(String),

    /// Gain entry that cannot scale a channel
    #[error("Invalid gain {gain} for channel '{channel}'")]
    InvalidGain { channel: String, gain: u8 },

    /// Channel name declared twice in a schema or gain table
    #[error("Duplicate channel '{0}'")]
    DuplicateChannel(String),

    /// Byte that is not a recognised stream command
    #[error("Invalid stream command: 0x{0:02X}")]
    InvalidCommand(u8),

    /// Session started without a device address
    #[error("MAC address required")]
    DeviceAddressRequired,

    /// Transport collaborator errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Fascia Telemetry
pub type Result<T> = std::result::Result<T, FasciaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_packet_message() {
        let err = FasciaError::MalformedPacket { expected: 68, actual: 12 };
        assert_eq!(
            err.to_string(),
            "Malformed packet: expected at least 68 bytes, got 12"
        );
    }

    #[test]
    fn test_invalid_command_message() {
        assert_eq!(
            FasciaError::InvalidCommand(b'x').to_string(),
            "Invalid stream command: 0x78"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FasciaError = io.into();
        assert!(matches!(err, FasciaError::Io(_)));
    }
}
