//! # Stream Commands
//!
//! Single-byte control codes published to the device.

use std::fmt;

use crate::error::{FasciaError, Result};

/// Control code understood by the device firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamCommand {
    /// Start streaming packets
    Start = b'D',
    /// Halt streaming
    Halt = b'H',
}

impl StreamCommand {
    /// Wire byte of the command
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Publish payload (the single command byte)
    pub fn payload(self) -> [u8; 1] {
        [self.as_byte()]
    }

    /// Streaming state the device enters once the command is delivered
    pub const fn streaming_after(self) -> bool {
        matches!(self, Self::Start)
    }
}

impl TryFrom<u8> for StreamCommand {
    type Error = FasciaError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            b'D' => Ok(Self::Start),
            b'H' => Ok(Self::Halt),
            other => Err(FasciaError::InvalidCommand(other)),
        }
    }
}

impl fmt::Display for StreamCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.as_byte()))
    }
}
