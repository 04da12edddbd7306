//! # Biosensor Packet Module
//!
//! Decoding of the fixed-layout telemetry packet streamed by the headset.
//!
//! This module handles:
//! - Channel schema (field order, widths, amplifier gains)
//! - 24-bit sign extension and ADC-to-microvolt scaling
//! - Table-driven decoding into an ordered record
//! - Text rendering of decoded records
//! - Validity bitfield inspection

pub mod schema;
pub mod transform;
pub mod decoder;
pub mod format;
pub mod validity;
