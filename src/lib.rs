//! # Fascia Telemetry Library
//!
//! Decode biosensor telemetry packets streamed by the Fascia headset.
//!
//! This library provides the packet decoder that turns fixed-layout binary
//! buffers (ADS, IMU, EDA, temperature, PPG) into physically scaled channel
//! values, plus the session glue that subscribes to the device stream and
//! issues start/halt commands.

pub mod config;
pub mod error;
pub mod command;
pub mod packet;
pub mod session;
