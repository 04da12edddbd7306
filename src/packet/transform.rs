//! # Channel Transforms
//!
//! Pure numeric conversions applied to raw packet fields.
//!
//! **ADC format**: 24-bit two's complement, stored in a 4-byte slot
//! **Full-scale code**: 2^23 - 1

/// Mask selecting the 24 data bits of an ADC sample
pub const ADC_MASK_24: i32 = 0x00FF_FFFF;

/// Sign bit of a 24-bit ADC sample
pub const ADC_SIGN_BIT: i32 = 0x0080_0000;

/// Full-scale code of a 24-bit signed ADC
pub const ADC_FULL_SCALE: i32 = (1 << 23) - 1;

/// Temperature field resolution (millidegrees per degree Celsius)
pub const MILLIDEGREES_PER_DEGREE: f64 = 1000.0;

/// Interpret a 24-bit two's complement ADC reading held in a 32-bit slot
///
/// With bit 23 set the word is complemented against the 24-bit mask
/// (`!(raw ^ mask)`); otherwise it passes through unchanged. The device clears
/// the top 8 bits, so in-range slots map to `[-2^23, 2^23)`. Bits above 23 are
/// not masked: a slot with a non-zero top byte keeps it (inverted when bit 23
/// is set).
///
/// # Examples
///
/// ```
/// use fascia_telemetry::packet::transform::sign_extend_24;
///
/// assert_eq!(sign_extend_24(0x7F_FFFF), 8_388_607);
/// assert_eq!(sign_extend_24(0x80_0000), -8_388_608);
/// assert_eq!(sign_extend_24(0xFF_FFFF), -1);
/// ```
pub fn sign_extend_24(raw: i32) -> i32 {
    if raw & ADC_SIGN_BIT != 0 {
        !(raw ^ ADC_MASK_24)
    } else {
        raw
    }
}

/// Convert signed ADC counts to microvolts
///
/// `µV = counts * (vref * 1e6) / (gain * (2^23 - 1))`
///
/// # Arguments
///
/// * `counts` - Sign-extended ADC reading
/// * `gain` - Programmable gain of the amplifier channel
/// * `vref` - Reference voltage in volts
///
/// # Examples
///
/// ```
/// use fascia_telemetry::packet::transform::adc_to_microvolts;
///
/// let uv = adc_to_microvolts(8_388_607, 2, 4.5);
/// assert!((uv - 2_250_000.0).abs() < 1e-6);
/// ```
pub fn adc_to_microvolts(counts: i32, gain: u8, vref: f64) -> f64 {
    f64::from(counts) * ((vref * 1e6) / (f64::from(gain) * f64::from(ADC_FULL_SCALE)))
}

/// Convert the raw temperature field (millidegrees) to degrees Celsius
pub fn millidegrees_to_celsius(raw: i32) -> f64 {
    f64::from(raw) / MILLIDEGREES_PER_DEGREE
}

/// Sign extension by subtracting 2^24 (slow, for verification)
///
/// Only defined for slots whose top 8 bits are clear. Used to cross-check
/// [`sign_extend_24`] over the full 24-bit domain.
#[allow(dead_code)]
fn sign_extend_24_subtract(raw: i32) -> i32 {
    if raw >= ADC_SIGN_BIT {
        raw - (1 << 24)
    } else {
        raw
    }
}
