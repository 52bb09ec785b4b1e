//! Raw sample to physical value conversion
//!
//! Both channels use a fixed linear transform on the left-aligned ADC code:
//!
//! - Temperature: 14-bit code, `code / 32 - 50` in °C
//! - Humidity: 12-bit code, `code / 16 - 24` in %RH
//!
//! Division truncates. No range checking is done, so a stale sample read after
//! an exhausted poll loop converts like any other.

use crate::channel::ChannelType;
use crate::protocol::RawSample;

/// 14-bit temperature code: `(high << 6) | (low >> 2)`.
pub fn temperature_code(sample: RawSample) -> u16 {
    (u16::from(sample.high()) << 6) | (u16::from(sample.low()) >> 2)
}

/// 12-bit humidity code: `(high << 4) | (low >> 4)`.
pub fn humidity_code(sample: RawSample) -> u16 {
    (u16::from(sample.high()) << 4) | (u16::from(sample.low()) >> 4)
}

/// Degrees Celsius, truncated.
pub fn temperature_celsius(sample: RawSample) -> i32 {
    i32::from(temperature_code(sample)) / 32 - 50
}

/// Percent relative humidity, truncated.
pub fn relative_humidity(sample: RawSample) -> i32 {
    i32::from(humidity_code(sample)) / 16 - 24
}

/// Processed value for `channel`.
pub fn convert(channel: ChannelType, sample: RawSample) -> i32 {
    match channel {
        ChannelType::Temperature => temperature_celsius(sample),
        ChannelType::Humidity => relative_humidity(sample),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_reference_point() {
        let sample = RawSample::new(0x80, 0x00);
        assert_eq!(temperature_code(sample), 0x2000);
        assert_eq!(temperature_celsius(sample), 206);
    }

    #[test]
    fn test_humidity_reference_point() {
        let sample = RawSample::new(0x30, 0x00);
        assert_eq!(humidity_code(sample), 0x300);
        assert_eq!(relative_humidity(sample), 24);
    }

    #[test]
    fn test_low_byte_bits_below_code_are_dropped() {
        // low >> 2 discards bits 0-1 for temperature
        assert_eq!(
            temperature_code(RawSample::new(0x10, 0x03)),
            temperature_code(RawSample::new(0x10, 0x00))
        );
        // low >> 4 discards bits 0-3 for humidity
        assert_eq!(
            humidity_code(RawSample::new(0x10, 0x0F)),
            humidity_code(RawSample::new(0x10, 0x00))
        );
    }

    #[test]
    fn test_truncation_not_rounding() {
        // code 31 / 32 = 0 -> -50
        let sample = RawSample::new(0x00, 31 << 2);
        assert_eq!(temperature_code(sample), 31);
        assert_eq!(temperature_celsius(sample), -50);
    }

    #[test]
    fn test_out_of_range_passes_through() {
        let sample = RawSample::new(0xFF, 0xFF);
        assert_eq!(temperature_code(sample), 0x3FFF);
        assert_eq!(temperature_celsius(sample), 0x3FFF / 32 - 50);
        assert_eq!(relative_humidity(sample), 0xFFF / 16 - 24);
        assert_eq!(convert(ChannelType::Humidity, RawSample::new(0, 0)), -24);
    }

    #[test]
    fn test_convert_dispatch() {
        let sample = RawSample::new(0x80, 0x00);
        assert_eq!(convert(ChannelType::Temperature, sample), 206);
        assert_eq!(convert(ChannelType::Humidity, sample), 0x800 / 16 - 24);
    }
}
