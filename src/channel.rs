//! Channel vocabulary.
//!
//! [`ChannelType`] is what the sensor can measure. [`ChannelKind`] and
//! [`InfoMask`] are what a host framework may ask for; only the processed value
//! of a temperature or humidity channel maps onto an acquisition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Th02Error;
use crate::protocol::ConversionConfig;

/// Quantities measured by the shared ADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Degrees Celsius
    Temperature,
    /// Percent relative humidity
    Humidity,
}

impl ChannelType {
    /// Both channels, in descriptor order.
    pub const ALL: [ChannelType; 2] = [ChannelType::Temperature, ChannelType::Humidity];

    /// CONFIG value that starts a conversion on this channel.
    pub fn config_pattern(self) -> ConversionConfig {
        match self {
            ChannelType::Temperature => ConversionConfig::TEMP_SELECT | ConversionConfig::START,
            ChannelType::Humidity => ConversionConfig::START,
        }
    }

    /// Unit of the processed value.
    pub fn unit(self) -> &'static str {
        match self {
            ChannelType::Temperature => "°C",
            ChannelType::Humidity => "%RH",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Temperature => f.write_str("temperature"),
            ChannelType::Humidity => f.write_str("humidity"),
        }
    }
}

impl FromStr for ChannelType {
    type Err = Th02Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(ChannelType::Temperature),
            "humidity" | "humidityrelative" | "rh" => Ok(ChannelType::Humidity),
            other => Err(Th02Error::InvalidArgument(format!(
                "unknown channel type '{other}'"
            ))),
        }
    }
}

/// Channel types a host framework can address.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ChannelKind {
    Temperature,
    HumidityRelative,
    Pressure,
    Voltage,
    Current,
    Illuminance,
}

/// Which value of a channel the host wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoMask {
    /// Final-unit value, no caller-side scaling
    Processed,
    /// Unconverted ADC code
    Raw,
    /// Scale factor for raw values
    Scale,
}

impl TryFrom<ChannelKind> for ChannelType {
    type Error = Th02Error;

    fn try_from(kind: ChannelKind) -> Result<Self, Self::Error> {
        match kind {
            ChannelKind::Temperature => Ok(ChannelType::Temperature),
            ChannelKind::HumidityRelative => Ok(ChannelType::Humidity),
            other => Err(Th02Error::InvalidArgument(format!(
                "invalid sensor type {other:?}"
            ))),
        }
    }
}

impl From<ChannelType> for ChannelKind {
    fn from(channel: ChannelType) -> Self {
        match channel {
            ChannelType::Temperature => ChannelKind::Temperature,
            ChannelType::Humidity => ChannelKind::HumidityRelative,
        }
    }
}

/// Static description of one exposed channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Host channel kind
    pub kind: ChannelKind,
    /// Values readable on this channel
    pub info: &'static [InfoMask],
}

/// Channels served by one device handle.
pub const CHANNELS: [ChannelSpec; 2] = [
    ChannelSpec {
        kind: ChannelKind::Temperature,
        info: &[InfoMask::Processed],
    },
    ChannelSpec {
        kind: ChannelKind::HumidityRelative,
        info: &[InfoMask::Processed],
    },
];

/// Resolve a host request to an acquirable channel.
pub fn resolve(kind: ChannelKind, info: InfoMask) -> Result<ChannelType, Th02Error> {
    if info != InfoMask::Processed {
        return Err(Th02Error::InvalidArgument(format!(
            "unsupported info mask {info:?}"
        )));
    }
    ChannelType::try_from(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_config_patterns() {
        assert_eq!(ChannelType::Temperature.config_pattern().bits(), 0x11);
        assert_eq!(ChannelType::Humidity.config_pattern().bits(), 0x01);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Temperature".parse::<ChannelType>().unwrap(), ChannelType::Temperature);
        assert_eq!("rh".parse::<ChannelType>().unwrap(), ChannelType::Humidity);
        let err = "pressure".parse::<ChannelType>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve(ChannelKind::HumidityRelative, InfoMask::Processed).unwrap(),
            ChannelType::Humidity
        );
        assert!(resolve(ChannelKind::Pressure, InfoMask::Processed).is_err());
        assert!(resolve(ChannelKind::Temperature, InfoMask::Raw).is_err());
    }

    #[test]
    fn test_channel_table_matches_types() {
        for (spec, channel) in CHANNELS.iter().zip(ChannelType::ALL) {
            assert_eq!(spec.kind, ChannelKind::from(channel));
            assert_eq!(spec.info, &[InfoMask::Processed]);
        }
    }
}
