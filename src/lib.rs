//! Acquisition core for the TH02 temperature/humidity sensor.
//!
//! This library drives the sensor's measurement cycle over a byte-level bus
//! transport: start a conversion, poll the busy flag, read the raw sample and
//! convert it to °C or %RH. Both channels share one ADC, so every cycle runs
//! under the device's exclusion guard.

pub mod acquisition;
pub mod capabilities;
pub mod channel;
pub mod config;
pub mod conversion;
pub mod device;
pub mod error;
pub mod guard;
pub mod logging;
pub mod protocol;
pub mod transport;

pub use acquisition::{AcquisitionPolicy, AcquisitionState, Reading};
pub use capabilities::ProcessedReadout;
pub use channel::{ChannelKind, ChannelType, InfoMask};
pub use device::Th02Device;
pub use error::{AppResult, Th02Error};
