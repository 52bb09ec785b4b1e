//! TH02 device handle
//!
//! A [`Th02Device`] is created when the sensor is bound to a transport and owns
//! everything an acquisition needs: the register protocol behind the device's
//! exclusion guard, and the polling policy. Share it between tasks with an
//! `Arc`; concurrent readers of either channel queue on the guard.
//!
//! # Example Usage
//!
//! ```no_run
//! use th02_daq::{ChannelType, Th02Device};
//! use th02_daq::transport::MockBus;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let device = Th02Device::new("th02", MockBus::new(0x40));
//!     let celsius = device.acquire(ChannelType::Temperature).await?;
//!     println!("Temperature: {} °C", celsius);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info_span, Instrument};

use crate::acquisition::{self, AcquisitionPolicy, Reading};
use crate::capabilities::ProcessedReadout;
use crate::channel::{self, ChannelKind, ChannelSpec, ChannelType, InfoMask, CHANNELS};
use crate::config::Settings;
use crate::error::AppResult;
use crate::guard::ExclusionGuard;
use crate::protocol::RegisterProtocol;
use crate::transport::BusTransport;

/// Driver for one TH02 temperature/humidity sensor.
pub struct Th02Device<B> {
    name: String,
    address: u8,
    /// Register access, held for a whole configure/poll/read sequence
    protocol: ExclusionGuard<RegisterProtocol<B>>,
    policy: AcquisitionPolicy,
}

impl<B: BusTransport> Th02Device<B> {
    /// Bind a transport with the default polling policy.
    pub fn new(name: impl Into<String>, bus: B) -> Self {
        Self::with_policy(name, bus, AcquisitionPolicy::default())
    }

    /// Bind a transport with a custom polling policy.
    pub fn with_policy(name: impl Into<String>, bus: B, policy: AcquisitionPolicy) -> Self {
        let address = bus.address();
        Self {
            name: name.into(),
            address,
            protocol: ExclusionGuard::new(RegisterProtocol::new(bus)),
            policy,
        }
    }

    /// Bind a transport using the `[device]` and `[acquisition]` settings.
    pub fn from_settings(settings: &Settings, bus: B) -> Self {
        Self::with_policy(
            settings.device.name.clone(),
            bus,
            settings.acquisition.policy(),
        )
    }

    /// Device name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Peripheral address.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Polling policy in effect.
    pub fn policy(&self) -> &AcquisitionPolicy {
        &self.policy
    }

    /// Run one acquisition and return the processed value.
    pub async fn acquire(&self, channel: ChannelType) -> AppResult<i32> {
        Ok(self.acquire_reading(channel).await?.value)
    }

    /// Run one acquisition and return the full reading.
    pub async fn acquire_reading(&self, channel: ChannelType) -> AppResult<Reading> {
        let span = info_span!("acquire", device = %self.name, address = self.address, %channel);
        async {
            match acquisition::acquire(&self.protocol, channel, &self.policy).await {
                Ok(reading) => {
                    debug!(value = reading.value, polls = reading.status_polls, "reading");
                    Ok(reading)
                }
                Err(e) => {
                    error!(error = %e, "acquisition failed");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Unbind and return the transport.
    pub fn into_transport(self) -> B {
        self.protocol.into_inner().into_inner()
    }
}

#[async_trait]
impl<B: BusTransport> ProcessedReadout for Th02Device<B> {
    fn channels(&self) -> &'static [ChannelSpec] {
        &CHANNELS
    }

    async fn read_processed(&self, kind: ChannelKind, info: InfoMask) -> AppResult<i32> {
        let channel = channel::resolve(kind, info).map_err(|e| {
            error!(device = %self.name, ?kind, ?info, "rejected request");
            e
        })?;
        self.acquire(channel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Th02Error;
    use crate::transport::MockBus;
    use std::time::Duration;

    fn device(bus: MockBus) -> Th02Device<MockBus> {
        Th02Device::with_policy(
            "test",
            bus,
            AcquisitionPolicy::new(Duration::ZERO, 16, false),
        )
    }

    #[tokio::test]
    async fn test_acquire_both_channels() {
        let bus = MockBus::new(0x40)
            .with_temperature_raw(0x80, 0x00)
            .with_humidity_raw(0x30, 0x00);
        let device = device(bus);

        assert_eq!(device.acquire(ChannelType::Temperature).await.unwrap(), 206);
        assert_eq!(device.acquire(ChannelType::Humidity).await.unwrap(), 24);
    }

    #[tokio::test]
    async fn test_read_processed_rejects_without_bus_access() {
        let bus = MockBus::new(0x40);
        let device = device(bus.clone());

        let err = device
            .read_processed(ChannelKind::Pressure, InfoMask::Processed)
            .await
            .unwrap_err();
        assert!(matches!(err, Th02Error::InvalidArgument(_)));

        let err = device
            .read_processed(ChannelKind::Temperature, InfoMask::Scale)
            .await
            .unwrap_err();
        assert!(matches!(err, Th02Error::InvalidArgument(_)));
        assert!(bus.events().is_empty());
    }

    #[tokio::test]
    async fn test_read_processed_humidity() {
        let device = device(MockBus::new(0x40).with_humidity_raw(0x30, 0x00));
        let value = device
            .read_processed(ChannelKind::HumidityRelative, InfoMask::Processed)
            .await
            .unwrap();
        assert_eq!(value, 24);
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.device.name = "attic".to_string();
        settings.acquisition.max_poll_attempts = 4;

        let device = Th02Device::from_settings(&settings, MockBus::new(0x41));
        assert_eq!(device.name(), "attic");
        assert_eq!(device.address(), 0x41);
        assert_eq!(device.policy().max_attempts(), 4);
        assert_eq!(device.channels().len(), 2);
        assert_eq!(device.into_transport().address(), 0x41);
    }
}
