//! TH02 register protocol
//!
//! Register access is pointer based: every transaction starts by writing the
//! register address, followed either by a value (CONFIG) or by a separate
//! read of the register contents (STATUS, DATA).
//!
//! | Register | Addr | Access |
//! |----------|------|--------|
//! | STATUS   | 0x00 | read 1 byte, bit 0 = conversion in progress |
//! | DATA     | 0x01 | read 2 bytes, byte 1 = high, byte 0 = low |
//! | CONFIG   | 0x03 | write `[addr, value]`, bit 4 = temperature, bit 0 = start |

use std::ops::BitOr;
use tracing::error;

use crate::error::{AppResult, Th02Error};
use crate::transport::BusTransport;

/// Register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Conversion status
    Status,
    /// Raw sample
    Data,
    /// Conversion control
    Config,
}

impl Register {
    /// Address written before each transaction.
    pub const fn addr(self) -> u8 {
        match self {
            Register::Status => 0x00,
            Register::Data => 0x01,
            Register::Config => 0x03,
        }
    }

    /// Reverse lookup of [`Register::addr`].
    pub fn from_addr(addr: u8) -> Option<Self> {
        match addr {
            0x00 => Some(Register::Status),
            0x01 => Some(Register::Data),
            0x03 => Some(Register::Config),
            _ => None,
        }
    }
}

/// CONFIG register bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionConfig(u8);

impl ConversionConfig {
    /// Start a conversion.
    pub const START: Self = Self(1 << 0);
    /// Route the ADC to the temperature sensor instead of humidity.
    pub const TEMP_SELECT: Self = Self(1 << 4);

    /// Wrap a raw register value.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw register value.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ConversionConfig {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// STATUS register contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister(pub u8);

impl StatusRegister {
    /// Conversion in progress.
    pub const BUSY: u8 = 0x01;

    /// Bit 0 set means the ADC has not finished.
    pub const fn is_busy(self) -> bool {
        self.0 & Self::BUSY != 0
    }
}

/// Raw ADC sample as read from DATA: `bytes[1]` is high, `bytes[0]` is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    /// Wire order, low byte first.
    pub bytes: [u8; 2],
}

impl RawSample {
    /// Build a sample from its high and low bytes.
    pub const fn new(high: u8, low: u8) -> Self {
        Self { bytes: [low, high] }
    }

    /// High-order byte.
    pub const fn high(self) -> u8 {
        self.bytes[1]
    }

    /// Low-order byte.
    pub const fn low(self) -> u8 {
        self.bytes[0]
    }
}

/// Register-level transactions over a [`BusTransport`].
pub struct RegisterProtocol<B> {
    bus: B,
}

impl<B: BusTransport> RegisterProtocol<B> {
    /// Wrap a transport already bound to the sensor's address.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Peripheral address of the underlying transport.
    pub fn address(&self) -> u8 {
        self.bus.address()
    }

    /// Give the transport back.
    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Read the STATUS register.
    pub async fn read_status(&mut self) -> AppResult<StatusRegister> {
        self.select(Register::Status, "read_status").await?;

        let mut status = [0u8; 1];
        self.bus.receive(&mut status).await.map_err(|e| {
            error!(address = self.bus.address(), error = %e, "read_status: failed to receive data");
            Th02Error::Bus(e)
        })?;

        Ok(StatusRegister(status[0]))
    }

    /// Read the two-byte DATA register.
    ///
    /// A transfer that returns fewer than two bytes is a [`Th02Error::ShortRead`].
    pub async fn read_data(&mut self) -> AppResult<RawSample> {
        self.select(Register::Data, "read_data").await?;

        let mut bytes = [0u8; 2];
        let received = self.bus.receive(&mut bytes).await.map_err(|e| {
            error!(address = self.bus.address(), error = %e, "read_data: failed to receive data");
            Th02Error::Bus(e)
        })?;

        if received != bytes.len() {
            return Err(Th02Error::ShortRead {
                expected: bytes.len(),
                received,
            });
        }

        Ok(RawSample { bytes })
    }

    /// Write CONFIG in a single `[addr, value]` transaction.
    pub async fn write_config(&mut self, config: ConversionConfig) -> AppResult<()> {
        let frame = [Register::Config.addr(), config.bits()];
        self.bus.send(&frame).await.map_err(|e| {
            error!(address = self.bus.address(), error = %e, "write_config: failed to send data");
            Th02Error::Bus(e)
        })?;
        Ok(())
    }

    async fn select(&mut self, register: Register, op: &'static str) -> AppResult<()> {
        self.bus.send(&[register.addr()]).await.map_err(|e| {
            error!(address = self.bus.address(), error = %e, "{op}: failed to send data");
            Th02Error::Bus(e)
        })?;
        Ok(())
    }
}
