//! Bus transport implementations
//!
//! This module defines the [`BusTransport`] trait, the byte-level send/receive
//! primitive the acquisition core is driven through, plus the transports that
//! implement it:
//!
//! - [`MockBus`] - simulated TH02 register file for tests and `--simulate`
//! - [`HalBus`] - any `embedded_hal::i2c::I2c` bus at a fixed address
//! - `linux` (feature `linux_i2c`) - `/dev/i2c-N` via `linux-embedded-hal`
//!
//! A transport is bound to exactly one peripheral address when it is created;
//! callers never pass an address per transfer.

pub mod hal;
#[cfg(feature = "linux_i2c")]
pub mod linux;
pub mod mock;

pub use hal::HalBus;
pub use mock::{BusEvent, MockBus};

use async_trait::async_trait;
use std::io;

/// Addressed byte transport to a single peripheral.
///
/// Both operations return the number of bytes actually transferred. A transport
/// is assumed non-reentrant: the driver serializes all calls for one device.
#[async_trait]
pub trait BusTransport: Send {
    /// Write `bytes` to the peripheral in one transaction.
    async fn send(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes from the peripheral in one transaction.
    async fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Peripheral address, for diagnostics.
    fn address(&self) -> u8;
}

#[async_trait]
impl<T: BusTransport + ?Sized> BusTransport for Box<T> {
    async fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        (**self).send(bytes).await
    }

    async fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).receive(buf).await
    }

    fn address(&self) -> u8 {
        (**self).address()
    }
}
