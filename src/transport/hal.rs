//! `embedded-hal` bus adapter
//!
//! Wraps any blocking [`embedded_hal::i2c::I2c`] implementation and pins it to
//! one 7-bit peripheral address. Transfers run inline: a TH02 transaction is a
//! handful of bytes at 100-400 kHz, well below a scheduler tick.

use async_trait::async_trait;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};
use std::io;
use tracing::trace;

use super::BusTransport;

/// [`BusTransport`] over an `embedded-hal` I2C bus.
pub struct HalBus<I> {
    bus: I,
    address: u8,
}

impl<I: I2c> HalBus<I> {
    /// Bind `bus` to the peripheral at `address`.
    pub fn new(bus: I, address: u8) -> Self {
        Self { bus, address }
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.bus
    }
}

fn to_io_error(kind: ErrorKind) -> io::Error {
    let io_kind = match kind {
        ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address) => io::ErrorKind::NotFound,
        ErrorKind::NoAcknowledge(_) => io::ErrorKind::BrokenPipe,
        ErrorKind::ArbitrationLoss | ErrorKind::Bus => io::ErrorKind::Interrupted,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(io_kind, format!("i2c transfer failed: {kind}"))
}

#[async_trait]
impl<I> BusTransport for HalBus<I>
where
    I: I2c + Send,
{
    async fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        trace!(address = self.address, ?bytes, "i2c write");
        self.bus
            .write(self.address, bytes)
            .map_err(|e| to_io_error(e.kind()))?;
        Ok(bytes.len())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.bus
            .read(self.address, buf)
            .map_err(|e| to_io_error(e.kind()))?;
        trace!(address = self.address, bytes = ?buf, "i2c read");
        Ok(buf.len())
    }

    fn address(&self) -> u8 {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};

    #[derive(Debug)]
    struct Nack;

    impl embedded_hal::i2c::Error for Nack {
        fn kind(&self) -> ErrorKind {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        }
    }

    /// Records writes and answers every read with a fixed byte.
    #[derive(Default)]
    struct FakeI2c {
        writes: Vec<(u8, Vec<u8>)>,
        fill: u8,
        nack: bool,
    }

    impl ErrorType for FakeI2c {
        type Error = Nack;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.nack {
                return Err(Nack);
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                    Operation::Read(buf) => buf.fill(self.fill),
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_transfers_use_bound_address() {
        let mut bus = HalBus::new(
            FakeI2c {
                fill: 0xAB,
                ..Default::default()
            },
            0x40,
        );

        assert_eq!(bus.send(&[0x03, 0x11]).await.unwrap(), 2);
        let mut buf = [0u8; 2];
        assert_eq!(bus.receive(&mut buf).await.unwrap(), 2);
        assert_eq!(buf, [0xAB, 0xAB]);

        let fake = bus.release();
        assert_eq!(fake.writes, vec![(0x40, vec![0x03, 0x11])]);
    }

    #[tokio::test]
    async fn test_nack_maps_to_io_error() {
        let mut bus = HalBus::new(
            FakeI2c {
                nack: true,
                ..Default::default()
            },
            0x40,
        );
        let err = bus.send(&[0x00]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
