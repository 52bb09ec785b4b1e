//! Simulated TH02 transport for testing
//!
//! [`MockBus`] emulates the sensor's register file behind the byte-level
//! transport interface. It provides:
//! - A register pointer set by the first byte of every write
//! - A conversion that stays busy for a scripted number of status polls
//! - Separate raw samples for the temperature and humidity pipelines
//! - Failure injection on a chosen send/receive and truncated data reads
//! - A transaction trace for test verification
//!
//! Clones share the same simulated device, so a test can keep a handle for
//! inspection after moving the bus into a driver.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use super::BusTransport;
use crate::protocol::{ConversionConfig, Register, StatusRegister};

/// One completed bus transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Bytes written to the peripheral
    Write(Vec<u8>),
    /// Bytes returned by the peripheral
    Read(Vec<u8>),
}

/// How long a started conversion reports busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyBehaviour {
    /// Busy for this many status reads after each start, then ready.
    Polls(u32),
    /// The busy bit never clears.
    Stuck,
}

#[derive(Debug)]
struct SimState {
    address: u8,
    pointer: Option<u8>,
    config: u8,
    busy: BusyBehaviour,
    busy_remaining: u32,
    temperature: [u8; 2],
    humidity: [u8; 2],
    data_len: usize,
    latency: Duration,
    fail_send_in: Option<usize>,
    fail_receive_in: Option<usize>,
    events: Vec<BusEvent>,
}

/// Simulated TH02 sensor
///
/// # Example
///
/// ```
/// use th02_daq::transport::MockBus;
///
/// let bus = MockBus::new(0x40)
///     .with_busy_polls(2)
///     .with_temperature_raw(0x80, 0x00);
/// assert!(bus.events().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MockBus {
    state: Arc<Mutex<SimState>>,
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new(0x40)
    }
}

impl MockBus {
    /// Create a simulated sensor that is ready on the first status poll.
    ///
    /// Initial samples read as 25 °C and 50 %RH.
    pub fn new(address: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                address,
                pointer: None,
                config: 0,
                busy: BusyBehaviour::Polls(0),
                busy_remaining: 0,
                // code 2400 -> 2400 / 32 - 50 = 25
                temperature: sample_bytes(2400 << 2),
                // code 1184 -> 1184 / 16 - 24 = 50
                humidity: sample_bytes(1184 << 4),
                data_len: 2,
                latency: Duration::ZERO,
                fail_send_in: None,
                fail_receive_in: None,
                events: Vec::new(),
            })),
        }
    }

    /// Report busy for `polls` status reads after each conversion start.
    pub fn with_busy_polls(self, polls: u32) -> Self {
        self.state.lock().busy = BusyBehaviour::Polls(polls);
        self
    }

    /// Never clear the busy bit.
    pub fn with_stuck_busy(self) -> Self {
        self.state.lock().busy = BusyBehaviour::Stuck;
        self
    }

    /// Set the raw temperature sample (`high` = byte 1, `low` = byte 0).
    pub fn with_temperature_raw(self, high: u8, low: u8) -> Self {
        self.state.lock().temperature = [low, high];
        self
    }

    /// Set the raw humidity sample (`high` = byte 1, `low` = byte 0).
    pub fn with_humidity_raw(self, high: u8, low: u8) -> Self {
        self.state.lock().humidity = [low, high];
        self
    }

    /// Delay every transfer, to widen race windows in concurrency tests.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().latency = latency;
        self
    }

    /// Truncate DATA register reads to `len` bytes.
    pub fn with_data_len(self, len: usize) -> Self {
        self.state.lock().data_len = len;
        self
    }

    /// Fail the `nth` send from now (1 = the next one).
    pub fn fail_send_on(&self, nth: usize) {
        self.state.lock().fail_send_in = Some(nth.max(1));
    }

    /// Fail the `nth` receive from now (1 = the next one).
    pub fn fail_receive_on(&self, nth: usize) {
        self.state.lock().fail_receive_in = Some(nth.max(1));
    }

    /// Update the temperature sample on a live bus.
    pub fn set_temperature_raw(&self, high: u8, low: u8) {
        self.state.lock().temperature = [low, high];
    }

    /// Update the humidity sample on a live bus.
    pub fn set_humidity_raw(&self, high: u8, low: u8) {
        self.state.lock().humidity = [low, high];
    }

    /// Completed transfers, oldest first.
    pub fn events(&self) -> Vec<BusEvent> {
        self.state.lock().events.clone()
    }

    /// Forget recorded transfers.
    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Number of CONFIG register writes recorded.
    pub fn config_writes(&self) -> usize {
        self.count_pointer_writes(Register::Config)
    }

    /// Number of STATUS register reads recorded.
    pub fn status_reads(&self) -> usize {
        self.count_pointer_writes(Register::Status)
    }

    /// Number of DATA register reads recorded.
    pub fn data_reads(&self) -> usize {
        self.count_pointer_writes(Register::Data)
    }

    fn count_pointer_writes(&self, register: Register) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, BusEvent::Write(bytes) if bytes.first() == Some(&register.addr())))
            .count()
    }

    async fn simulate_latency(&self) {
        let latency = self.state.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn sample_bytes(word: u16) -> [u8; 2] {
    let [high, low] = word.to_be_bytes();
    [low, high]
}

/// Decrement a pending failure countdown, returning true when it fires.
fn countdown(slot: &mut Option<usize>) -> bool {
    match slot {
        Some(1) => {
            *slot = None;
            true
        }
        Some(n) => {
            *n -= 1;
            false
        }
        None => false,
    }
}

#[async_trait]
impl BusTransport for MockBus {
    async fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.simulate_latency().await;
        let mut state = self.state.lock();

        if countdown(&mut state.fail_send_in) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected send failure"));
        }
        let Some(&register) = bytes.first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty write"));
        };

        state.pointer = Some(register);
        if register == Register::Config.addr() {
            if let Some(&value) = bytes.get(1) {
                state.config = value;
                if ConversionConfig::from_bits(value).contains(ConversionConfig::START) {
                    state.busy_remaining = match state.busy {
                        BusyBehaviour::Polls(n) => n,
                        BusyBehaviour::Stuck => u32::MAX,
                    };
                }
            }
        }

        state.events.push(BusEvent::Write(bytes.to_vec()));
        Ok(bytes.len())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.simulate_latency().await;
        let mut state = self.state.lock();

        if countdown(&mut state.fail_receive_in) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected receive failure"));
        }

        let payload: Vec<u8> = match state.pointer.and_then(Register::from_addr) {
            Some(Register::Status) => {
                let busy = state.busy_remaining > 0;
                if busy && state.busy != BusyBehaviour::Stuck {
                    state.busy_remaining -= 1;
                }
                let status = if busy { StatusRegister::BUSY } else { 0 };
                vec![status]
            }
            Some(Register::Data) => {
                let sample = if ConversionConfig::from_bits(state.config)
                    .contains(ConversionConfig::TEMP_SELECT)
                {
                    state.temperature
                } else {
                    state.humidity
                };
                sample[..state.data_len.min(2)].to_vec()
            }
            Some(Register::Config) => vec![state.config],
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "no register selected",
                ))
            }
        };

        let n = payload.len().min(buf.len());
        buf[..n].copy_from_slice(&payload[..n]);
        state.events.push(BusEvent::Read(payload[..n].to_vec()));
        Ok(n)
    }

    fn address(&self) -> u8 {
        self.state.lock().address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_clears_after_scripted_polls() {
        let mut bus = MockBus::new(0x40).with_busy_polls(2);
        bus.send(&[0x03, 0x01]).await.unwrap();

        let mut status = [0u8; 1];
        for expected in [1u8, 1, 0, 0] {
            bus.send(&[0x00]).await.unwrap();
            bus.receive(&mut status).await.unwrap();
            assert_eq!(status[0], expected);
        }
    }

    #[tokio::test]
    async fn test_data_follows_selected_pipeline() {
        let mut bus = MockBus::new(0x40)
            .with_temperature_raw(0x80, 0x04)
            .with_humidity_raw(0x30, 0x10);
        let mut data = [0u8; 2];

        bus.send(&[0x03, 0x11]).await.unwrap();
        bus.send(&[0x01]).await.unwrap();
        bus.receive(&mut data).await.unwrap();
        assert_eq!(data, [0x04, 0x80]);

        bus.send(&[0x03, 0x01]).await.unwrap();
        bus.send(&[0x01]).await.unwrap();
        bus.receive(&mut data).await.unwrap();
        assert_eq!(data, [0x10, 0x30]);
    }

    #[tokio::test]
    async fn test_injected_send_failure_fires_once() {
        let mut bus = MockBus::new(0x40);
        bus.fail_send_on(2);

        assert!(bus.send(&[0x00]).await.is_ok());
        assert!(bus.send(&[0x00]).await.is_err());
        assert!(bus.send(&[0x00]).await.is_ok());
        assert_eq!(bus.events().len(), 2);
    }

    #[tokio::test]
    async fn test_receive_without_pointer_fails() {
        let mut bus = MockBus::new(0x40);
        let mut buf = [0u8; 1];
        let err = bus.receive(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_short_data_read() {
        let mut bus = MockBus::new(0x40).with_data_len(1);
        let mut data = [0u8; 2];
        bus.send(&[0x01]).await.unwrap();
        assert_eq!(bus.receive(&mut data).await.unwrap(), 1);
    }

    #[test]
    fn test_default_samples() {
        let bus = MockBus::default();
        let state = bus.state.lock();
        assert_eq!(state.temperature, [0x80, 0x25]);
        assert_eq!(state.address, 0x40);
    }
}
