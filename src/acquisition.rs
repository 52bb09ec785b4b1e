//! Acquisition state machine
//!
//! One acquisition is a complete, stateless measurement cycle:
//!
//! ```text
//! Idle -> ConfigWritten -> Polling -> DataRead -> Converted
//!   \__________\______________\__________\______-> Failed
//! ```
//!
//! 1. Write the channel's CONFIG pattern (START, plus TEMP_SELECT for temperature)
//! 2. Poll STATUS up to 16 times, sleeping one poll interval before each read,
//!    until the busy bit clears
//! 3. Read the 2-byte DATA register
//! 4. Convert to the channel's physical unit
//!
//! Running out of poll attempts does not fail the cycle unless the policy is
//! strict: the data register is read anyway and whatever it holds is converted.
//! Any bus failure ends the cycle in `Failed` and nothing read so far is kept.

use std::fmt;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::channel::ChannelType;
use crate::conversion;
use crate::error::{AppResult, Th02Error};
use crate::guard::ExclusionGuard;
use crate::protocol::{RawSample, RegisterProtocol};
use crate::transport::BusTransport;

/// Upper bound on status polls per acquisition.
pub const MAX_POLL_ATTEMPTS: u8 = 16;

/// States of one measurement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Nothing sent yet
    Idle,
    /// Conversion started
    ConfigWritten,
    /// Waiting for the busy bit
    Polling,
    /// Raw sample in hand
    DataRead,
    /// Terminal success
    Converted,
    /// Terminal error
    Failed,
}

impl AcquisitionState {
    /// True for `Converted` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, AcquisitionState::Converted | AcquisitionState::Failed)
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How the poll loop behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionPolicy {
    poll_interval: Duration,
    max_attempts: u8,
    strict_timeout: bool,
}

impl Default for AcquisitionPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            max_attempts: MAX_POLL_ATTEMPTS,
            strict_timeout: false,
        }
    }
}

impl AcquisitionPolicy {
    /// Build a policy; `max_attempts` is clamped to 1..=16.
    pub fn new(poll_interval: Duration, max_attempts: u8, strict_timeout: bool) -> Self {
        Self {
            poll_interval,
            max_attempts: max_attempts.clamp(1, MAX_POLL_ATTEMPTS),
            strict_timeout,
        }
    }

    /// Fail with [`Th02Error::ConversionTimeout`] instead of reading a sample the
    /// sensor never reported ready.
    pub fn strict(mut self) -> Self {
        self.strict_timeout = true;
        self
    }

    /// Sleep before each status read.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Status reads before giving up on the busy bit.
    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    /// Whether exhaustion is an error.
    pub fn is_strict(&self) -> bool {
        self.strict_timeout
    }
}

/// Outcome of a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    /// Channel measured
    pub channel: ChannelType,
    /// Processed value in the channel's unit
    pub value: i32,
    /// Raw DATA contents the value came from
    pub raw: RawSample,
    /// STATUS reads performed
    pub status_polls: u8,
    /// False if the busy bit was still set when polling stopped
    pub settled: bool,
}

/// One measurement cycle on an already locked device.
#[derive(Debug)]
pub struct Acquisition {
    channel: ChannelType,
    state: AcquisitionState,
}

impl Acquisition {
    /// Fresh cycle for `channel`.
    pub fn new(channel: ChannelType) -> Self {
        Self {
            channel,
            state: AcquisitionState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Channel being measured.
    pub fn channel(&self) -> ChannelType {
        self.channel
    }

    fn transition(&mut self, next: AcquisitionState) {
        trace!(channel = %self.channel, from = %self.state, to = %next, "acquisition state");
        self.state = next;
    }

    /// Drive the cycle to a terminal state.
    ///
    /// The caller must hold the device's exclusion lock for the whole call.
    pub async fn run<B: BusTransport>(
        &mut self,
        protocol: &mut RegisterProtocol<B>,
        policy: &AcquisitionPolicy,
    ) -> AppResult<Reading> {
        match self.drive(protocol, policy).await {
            Ok(reading) => {
                self.transition(AcquisitionState::Converted);
                Ok(reading)
            }
            Err(e) => {
                self.transition(AcquisitionState::Failed);
                Err(e)
            }
        }
    }

    async fn drive<B: BusTransport>(
        &mut self,
        protocol: &mut RegisterProtocol<B>,
        policy: &AcquisitionPolicy,
    ) -> AppResult<Reading> {
        protocol.write_config(self.channel.config_pattern()).await?;
        self.transition(AcquisitionState::ConfigWritten);

        self.transition(AcquisitionState::Polling);
        let mut polls: u8 = 0;
        let mut settled = false;
        while polls < policy.max_attempts() {
            pause(policy.poll_interval()).await;
            let status = protocol.read_status().await?;
            polls += 1;
            debug!(attempt = polls, status = format_args!("{:02x}", status.0), "status");
            if !status.is_busy() {
                settled = true;
                break;
            }
        }

        if !settled {
            if policy.is_strict() {
                return Err(Th02Error::ConversionTimeout { attempts: polls });
            }
            warn!(
                channel = %self.channel,
                attempts = polls,
                "conversion still busy, reading data anyway"
            );
        }

        let raw = protocol.read_data().await?;
        self.transition(AcquisitionState::DataRead);
        debug!(high = format_args!("{:02x}", raw.high()), low = format_args!("{:02x}", raw.low()), "data");

        Ok(Reading {
            channel: self.channel,
            value: conversion::convert(self.channel, raw),
            raw,
            status_polls: polls,
            settled,
        })
    }
}

/// Scheduling yield between status checks.
async fn pause(interval: Duration) {
    if interval.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(interval).await;
    }
}

/// Full acquisition: take the device lock, run one cycle, release.
///
/// The permit is dropped before returning on both success and failure.
pub async fn acquire<B: BusTransport>(
    guard: &ExclusionGuard<RegisterProtocol<B>>,
    channel: ChannelType,
    policy: &AcquisitionPolicy,
) -> AppResult<Reading> {
    let mut protocol = guard.lock().await;
    let mut cycle = Acquisition::new(channel);
    let result = cycle.run(&mut *protocol, policy).await;
    drop(protocol);
    result
}
