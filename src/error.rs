//! Custom error types for the acquisition core.
//!
//! This module defines the primary error type, `Th02Error`, used by every layer of
//! the crate. Using the `thiserror` crate, it provides a centralized and consistent
//! way to report what went wrong during a measurement cycle.
//!
//! ## Error Hierarchy
//!
//! - **`Bus`**: The underlying send/receive primitive failed. The transport's
//!   `std::io::Error` is carried unchanged.
//! - **`ShortRead`**: The DATA register returned fewer bytes than a raw sample needs.
//!   Reported to callers as a generic I/O failure (see [`Th02Error::kind`]).
//! - **`InvalidArgument`**: The caller asked for a channel or value kind the sensor
//!   does not provide. Raised before any bus transaction.
//! - **`ConversionTimeout`**: Only produced when strict polling is enabled and the
//!   busy bit never cleared.
//! - **`Config`**: Configuration could not be loaded or failed validation.
//!
//! Failed acquisitions never carry partial data; bytes read before the failure
//! are discarded.

use crate::config::ConfigError;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, Th02Error>;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum Th02Error {
    #[error("Bus transport error: {0}")]
    Bus(#[from] std::io::Error),

    #[error("Short read from data register: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Conversion still busy after {attempts} status polls")]
    ConversionTimeout { attempts: u8 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification of a [`Th02Error`], mirroring how a host framework
/// would report the failure (I/O vs. bad argument vs. timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bus failure or short read.
    Io,
    /// Unsupported channel or request.
    InvalidArgument,
    /// Strict polling gave up.
    TimedOut,
    /// Bad configuration.
    Config,
}

impl Th02Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Th02Error::Bus(_) | Th02Error::ShortRead { .. } => ErrorKind::Io,
            Th02Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Th02Error::ConversionTimeout { .. } => ErrorKind::TimedOut,
            Th02Error::Config(_) => ErrorKind::Config,
        }
    }
}
