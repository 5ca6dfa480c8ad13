//! # SX1280 Error Handling
//!
//! This module defines the Sx1280Error enum, which represents the different error
//! types that can occur while driving the transceiver.

use crate::radio::params::RadioMode;
use crate::transport::TransportError;
use thiserror::Error;

/// Represents the different error types that can occur in the SX1280 crate.
#[derive(Debug, Error)]
pub enum Sx1280Error {
    /// The BUSY line never went low within the allowed time.
    #[error("BUSY line still high after {waited_us} us")]
    BusTimeout { waited_us: u64 },

    /// The underlying SPI/GPIO exchange failed.
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),

    /// A value lies outside the legal set for the field or mode.
    #[error("Invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    /// The status byte reported an error, or the circuit mode was not the expected one.
    #[error("Unexpected chip state: expected {expected}, status byte 0x{status:02X}")]
    UnexpectedChipState { expected: &'static str, status: u8 },

    /// A transmission is already in flight.
    #[error("Transmission already pending")]
    Busy,

    /// Payload longer than the active mode allows.
    #[error("Frame too large: {len} bytes, maximum {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Payload shorter than the active mode allows.
    #[error("Frame too small: {len} bytes, minimum {min}")]
    FrameTooSmall { len: usize, min: usize },

    /// The radio did not leave the transmitting state in time.
    #[error("Radio still transmitting after {waited_ms} ms")]
    IdleTimeout { waited_ms: u64 },

    /// Operation is not available for the active packet type.
    #[error("{operation} is not supported in {mode} mode")]
    UnsupportedInMode {
        operation: &'static str,
        mode: RadioMode,
    },

    /// The session has been shut down or one of its threads panicked.
    #[error("Session closed")]
    SessionClosed,
}

impl Sx1280Error {
    /// Shorthand used by the parameter model.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Sx1280Error::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Sx1280Error>;
