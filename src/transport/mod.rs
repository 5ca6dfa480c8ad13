//! # Transport Abstraction for the SX1280
//!
//! This module defines the [`Transport`] trait the driver consumes: SPI exchanges
//! made of one or more segments issued under a single chip-select, plus the GPIO
//! lines (BUSY, RESET, DIO1..3) around the chip.
//!
//! Two implementations ship with the crate:
//! - [`mock::MockTransport`]: a simulated chip used by tests and the CLI dry runs.
//! - `raspberry_pi::RaspberryPiTransport`: rppal-backed, behind the `raspberry-pi` feature.

use std::fmt;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod mock;

#[cfg(feature = "raspberry-pi")]
pub mod raspberry_pi;

pub use mock::{MockHandle, MockTransport};

#[cfg(feature = "raspberry-pi")]
pub use raspberry_pi::{PinMap, RaspberryPiTransport, RaspberryPiTransportBuilder};

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("SPI error: {0}")]
    Spi(String),

    #[error("GPIO error: {0}")]
    Gpio(String),

    #[error("Timed out waiting for {0} to change level")]
    TimedOut(Line),

    #[error("Line {0} is not wired on this transport")]
    UnsupportedLine(Line),
}

/// Host-visible lines of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Chip output, high while a command is being processed.
    Busy,
    /// Active-low reset input.
    Reset,
    /// Interrupt output DIO1, DIO2 or DIO3.
    Dio(u8),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Busy => write!(f, "BUSY"),
            Line::Reset => write!(f, "NRESET"),
            Line::Dio(n) => write!(f, "DIO{n}"),
        }
    }
}

/// Edge selection for interrupt subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

/// One observed edge on a subscribed line.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEvent {
    pub line: Line,
    pub at: Instant,
}

/// Stream of edge events for one line; ends when the transport drops its sender.
pub type EdgeEvents = Receiver<EdgeEvent>;

/// One piece of an SPI transaction.
///
/// The clocked length of a segment is `max(write.len(), read_len)`. Write bytes are
/// padded with NOPs, and the first `read_len` received bytes are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub write: Vec<u8>,
    pub read_len: usize,
}

impl Segment {
    /// Write-only segment.
    pub fn write(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            write: bytes.into(),
            read_len: 0,
        }
    }

    /// Read-only segment clocking out `len` NOPs.
    pub fn read(len: usize) -> Self {
        Self {
            write: Vec::new(),
            read_len: len,
        }
    }

    /// Full-duplex segment.
    pub fn transfer(bytes: impl Into<Vec<u8>>, read_len: usize) -> Self {
        Self {
            write: bytes.into(),
            read_len,
        }
    }

    pub fn clocked_len(&self) -> usize {
        self.write.len().max(self.read_len)
    }

    /// Write bytes padded with NOPs to the clocked length.
    pub fn padded_write(&self) -> Vec<u8> {
        let mut out = self.write.clone();
        out.resize(self.clocked_len(), crate::constants::NOP);
        out
    }
}

/// Synchronous access to the chip's bus and pins.
///
/// Implementations may block. The driver only calls them with its main lock held,
/// so no two exchanges ever interleave.
pub trait Transport {
    /// Runs all segments as one transaction and returns the concatenated read bytes.
    ///
    /// With `hold_chip_select` set, chip-select stays asserted between segments.
    fn exchange(
        &mut self,
        segments: &[Segment],
        hold_chip_select: bool,
    ) -> Result<Vec<u8>, TransportError>;

    /// Read the level of an input line.
    fn gpio_read(&mut self, line: Line) -> Result<bool, TransportError>;

    /// Drive an output line.
    fn gpio_write(&mut self, line: Line, level: bool) -> Result<(), TransportError>;

    /// Sleep for roughly `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Subscribe to edges on an interrupt line.
    fn subscribe_edge(&mut self, line: Line, edge: Edge) -> Result<EdgeEvents, TransportError>;

    /// Poll `line` until it reads `level` or `timeout` elapses.
    fn gpio_wait_for_level(
        &mut self,
        line: Line,
        level: bool,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let start = Instant::now();
        loop {
            if self.gpio_read(line)? == level {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(TransportError::TimedOut(line));
            }
            self.delay_us(10);
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(
        &mut self,
        segments: &[Segment],
        hold_chip_select: bool,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).exchange(segments, hold_chip_select)
    }

    fn gpio_read(&mut self, line: Line) -> Result<bool, TransportError> {
        (**self).gpio_read(line)
    }

    fn gpio_write(&mut self, line: Line, level: bool) -> Result<(), TransportError> {
        (**self).gpio_write(line, level)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn subscribe_edge(&mut self, line: Line, edge: Edge) -> Result<EdgeEvents, TransportError> {
        (**self).subscribe_edge(line, edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_padding() {
        let seg = Segment::transfer(vec![0x15], 4);
        assert_eq!(seg.clocked_len(), 4);
        assert_eq!(seg.padded_write(), vec![0x15, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_read_segment_is_all_nop() {
        let seg = Segment::read(3);
        assert_eq!(seg.padded_write(), vec![0x00; 3]);
    }

    #[test]
    fn test_line_display() {
        assert_eq!(Line::Dio(2).to_string(), "DIO2");
        assert_eq!(Line::Busy.to_string(), "BUSY");
    }
}
