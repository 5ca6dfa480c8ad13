//! # sx1280-rs - A Rust Driver for the Semtech SX1280 2.4 GHz Transceiver
//!
//! The sx1280-rs crate drives the SX1280/SX1281 multi-modulation transceiver over
//! SPI plus a handful of GPIO lines (BUSY, NRESET, DIO1..3), and turns it into a
//! half-duplex packet service that is always listening unless actively sending.
//!
//! ## Features
//!
//! - Bit-exact command codec for the full SX1280 opcode table
//! - Validated parameter model for GFSK, FLRC, LoRa, Ranging and BLE
//! - Interrupt-driven state machine with a shadow copy of the chip configuration
//! - A thread-safe [`Session`](radio::Session) with non-blocking submit and
//!   field-level reconfiguration with rollback
//! - A simulated chip for tests and an rppal-backed Raspberry Pi transport
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! sx1280-rs = { version = "0.3", features = ["raspberry-pi"] }
//! ```
//!
//! ```rust,no_run
//! use sx1280_rs::{RadioConfig, RadioEvent, RadioMode, Session};
//! use sx1280_rs::transport::MockTransport;
//!
//! let mut config = RadioConfig::default();
//! config.mode = RadioMode::Gfsk;
//! let (transport, _chip) = MockTransport::new();
//! let (session, events) = Session::start(transport, &config)?;
//! session.submit(b"hello".to_vec())?;
//! for event in events.iter() {
//!     if let RadioEvent::Received(frame) = event {
//!         println!("{} bytes at {} dBm", frame.data.len(), frame.rssi_dbm);
//!     }
//! }
//! # Ok::<(), sx1280_rs::Sx1280Error>(())
//! ```

pub mod constants;
pub mod error;
pub mod logging;
pub mod radio;
pub mod transport;

pub use crate::error::{Result, Sx1280Error};
pub use crate::logging::{init_logger, init_logger_with_level};

pub use radio::params::{hz_to_pll, pll_to_hz, RfFrequency, Timeout};
pub use radio::{
    ChipConfig, DropReason, InboundFrame, LinkStats, RadioConfig, RadioEvent, RadioMode,
    RadioState, Session, Setting,
};
pub use transport::{Transport, TransportError};
