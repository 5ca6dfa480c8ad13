//! Unit tests for the `Sx1280Error` enum and its associated `Display` trait implementation.

use sx1280_rs::transport::{Line, TransportError};
use sx1280_rs::{RadioMode, Sx1280Error};

/// Tests that the `BusTimeout` variant is correctly formatted.
#[test]
fn test_bus_timeout_error() {
    let err = Sx1280Error::BusTimeout { waited_us: 100_000 };
    assert_eq!(err.to_string(), "BUSY line still high after 100000 us");
}

/// Tests that transport errors convert and keep their message.
#[test]
fn test_transport_failure_from() {
    let err: Sx1280Error = TransportError::Spi("ioctl failed".to_string()).into();
    assert!(matches!(err, Sx1280Error::TransportFailure(_)));
    assert_eq!(err.to_string(), "Transport failure: SPI error: ioctl failed");
}

/// Tests that a missing line names the line.
#[test]
fn test_unsupported_line_error() {
    let err = TransportError::UnsupportedLine(Line::Dio(3));
    assert_eq!(err.to_string(), "Line DIO3 is not wired on this transport");
}

/// Tests that the `UnexpectedChipState` variant prints the status byte in hex.
#[test]
fn test_unexpected_chip_state_error() {
    let err = Sx1280Error::UnexpectedChipState {
        expected: "STDBY_RC after reset",
        status: 0xA4,
    };
    assert_eq!(
        err.to_string(),
        "Unexpected chip state: expected STDBY_RC after reset, status byte 0xA4"
    );
}

/// Tests that the `Busy` variant is correctly formatted.
#[test]
fn test_busy_error() {
    assert_eq!(Sx1280Error::Busy.to_string(), "Transmission already pending");
}

/// Tests that the frame size variants are correctly formatted.
#[test]
fn test_frame_size_errors() {
    let err = Sx1280Error::FrameTooLarge { len: 300, max: 255 };
    assert_eq!(err.to_string(), "Frame too large: 300 bytes, maximum 255");
    let err = Sx1280Error::FrameTooSmall { len: 3, min: 6 };
    assert_eq!(err.to_string(), "Frame too small: 3 bytes, minimum 6");
}

/// Tests that the `UnsupportedInMode` variant uses the mode's display name.
#[test]
fn test_unsupported_in_mode_error() {
    let err = Sx1280Error::UnsupportedInMode {
        operation: "submit",
        mode: RadioMode::Ranging,
    };
    assert_eq!(err.to_string(), "submit is not supported in Ranging mode");
}

/// Tests that the `IdleTimeout` variant is correctly formatted.
#[test]
fn test_idle_timeout_error() {
    let err = Sx1280Error::IdleTimeout { waited_ms: 5000 };
    assert_eq!(err.to_string(), "Radio still transmitting after 5000 ms");
}
