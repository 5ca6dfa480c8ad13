//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use sx1280_rs::transport::{MockHandle, MockTransport};
use sx1280_rs::{RadioConfig, RadioEvent, RadioMode, Session};

pub const WAIT: Duration = Duration::from_secs(2);

pub type MockSession = Session<MockTransport>;

/// Start a session on a fresh simulated chip and forget the setup traffic.
pub fn start(config: &RadioConfig) -> (MockSession, Receiver<RadioEvent>, MockHandle) {
    let (transport, handle) = MockTransport::new();
    let (session, events) = Session::start(transport, config).expect("session start");
    handle.take_commands();
    (session, events, handle)
}

pub fn gfsk_config() -> RadioConfig {
    RadioConfig {
        mode: RadioMode::Gfsk,
        ..RadioConfig::default()
    }
}

/// Poll `cond` until it holds or `WAIT` runs out.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < WAIT {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

/// Position of the last logged exchange with `opcode`.
pub fn last_index_of(handle: &MockHandle, opcode: u8) -> Option<usize> {
    handle.opcodes().iter().rposition(|op| *op == opcode)
}
