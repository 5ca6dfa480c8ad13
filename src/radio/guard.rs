//! BUSY-line guard around every bus exchange.
//!
//! The chip raises BUSY while it digests a command and ignores the bus meanwhile.
//! [`BusyGuard`] waits for BUSY low before each exchange, and optionally after it
//! as well. It spins briefly with yields, then sleeps in short steps, and gives up
//! with [`Sx1280Error::BusTimeout`] once the overall budget is spent.

use crate::error::{Result, Sx1280Error};
use crate::logging::log_frame;
use crate::radio::command::Command;
use crate::transport::{Line, Transport};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// When to wait for BUSY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Before each exchange only.
    #[default]
    Before,
    /// Before and again after each exchange.
    BeforeAndAfter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyGuard {
    pub policy: BusyPolicy,
    pub timeout: Duration,
    pub spin: Duration,
    pub sleep_step_us: u32,
}

impl Default for BusyGuard {
    fn default() -> Self {
        Self {
            policy: BusyPolicy::Before,
            timeout: Duration::from_millis(100),
            spin: Duration::from_micros(50),
            sleep_step_us: 100,
        }
    }
}

impl BusyGuard {
    /// Block until BUSY reads low, or fail after `timeout`.
    pub fn wait_ready<T: Transport + ?Sized>(&self, transport: &mut T, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            if !transport.gpio_read(Line::Busy)? {
                return Ok(());
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                log::warn!("BUSY still high after {} us", elapsed.as_micros());
                return Err(Sx1280Error::BusTimeout {
                    waited_us: elapsed.as_micros() as u64,
                });
            }
            if elapsed < self.spin {
                std::thread::yield_now();
            } else {
                transport.delay_us(self.sleep_step_us);
            }
        }
    }

    /// Run one command under the guard and return its raw read bytes.
    pub fn run<T: Transport + ?Sized>(&self, transport: &mut T, cmd: &Command) -> Result<Vec<u8>> {
        self.wait_ready(transport, self.timeout)?;

        let segments = cmd.segments();
        if log::log_enabled!(log::Level::Trace) {
            let sent: Vec<u8> = segments.iter().flat_map(|s| s.padded_write()).collect();
            log_frame("spi >", &sent);
        }
        let raw = transport.exchange(&segments, true)?;
        log_frame("spi <", &raw);

        if self.policy == BusyPolicy::BeforeAndAfter {
            self.wait_ready(transport, self.timeout)?;
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_run_records_exchange() {
        let (mut transport, handle) = MockTransport::new();
        let guard = BusyGuard::default();
        guard.run(&mut transport, &Command::SetFs).unwrap();
        assert_eq!(handle.commands(), vec![vec![0xC1, 0x00]]);
    }

    #[test]
    fn test_stuck_busy_times_out() {
        let (mut transport, handle) = MockTransport::new();
        handle.set_busy_stuck(true);
        let guard = BusyGuard {
            timeout: Duration::from_millis(5),
            ..BusyGuard::default()
        };
        let err = guard.run(&mut transport, &Command::GetStatus).unwrap_err();
        assert!(matches!(err, Sx1280Error::BusTimeout { .. }));
        assert!(handle.commands().is_empty());
    }

    #[test]
    fn test_before_and_after_policy() {
        let (mut transport, handle) = MockTransport::new();
        let guard = BusyGuard {
            policy: BusyPolicy::BeforeAndAfter,
            ..BusyGuard::default()
        };
        guard.run(&mut transport, &Command::GetStatus).unwrap();
        assert_eq!(handle.busy_polls(), 2);
    }
}
