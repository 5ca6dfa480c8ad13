//! # Radio Session
//!
//! The outward-facing object. It owns the [`RadioStateMachine`] behind one mutex,
//! together with the threads that drive it:
//!
//! - a worker thread that performs transmissions handed over by [`Session::submit`],
//! - one interrupt thread per wired DIO line, each servicing edges under the same lock.
//!
//! `submit` never touches the main lock. It only claims the single transmit slot,
//! which is guarded by a short-lived second lock, and wakes the worker. Callers that
//! need the radio idle (`configure`, `set_mode`) wait on a condition variable that
//! is signalled whenever the radio leaves the transmitting state.
//!
//! Lock order is always main, then slot.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sx1280_rs::radio::{RadioConfig, RadioEvent, Session, Setting};
//! use sx1280_rs::transport::MockTransport;
//!
//! let (transport, _chip) = MockTransport::new();
//! let (session, events) = Session::start(transport, &RadioConfig::default())?;
//! session.submit(vec![0x01, 0x02, 0x03])?;
//! session.configure(Setting::PowerDbm(10))?;
//! if let Ok(RadioEvent::TransmitDone { len }) = events.recv() {
//!     println!("sent {len} bytes");
//! }
//! # Ok::<(), sx1280_rs::Sx1280Error>(())
//! ```

use crate::error::{Result, Sx1280Error};
use crate::radio::config::{ChipConfig, ModeProfiles, RadioConfig, Setting, ValidatedConfig};
use crate::radio::params::{check_frame_len, RadioMode};
use crate::radio::state_machine::{
    DropReason, LinkStats, OutboundFrame, RadioEvent, RadioState, RadioStateMachine,
};
use crate::transport::{Edge, EdgeEvents, Line, Transport};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often interrupt threads re-check the running flag.
const IRQ_POLL_INTERVAL: Duration = Duration::from_millis(20);

enum Work {
    Transmit,
    Shutdown,
}

/// The single frame-in-flight slot.
struct TxSlot {
    queued: Option<OutboundFrame>,
    busy: bool,
    limits: RangeInclusive<usize>,
    mode: RadioMode,
}

struct Shared<T: Transport> {
    machine: Mutex<RadioStateMachine<T>>,
    idle: Condvar,
    slot: Mutex<TxSlot>,
    events: Sender<RadioEvent>,
    running: AtomicBool,
    irq_enabled: AtomicBool,
}

impl<T: Transport> Shared<T> {
    fn lock(&self) -> Result<MutexGuard<'_, RadioStateMachine<T>>> {
        self.machine.lock().map_err(|_| Sx1280Error::SessionClosed)
    }

    fn deliver(&self, events: Vec<RadioEvent>) {
        for event in events {
            if self.events.send(event).is_err() {
                log::debug!("Event receiver dropped");
            }
        }
    }

    /// Release the slot and wake idle waiters once the radio stops transmitting.
    fn settle(&self, machine: &RadioStateMachine<T>) {
        if machine.state() == RadioState::Transmitting {
            return;
        }
        if let Ok(mut slot) = self.slot.lock() {
            if slot.queued.is_none() {
                slot.busy = false;
            }
            slot.limits = machine.frame_limits();
            slot.mode = machine.mode();
        }
        self.idle.notify_all();
    }

    fn service_interrupt(&self) {
        let Ok(mut machine) = self.lock() else {
            return;
        };
        let events = machine.handle_interrupt();
        self.settle(&machine);
        drop(machine);
        self.deliver(events);
    }

    fn transmit_queued(&self) {
        let Ok(mut machine) = self.lock() else {
            return;
        };
        if !self.running.load(Ordering::Acquire) {
            log::debug!("Session stopping, not starting transmission");
            return;
        }
        let frame = match self.slot.lock() {
            Ok(mut slot) => slot.queued.take(),
            Err(_) => None,
        };
        let Some(frame) = frame else {
            return;
        };
        let events = machine.transmit(frame);
        self.settle(&machine);
        drop(machine);
        self.deliver(events);
    }
}

/// A running radio: setup done, reception armed, threads started.
pub struct Session<T: Transport + Send + 'static> {
    shared: Arc<Shared<T>>,
    work: Option<Sender<Work>>,
    worker: Option<JoinHandle<()>>,
    irq_threads: Vec<JoinHandle<()>>,
    idle_timeout: Duration,
}

impl<T: Transport + Send + 'static> Session<T> {
    /// Validate `config`, bring the chip up and start listening.
    ///
    /// # Arguments
    ///
    /// * `transport` - Bus and pins of the chip
    /// * `config` - Human-unit configuration
    ///
    /// # Returns
    ///
    /// * `Ok((Session, Receiver))` - The session and its event stream
    /// * `Err(Sx1280Error)` - Invalid configuration or a failed setup step
    pub fn start(transport: T, config: &RadioConfig) -> Result<(Self, Receiver<RadioEvent>)> {
        Self::start_validated(transport, config.validate()?)
    }

    /// Same as [`start`](Self::start) with an already validated configuration.
    pub fn start_validated(
        mut transport: T,
        config: ValidatedConfig,
    ) -> Result<(Self, Receiver<RadioEvent>)> {
        let ValidatedConfig {
            chip,
            profiles,
            host,
        } = config;

        // Subscribe before reset so edges raised during it are drained, not serviced.
        let mut edges = Vec::with_capacity(host.dio_lines.len());
        for &line in &host.dio_lines {
            edges.push(transport.subscribe_edge(Line::Dio(line), Edge::Rising)?);
        }

        let mut machine = RadioStateMachine::new(transport, host.guard, chip, profiles);
        machine.setup(&host)?;
        for stream in &edges {
            while stream.try_recv().is_ok() {}
        }

        let (event_tx, event_rx) = mpsc::channel();
        let slot = TxSlot {
            queued: None,
            busy: false,
            limits: machine.frame_limits(),
            mode: machine.mode(),
        };
        let shared = Arc::new(Shared {
            machine: Mutex::new(machine),
            idle: Condvar::new(),
            slot: Mutex::new(slot),
            events: event_tx,
            running: AtomicBool::new(true),
            irq_enabled: AtomicBool::new(false),
        });

        shared.irq_enabled.store(true, Ordering::Release);
        {
            let mut machine = shared.lock()?;
            machine.arm_receive()?;
        }

        let (work_tx, work_rx) = mpsc::channel();
        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("sx1280-worker".into())
                .spawn(move || worker_loop(shared, work_rx))
                .map_err(|e| {
                    log::error!("Could not spawn worker: {e}");
                    Sx1280Error::SessionClosed
                })?
        };

        let mut irq_threads = Vec::with_capacity(edges.len());
        for (line, stream) in host.dio_lines.iter().copied().zip(edges) {
            let irq_shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("sx1280-dio{line}"))
                .spawn(move || irq_loop(irq_shared, stream));
            match spawned {
                Ok(handle) => irq_threads.push(handle),
                Err(e) => {
                    log::error!("Could not spawn DIO{line} thread: {e}");
                    shared.running.store(false, Ordering::Release);
                    return Err(Sx1280Error::SessionClosed);
                }
            }
        }

        log::info!("Session started, listening on DIO lines {:?}", host.dio_lines);
        Ok((
            Session {
                shared,
                work: Some(work_tx),
                worker: Some(worker),
                irq_threads,
                idle_timeout: host.idle_timeout,
            },
            event_rx,
        ))
    }

    /// Queue a frame for transmission and return immediately.
    ///
    /// Completion is reported as `TransmitDone` or `TransmitDropped` on the event
    /// stream. Only one frame may be pending at a time.
    ///
    /// # Errors
    ///
    /// * `Busy` - A frame is still pending
    /// * `FrameTooSmall` / `FrameTooLarge` - Length outside the active mode's range
    /// * `UnsupportedInMode` - The chip is in Ranging mode
    pub fn submit(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        let frame = OutboundFrame::new(data.into());
        let work = self.work.as_ref().ok_or(Sx1280Error::SessionClosed)?;
        {
            let mut slot = self
                .shared
                .slot
                .lock()
                .map_err(|_| Sx1280Error::SessionClosed)?;
            if slot.busy {
                return Err(Sx1280Error::Busy);
            }
            if slot.mode == RadioMode::Ranging {
                return Err(Sx1280Error::UnsupportedInMode {
                    operation: "submit",
                    mode: slot.mode,
                });
            }
            check_frame_len(frame.len(), &slot.limits)?;
            slot.busy = true;
            slot.queued = Some(frame);
        }
        if work.send(Work::Transmit).is_err() {
            if let Ok(mut slot) = self.shared.slot.lock() {
                slot.queued = None;
                slot.busy = false;
            }
            return Err(Sx1280Error::SessionClosed);
        }
        Ok(())
    }

    /// Change one field, waiting for any transmission in progress to finish first.
    pub fn configure(&self, setting: Setting) -> Result<()> {
        let mut machine = self.wait_idle()?;
        let result = machine.apply_setting(&setting);
        self.shared.settle(&machine);
        result
    }

    /// Switch packet type, waiting for any transmission in progress to finish first.
    pub fn set_mode(&self, mode: RadioMode) -> Result<()> {
        let mut machine = self.wait_idle()?;
        let result = machine.set_mode(mode);
        self.shared.settle(&machine);
        result
    }

    fn wait_idle(&self) -> Result<MutexGuard<'_, RadioStateMachine<T>>> {
        if self.work.is_none() {
            return Err(Sx1280Error::SessionClosed);
        }
        let machine = self.shared.lock()?;
        let (machine, wait) = self
            .shared
            .idle
            .wait_timeout_while(machine, self.idle_timeout, |m| {
                m.state() == RadioState::Transmitting
            })
            .map_err(|_| Sx1280Error::SessionClosed)?;
        if wait.timed_out() {
            log::warn!("Radio still transmitting after {:?}", self.idle_timeout);
            return Err(Sx1280Error::IdleTimeout {
                waited_ms: self.idle_timeout.as_millis() as u64,
            });
        }
        Ok(machine)
    }

    /// Snapshot of the shadow configuration.
    pub fn status(&self) -> Result<ChipConfig> {
        Ok(self.shared.lock()?.chip().clone())
    }

    /// Snapshot of every mode's stored parameters.
    pub fn profiles(&self) -> Result<ModeProfiles> {
        Ok(self.shared.lock()?.profiles().clone())
    }

    pub fn stats(&self) -> Result<LinkStats> {
        Ok(self.shared.lock()?.stats())
    }

    pub fn state(&self) -> Result<RadioState> {
        Ok(self.shared.lock()?.state())
    }

    /// Instantaneous RSSI in dBm.
    pub fn rssi_inst(&self) -> Result<i16> {
        self.shared.lock()?.rssi_inst()
    }

    /// Packet type read back from the chip.
    pub fn packet_type(&self) -> Result<RadioMode> {
        self.shared.lock()?.packet_type()
    }

    /// Stop all threads and put the chip to sleep. Also runs on drop.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(work) = self.work.take() else {
            return Ok(());
        };
        self.shared.irq_enabled.store(false, Ordering::Release);
        self.shared.running.store(false, Ordering::Release);

        // Cancel a frame the worker has not picked up yet.
        let mut events = Vec::new();
        if let Ok(mut slot) = self.shared.slot.lock() {
            if let Some(frame) = slot.queued.take() {
                log::debug!("Cancelling queued frame of {} bytes", frame.len());
                events.push(RadioEvent::TransmitDropped {
                    len: frame.len(),
                    reason: DropReason::Shutdown,
                });
            }
            slot.busy = false;
        }

        if work.send(Work::Shutdown).is_err() {
            log::debug!("Worker already gone");
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
        for handle in self.irq_threads.drain(..) {
            if handle.join().is_err() {
                log::error!("Interrupt thread panicked");
            }
        }

        let mut machine = self.shared.lock()?;
        events.extend(machine.shutdown());
        drop(machine);
        self.shared.idle.notify_all();
        self.shared.deliver(events);
        log::info!("Session shut down");
        Ok(())
    }
}

impl<T: Transport + Send + 'static> Drop for Session<T> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("Session teardown failed: {e}");
        }
    }
}

fn worker_loop<T: Transport>(shared: Arc<Shared<T>>, work: Receiver<Work>) {
    for item in work {
        match item {
            Work::Transmit if shared.running.load(Ordering::Acquire) => shared.transmit_queued(),
            Work::Transmit => {}
            Work::Shutdown => break,
        }
    }
    log::debug!("Worker stopped");
}

fn irq_loop<T: Transport>(shared: Arc<Shared<T>>, edges: EdgeEvents) {
    while shared.running.load(Ordering::Acquire) {
        match edges.recv_timeout(IRQ_POLL_INTERVAL) {
            Ok(edge) => {
                if !shared.irq_enabled.load(Ordering::Acquire) {
                    log::debug!("Gate closed, ignoring edge on {}", edge.line);
                    continue;
                }
                log::trace!("Edge on {}", edge.line);
                shared.service_interrupt();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_start_arms_receive() {
        let (transport, handle) = MockTransport::new();
        let (session, _events) = Session::start(transport, &RadioConfig::default()).unwrap();
        assert_eq!(session.state().unwrap(), RadioState::Receiving);
        assert_eq!(handle.subscribers(1), 1);
        assert_eq!(handle.subscribers(3), 1);
        assert_eq!(handle.circuit_mode(), crate::constants::CIRCUIT_MODE_RX);
    }

    #[test]
    fn test_submit_rejects_while_pending() {
        let (transport, handle) = MockTransport::new();
        let (session, events) = Session::start(transport, &RadioConfig::default()).unwrap();
        session.submit(vec![1, 2, 3]).unwrap();
        assert!(matches!(session.submit(vec![4]), Err(Sx1280Error::Busy)));
        assert!(handle.wait_for_opcode(crate::constants::OP_SET_TX, WAIT));
        handle.complete_tx();
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            RadioEvent::TransmitDone { len: 3 }
        );
    }

    #[test]
    fn test_teardown_cancels_queued_frame() {
        let (transport, handle) = MockTransport::new();
        let (session, events) = Session::start(transport, &RadioConfig::default()).unwrap();
        let shared = Arc::clone(&session.shared);
        handle.take_commands();

        // Keep the worker off the radio until teardown has claimed the slot.
        let machine = shared.lock().unwrap();
        session.submit(vec![1, 2, 3]).unwrap();
        let teardown = thread::spawn(move || drop(session));
        let deadline = std::time::Instant::now() + WAIT;
        while shared.slot.lock().unwrap().queued.is_some() {
            assert!(std::time::Instant::now() < deadline, "teardown never took the slot");
            thread::sleep(Duration::from_millis(1));
        }
        drop(machine);
        teardown.join().unwrap();

        let opcodes = handle.opcodes();
        assert!(!opcodes.contains(&crate::constants::OP_SET_TX), "{opcodes:02X?}");
        assert!(!opcodes.contains(&crate::constants::OP_WRITE_BUFFER));
        assert!(handle.is_asleep());
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            RadioEvent::TransmitDropped { len: 3, reason: DropReason::Shutdown }
        );
    }

    #[test]
    fn test_shutdown_puts_chip_to_sleep() {
        let (transport, handle) = MockTransport::new();
        let (session, _events) = Session::start(transport, &RadioConfig::default()).unwrap();
        session.shutdown().unwrap();
        assert!(handle.is_asleep());
    }
}
