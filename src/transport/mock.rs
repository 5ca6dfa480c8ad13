//! Simulated SX1280 behind the [`Transport`] trait.
//!
//! The model answers the command set well enough to drive the state machine: it
//! keeps a register file, the 256-byte data buffer, the IRQ register, the packet
//! type and the circuit mode reported in every status byte. Every exchange is
//! logged as the bytes the host wrote. A [`MockHandle`] kept by the test scripts
//! the chip side: finishing a transmission, delivering a frame, holding BUSY
//! high or failing a given opcode.

use super::{Edge, EdgeEvent, EdgeEvents, Line, Segment, Transport, TransportError};
use crate::constants::*;
use crate::radio::irq::IrqFlags;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct ChipModel {
    circuit_mode: u8,
    command_status: u8,
    reset_circuit_mode: u8,
    packet_type: u8,
    irq: IrqFlags,
    registers: HashMap<u16, u8>,
    buffer: [u8; BUFFER_SIZE],
    rx_length: u8,
    rx_start: u8,
    packet_status: [u8; 5],
    rssi_inst: u8,
    busy_stuck: bool,
    busy_polls: usize,
    in_reset: bool,
    resets: usize,
    asleep: bool,
    fail_opcodes: HashSet<u8>,
    log: Vec<Vec<u8>>,
    subscribers: HashMap<u8, Vec<Sender<EdgeEvent>>>,
}

impl ChipModel {
    fn new() -> Self {
        let mut registers = HashMap::new();
        registers.insert(REG_FIRMWARE_VERSION, 0xA9);
        registers.insert(REG_FIRMWARE_VERSION + 1, 0xB5);
        Self {
            circuit_mode: CIRCUIT_MODE_STDBY_RC,
            command_status: CMD_STATUS_SUCCESS,
            reset_circuit_mode: CIRCUIT_MODE_STDBY_RC,
            packet_type: 0x00,
            irq: IrqFlags::empty(),
            registers,
            buffer: [0; BUFFER_SIZE],
            rx_length: 0,
            rx_start: 0,
            packet_status: [0; 5],
            rssi_inst: 0,
            busy_stuck: false,
            busy_polls: 0,
            in_reset: false,
            resets: 0,
            asleep: false,
            fail_opcodes: HashSet::new(),
            log: Vec::new(),
            subscribers: HashMap::new(),
        }
    }

    fn status_byte(&self) -> u8 {
        (self.circuit_mode << 5) | (self.command_status << 2)
    }

    fn reset(&mut self) {
        self.circuit_mode = self.reset_circuit_mode;
        self.packet_type = 0x00;
        self.irq = IrqFlags::empty();
        self.asleep = false;
        self.resets += 1;
    }

    fn respond(&mut self, tx: &[u8]) -> Vec<u8> {
        let mut rx = vec![self.status_byte(); tx.len()];
        let Some(&opcode) = tx.first() else {
            return rx;
        };
        let put = |rx: &mut Vec<u8>, at: usize, bytes: &[u8]| {
            for (i, b) in bytes.iter().enumerate() {
                if let Some(slot) = rx.get_mut(at + i) {
                    *slot = *b;
                }
            }
        };
        let address = || u16::from_be_bytes([tx.get(1).copied().unwrap_or(0), tx.get(2).copied().unwrap_or(0)]);

        match opcode {
            OP_GET_PACKET_TYPE => put(&mut rx, 2, &[self.packet_type]),
            OP_GET_IRQ_STATUS => put(&mut rx, 2, &self.irq.bits().to_be_bytes()),
            OP_GET_RX_BUFFER_STATUS => put(&mut rx, 2, &[self.rx_length, self.rx_start]),
            OP_GET_PACKET_STATUS => put(&mut rx, 2, &self.packet_status.clone()),
            OP_GET_RSSI_INST => put(&mut rx, 2, &[self.rssi_inst]),
            OP_READ_REGISTER => {
                let base = address();
                for i in 4..tx.len() {
                    let reg = base.wrapping_add((i - 4) as u16);
                    rx[i] = self.registers.get(&reg).copied().unwrap_or(0);
                }
            }
            OP_WRITE_REGISTER => {
                let base = address();
                for (i, b) in tx.iter().skip(3).enumerate() {
                    self.registers.insert(base.wrapping_add(i as u16), *b);
                }
            }
            OP_READ_BUFFER => {
                let offset = usize::from(tx.get(1).copied().unwrap_or(0));
                for i in 3..tx.len() {
                    rx[i] = self.buffer[(offset + i - 3) % BUFFER_SIZE];
                }
            }
            OP_WRITE_BUFFER => {
                let offset = usize::from(tx.get(1).copied().unwrap_or(0));
                for (i, b) in tx.iter().skip(2).enumerate() {
                    self.buffer[(offset + i) % BUFFER_SIZE] = *b;
                }
            }
            OP_SET_STANDBY => {
                self.circuit_mode = if tx.get(1).copied().unwrap_or(0) == 0 {
                    CIRCUIT_MODE_STDBY_RC
                } else {
                    CIRCUIT_MODE_STDBY_XOSC
                };
            }
            OP_SET_FS => self.circuit_mode = CIRCUIT_MODE_FS,
            OP_SET_TX => self.circuit_mode = CIRCUIT_MODE_TX,
            OP_SET_RX => self.circuit_mode = CIRCUIT_MODE_RX,
            OP_SET_SLEEP => self.asleep = true,
            OP_SET_PACKET_TYPE => self.packet_type = tx.get(1).copied().unwrap_or(0),
            OP_CLEAR_IRQ_STATUS => {
                let mask = IrqFlags::from_bits_retain(address());
                self.irq.remove(mask);
            }
            _ => {}
        }
        rx
    }

    fn fire(&mut self, line: u8) {
        if let Some(subs) = self.subscribers.get_mut(&line) {
            let event = EdgeEvent {
                line: Line::Dio(line),
                at: Instant::now(),
            };
            subs.retain(|tx| tx.send(event).is_ok());
        }
    }
}

/// Transport side of the simulated chip.
#[derive(Debug)]
pub struct MockTransport {
    chip: Arc<Mutex<ChipModel>>,
}

/// Test side of the simulated chip.
#[derive(Debug, Clone)]
pub struct MockHandle {
    chip: Arc<Mutex<ChipModel>>,
}

impl MockTransport {
    pub fn new() -> (MockTransport, MockHandle) {
        let chip = Arc::new(Mutex::new(ChipModel::new()));
        (
            MockTransport { chip: chip.clone() },
            MockHandle { chip },
        )
    }

    fn chip(&self) -> Result<MutexGuard<'_, ChipModel>, TransportError> {
        self.chip
            .lock()
            .map_err(|_| TransportError::Spi("mock chip state poisoned".into()))
    }
}

impl Transport for MockTransport {
    fn exchange(
        &mut self,
        segments: &[Segment],
        _hold_chip_select: bool,
    ) -> Result<Vec<u8>, TransportError> {
        let mut chip = self.chip()?;
        let tx: Vec<u8> = segments.iter().flat_map(|s| s.padded_write()).collect();
        let opcode = tx.first().copied().unwrap_or(NOP);
        if chip.fail_opcodes.remove(&opcode) {
            return Err(TransportError::Spi(format!(
                "injected failure on opcode 0x{opcode:02X}"
            )));
        }
        chip.log
            .push(segments.iter().flat_map(|s| s.write.iter().copied()).collect());

        let rx = chip.respond(&tx);
        let mut out = Vec::new();
        let mut pos = 0;
        for segment in segments {
            out.extend_from_slice(&rx[pos..pos + segment.read_len]);
            pos += segment.clocked_len();
        }
        Ok(out)
    }

    fn gpio_read(&mut self, line: Line) -> Result<bool, TransportError> {
        let mut chip = self.chip()?;
        match line {
            Line::Busy => {
                chip.busy_polls += 1;
                Ok(chip.busy_stuck || chip.in_reset)
            }
            Line::Dio(_) => Ok(!chip.irq.is_empty()),
            Line::Reset => Ok(!chip.in_reset),
        }
    }

    fn gpio_write(&mut self, line: Line, level: bool) -> Result<(), TransportError> {
        let mut chip = self.chip()?;
        match line {
            Line::Reset => {
                if !level {
                    chip.in_reset = true;
                } else if chip.in_reset {
                    chip.in_reset = false;
                    chip.reset();
                }
                Ok(())
            }
            other => Err(TransportError::UnsupportedLine(other)),
        }
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn subscribe_edge(&mut self, line: Line, _edge: Edge) -> Result<EdgeEvents, TransportError> {
        let Line::Dio(n) = line else {
            return Err(TransportError::UnsupportedLine(line));
        };
        let (tx, rx) = mpsc::channel();
        self.chip()?.subscribers.entry(n).or_default().push(tx);
        Ok(rx)
    }
}

impl MockHandle {
    fn chip(&self) -> MutexGuard<'_, ChipModel> {
        // a panicking test thread is the only way to poison this
        self.chip.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every exchange so far, as the bytes the host wrote.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.chip().log.clone()
    }

    /// Drain the exchange log.
    pub fn take_commands(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.chip().log)
    }

    /// Logged exchanges starting with `opcode`.
    pub fn commands_with_opcode(&self, opcode: u8) -> Vec<Vec<u8>> {
        self.chip()
            .log
            .iter()
            .filter(|c| c.first() == Some(&opcode))
            .cloned()
            .collect()
    }

    /// First byte of every logged exchange.
    pub fn opcodes(&self) -> Vec<u8> {
        self.chip().log.iter().filter_map(|c| c.first().copied()).collect()
    }

    /// Poll the log until an exchange with `opcode` shows up.
    pub fn wait_for_opcode(&self, opcode: u8, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.chip().log.iter().any(|c| c.first() == Some(&opcode)) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    pub fn set_busy_stuck(&self, stuck: bool) {
        self.chip().busy_stuck = stuck;
    }

    pub fn busy_polls(&self) -> usize {
        self.chip().busy_polls
    }

    /// Circuit mode the chip comes out of reset in.
    pub fn set_reset_circuit_mode(&self, mode: u8) {
        self.chip().reset_circuit_mode = mode;
    }

    pub fn set_command_status(&self, status: u8) {
        self.chip().command_status = status;
    }

    /// Fail the next exchange whose opcode is `opcode`.
    pub fn fail_next(&self, opcode: u8) {
        self.chip().fail_opcodes.insert(opcode);
    }

    pub fn circuit_mode(&self) -> u8 {
        self.chip().circuit_mode
    }

    pub fn packet_type(&self) -> u8 {
        self.chip().packet_type
    }

    pub fn pending_irq(&self) -> IrqFlags {
        self.chip().irq
    }

    pub fn register(&self, address: u16) -> Option<u8> {
        self.chip().registers.get(&address).copied()
    }

    pub fn buffer(&self, offset: u8, len: usize) -> Vec<u8> {
        let chip = self.chip();
        (0..len)
            .map(|i| chip.buffer[(usize::from(offset) + i) % BUFFER_SIZE])
            .collect()
    }

    pub fn resets(&self) -> usize {
        self.chip().resets
    }

    pub fn is_asleep(&self) -> bool {
        self.chip().asleep
    }

    pub fn set_rssi_inst(&self, raw: u8) {
        self.chip().rssi_inst = raw;
    }

    pub fn set_packet_status(&self, status: [u8; 5]) {
        self.chip().packet_status = status;
    }

    /// Latch IRQ bits and raise an edge on `dio`.
    pub fn raise_irq(&self, flags: IrqFlags, dio: u8) {
        let mut chip = self.chip();
        chip.irq |= flags;
        chip.fire(dio);
    }

    /// Edge on `dio` without any IRQ bit set.
    pub fn spurious_edge(&self, dio: u8) {
        self.chip().fire(dio);
    }

    /// The transmission in progress finished.
    pub fn complete_tx(&self) {
        let mut chip = self.chip();
        chip.circuit_mode = CIRCUIT_MODE_STDBY_RC;
        chip.irq |= IrqFlags::TX_DONE;
        chip.fire(1);
    }

    /// The transmission in progress hit its timeout.
    pub fn timeout_tx(&self) {
        let mut chip = self.chip();
        chip.circuit_mode = CIRCUIT_MODE_STDBY_RC;
        chip.irq |= IrqFlags::RX_TX_TIMEOUT;
        chip.fire(2);
    }

    /// A frame arrived: fill the buffer at `offset` and raise RxDone plus `extra`.
    pub fn inject_rx(&self, offset: u8, data: &[u8], extra: IrqFlags) {
        let mut chip = self.chip();
        for (i, b) in data.iter().enumerate() {
            chip.buffer[(usize::from(offset) + i) % BUFFER_SIZE] = *b;
        }
        chip.rx_start = offset;
        chip.rx_length = data.len() as u8;
        chip.irq |= IrqFlags::RX_DONE | extra;
        chip.fire(1);
    }

    pub fn subscribers(&self, dio: u8) -> usize {
        self.chip().subscribers.get(&dio).map_or(0, Vec::len)
    }
}
