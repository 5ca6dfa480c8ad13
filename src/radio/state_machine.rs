//! # Radio State Machine
//!
//! Owns the transport, the shadow [`ChipConfig`] and the operational state of the
//! chip. Every method runs with the session's main lock held, so bus transactions
//! never interleave and the shadow always matches the last successful write.
//!
//! ## States
//!
//! ```text
//!            setup            submit
//! [reset] ─────────► Standby ─────────► Transmitting
//!                       │                   │
//!                       │ arm_receive       │ TxDone / RxTxTimeout
//!                       ▼                   ▼
//!                   Receiving ◄─────────────┘
//!                   │     ▲
//!                   └─────┘ RxDone (deliver, re-arm)
//! ```
//!
//! Interrupt handling never propagates errors: a failed read drops the frame in
//! flight, bumps a counter and re-arms reception. The outcome of every operation
//! is reported as a list of [`RadioEvent`]s for the session to deliver.

use crate::constants::*;
use crate::error::{Result, Sx1280Error};
use crate::logging::hex_string;
use crate::radio::command::{
    decode_irq_status, decode_packet_type, decode_rssi_inst, decode_rx_buffer_status, ChipStatus,
    CircuitMode, Command, PacketStatus, SleepConfig, StandbyMode,
};
use crate::radio::config::{Block, ChipConfig, HostSettings, ModeProfiles, Setting};
use crate::radio::guard::BusyGuard;
use crate::radio::irq::IrqFlags;
use crate::radio::params::{check_frame_len, Power, RadioMode, RampTime, RfFrequency, Timeout};
use crate::transport::{Line, Transport};
use std::ops::RangeInclusive;

/// Operational state of the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    /// Idle and configurable.
    Standby,
    /// One frame in flight.
    Transmitting,
    /// Listening continuously.
    Receiving,
}

/// A frame waiting for, or undergoing, transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    data: Vec<u8>,
}

impl OutboundFrame {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// A frame read out of the chip after RxDone.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub data: Vec<u8>,
    pub rssi_dbm: i16,
    /// LoRa and Ranging only.
    pub snr_db: Option<f32>,
    /// Matched sync word (1..=3), GFSK/FLRC/BLE only.
    pub sync_word_index: Option<u8>,
}

/// Why a submitted frame never made it on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The chip reported RxTxTimeout.
    Timeout,
    /// A bus transaction failed.
    Bus,
    /// The frame no longer fits the active mode.
    Rejected,
    /// The session was torn down.
    Shutdown,
}

/// Asynchronous outcome delivered to the session owner.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    Received(InboundFrame),
    TransmitDone { len: usize },
    TransmitDropped { len: usize, reason: DropReason },
}

/// Link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tx_errors: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub rx_crc_errors: u64,
    pub rx_header_errors: u64,
    pub rx_sync_errors: u64,
    pub bus_errors: u64,
    pub unhandled_irqs: u64,
}

impl LinkStats {
    fn count_rx_error(&mut self, crc: bool, header: bool, sync: bool) {
        self.rx_errors += 1;
        if crc {
            self.rx_crc_errors += 1;
        }
        if header {
            self.rx_header_errors += 1;
        }
        if sync {
            self.rx_sync_errors += 1;
        }
    }
}

pub struct RadioStateMachine<T: Transport> {
    transport: T,
    guard: BusyGuard,
    chip: ChipConfig,
    profiles: ModeProfiles,
    state: RadioState,
    stats: LinkStats,
    in_flight: Option<OutboundFrame>,
}

impl<T: Transport> RadioStateMachine<T> {
    pub fn new(transport: T, guard: BusyGuard, chip: ChipConfig, profiles: ModeProfiles) -> Self {
        Self {
            transport,
            guard,
            chip,
            profiles,
            state: RadioState::Standby,
            stats: LinkStats::default(),
            in_flight: None,
        }
    }

    pub fn state(&self) -> RadioState {
        self.state
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn chip(&self) -> &ChipConfig {
        &self.chip
    }

    pub fn profiles(&self) -> &ModeProfiles {
        &self.profiles
    }

    pub fn mode(&self) -> RadioMode {
        self.chip.mode
    }

    pub fn frame_limits(&self) -> RangeInclusive<usize> {
        self.chip.frame_limits()
    }

    fn run(&mut self, cmd: &Command) -> Result<Vec<u8>> {
        self.guard.run(&mut self.transport, cmd)
    }

    fn query(&mut self, cmd: &Command) -> Result<Vec<u8>> {
        let raw = self.run(cmd)?;
        Ok(cmd.strip_response(&raw)?.to_vec())
    }

    /// Run a status-returning command and fail on an error command status.
    ///
    /// Not used on the interrupt path, where a timeout status follows a TX timeout.
    fn run_checked(&mut self, cmd: &Command) -> Result<Vec<u8>> {
        let raw = self.run(cmd)?;
        if let Some(&first) = raw.first() {
            if let Err(e) = ChipStatus::from_byte(first).check() {
                log::error!("Opcode 0x{:02X} reported status 0x{first:02X}", cmd.opcode());
                return Err(e);
            }
        }
        Ok(raw)
    }

    fn standby(&mut self) -> Result<()> {
        self.run(&Command::SetStandby(StandbyMode::Rc))?;
        self.state = RadioState::Standby;
        Ok(())
    }

    /// Reset the chip and write the full configuration.
    ///
    /// Leaves the chip in Standby with every IRQ cleared. The caller opens its
    /// interrupt gate and then calls [`arm_receive`](Self::arm_receive).
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to session start: `BusTimeout` if BUSY never
    /// settles, `UnexpectedChipState` if the chip is not in STDBY_RC after reset.
    pub fn setup(&mut self, host: &HostSettings) -> Result<()> {
        if host.reset_line {
            self.transport.gpio_write(Line::Reset, false)?;
            self.transport.delay_us(100);
            self.transport.gpio_write(Line::Reset, true)?;
            self.transport.delay_us(1000);
        }
        self.guard.wait_ready(&mut self.transport, host.startup_timeout)?;

        let raw = self.run_checked(&Command::GetStatus)?;
        let status = ChipStatus::decode(&raw)?;
        if status.circuit_mode != CircuitMode::StandbyRc {
            log::error!("Chip not in STDBY_RC after reset: {:?}", status.circuit_mode);
            return Err(Sx1280Error::UnexpectedChipState {
                expected: "STDBY_RC after reset",
                status: status.raw,
            });
        }

        let firmware = self.query(&Command::ReadRegister {
            address: REG_FIRMWARE_VERSION,
            len: 2,
        })?;
        log::info!("SX1280 firmware version 0x{}", hex_string(&firmware));

        self.standby()?;
        for cmd in self.chip.setup_commands() {
            self.run(&cmd)?;
        }
        self.run(&Command::SetDioIrqParams(host.dio_mapping))?;
        self.run(&Command::ClearIrqStatus(IrqFlags::all()))?;

        log::info!(
            "Radio configured: {} at {} Hz, {} dBm",
            self.chip.mode,
            self.chip.rf_frequency.hz(),
            self.chip.power.dbm()
        );
        Ok(())
    }

    /// Enter continuous reception, restoring the maximum payload length first.
    pub fn arm_receive(&mut self) -> Result<()> {
        let packet = self.profiles.get(self.chip.mode).packet;
        if self.chip.packet != packet {
            self.run(&Command::SetPacketParams(packet.encode()))?;
            self.chip.packet = packet;
        }
        self.run(&Command::SetRx(Timeout::CONTINUOUS))?;
        self.state = RadioState::Receiving;
        Ok(())
    }

    /// Put `frame` on air. Failures are reported as a drop event, never returned.
    pub fn transmit(&mut self, frame: OutboundFrame) -> Vec<RadioEvent> {
        let len = frame.len();
        if let Err(e) = self.check_frame(&frame) {
            log::warn!("Dropping {len}-byte frame: {e}");
            self.stats.tx_errors += 1;
            return vec![RadioEvent::TransmitDropped {
                len,
                reason: DropReason::Rejected,
            }];
        }

        match self.begin_transmit(frame) {
            Ok(()) => Vec::new(),
            Err(e) => {
                log::error!("Transmit of {len} bytes failed: {e}");
                self.stats.bus_errors += 1;
                self.stats.tx_errors += 1;
                self.in_flight = None;
                self.rearm_after_error();
                vec![RadioEvent::TransmitDropped {
                    len,
                    reason: DropReason::Bus,
                }]
            }
        }
    }

    fn check_frame(&self, frame: &OutboundFrame) -> Result<()> {
        if self.chip.mode == RadioMode::Ranging {
            return Err(Sx1280Error::UnsupportedInMode {
                operation: "transmit",
                mode: self.chip.mode,
            });
        }
        if self.state == RadioState::Transmitting {
            return Err(Sx1280Error::Busy);
        }
        check_frame_len(frame.len(), &self.frame_limits())
    }

    fn begin_transmit(&mut self, frame: OutboundFrame) -> Result<()> {
        self.standby()?;
        self.run(&Command::WriteBuffer {
            offset: TX_BASE_ADDRESS,
            data: frame.as_bytes().to_vec(),
        })?;
        if self.chip.packet.payload_length().is_some() {
            let packet = self.chip.packet.with_payload_length(frame.len() as u8);
            self.run(&Command::SetPacketParams(packet.encode()))?;
            self.chip.packet = packet;
        }
        self.run(&Command::SetTx(self.chip.tx_timeout))?;
        log::debug!("Transmitting {} bytes", frame.len());
        self.state = RadioState::Transmitting;
        self.in_flight = Some(frame);
        Ok(())
    }

    /// Service one DIO edge.
    pub fn handle_interrupt(&mut self) -> Vec<RadioEvent> {
        let mut events = Vec::new();
        if let Err(e) = self.service_irq(&mut events) {
            log::error!("Interrupt handling failed: {e}");
            self.stats.bus_errors += 1;
            if let Some(frame) = self.in_flight.take() {
                self.stats.tx_errors += 1;
                events.push(RadioEvent::TransmitDropped {
                    len: frame.len(),
                    reason: DropReason::Bus,
                });
            }
            self.rearm_after_error();
        }
        events
    }

    fn service_irq(&mut self, events: &mut Vec<RadioEvent>) -> Result<()> {
        let raw = self.run(&Command::GetIrqStatus)?;
        let flags = decode_irq_status(&raw)?;
        if flags.is_empty() {
            log::debug!("Edge with no IRQ bits set");
            return Ok(());
        }
        self.run(&Command::ClearIrqStatus(flags))?;
        log::debug!("IRQ status 0x{:04X}", flags.bits());

        let unhandled = flags.unhandled();
        if !unhandled.is_empty() {
            log::warn!("Unhandled IRQ bits 0x{:04X}", unhandled.bits());
            self.stats.unhandled_irqs += 1;
        }

        let mut rearm = false;
        if flags.tx_done() {
            match self.in_flight.take() {
                Some(frame) => {
                    self.stats.tx_packets += 1;
                    self.stats.tx_bytes += frame.len() as u64;
                    log::debug!("TxDone, {} bytes sent", frame.len());
                    events.push(RadioEvent::TransmitDone { len: frame.len() });
                }
                None => log::warn!("TxDone with no frame in flight"),
            }
            rearm = true;
        } else if flags.timeout() {
            if let Some(frame) = self.in_flight.take() {
                log::warn!("Transmit timeout, dropping {} bytes", frame.len());
                self.stats.tx_errors += 1;
                events.push(RadioEvent::TransmitDropped {
                    len: frame.len(),
                    reason: DropReason::Timeout,
                });
            }
            rearm = true;
        }

        if flags.rx_done() {
            if let Some(frame) = self.receive(flags)? {
                events.push(RadioEvent::Received(frame));
            }
            rearm = true;
        } else if flags.intersects(IrqFlags::HEADER_ERROR | IrqFlags::SYNC_WORD_ERROR) {
            log::debug!("Reception aborted: {:?}", flags & IrqFlags::RX_ERRORS);
            self.stats.count_rx_error(
                false,
                flags.contains(IrqFlags::HEADER_ERROR),
                flags.contains(IrqFlags::SYNC_WORD_ERROR),
            );
        }

        if rearm {
            self.arm_receive()?;
        }
        Ok(())
    }

    fn receive(&mut self, flags: IrqFlags) -> Result<Option<InboundFrame>> {
        if flags.has_rx_error() {
            log::warn!("Discarding frame, IRQ errors {:?}", flags & IrqFlags::RX_ERRORS);
            self.stats.count_rx_error(
                flags.contains(IrqFlags::CRC_ERROR),
                flags.contains(IrqFlags::HEADER_ERROR),
                flags.contains(IrqFlags::SYNC_WORD_ERROR),
            );
            return Ok(None);
        }

        let raw = self.run(&Command::GetPacketStatus)?;
        let status = PacketStatus::decode(self.chip.mode, &raw)?;
        if let PacketStatus::Fsk { errors, .. } = status {
            if status.has_errors() {
                log::warn!("Discarding frame, packet status errors 0x{errors:02X}");
                self.stats.count_rx_error(
                    errors & PKT_ERR_CRC != 0,
                    false,
                    errors & PKT_ERR_SYNC != 0,
                );
                return Ok(None);
            }
        }

        let raw = self.run(&Command::GetRxBufferStatus)?;
        let buffer = decode_rx_buffer_status(&raw)?;
        let data = self.query(&Command::ReadBuffer {
            offset: buffer.start_offset,
            len: usize::from(buffer.payload_length),
        })?;

        self.stats.rx_packets += 1;
        self.stats.rx_bytes += data.len() as u64;
        log::debug!(
            "RxDone, {} bytes at offset {}, RSSI {} dBm",
            data.len(),
            buffer.start_offset,
            status.rssi_dbm()
        );
        crate::logging::log_frame("rx", &data);

        Ok(Some(InboundFrame {
            data,
            rssi_dbm: status.rssi_dbm(),
            snr_db: status.snr_db(),
            sync_word_index: status.sync_word_index(),
        }))
    }

    fn rearm_after_error(&mut self) {
        if let Err(e) = self.arm_receive() {
            log::error!("Could not re-arm reception: {e}");
            self.stats.bus_errors += 1;
            self.state = RadioState::Standby;
        }
    }

    /// Apply one field change. The radio must not be transmitting.
    ///
    /// Only the command block the field belongs to is resent, with its sibling
    /// fields taken from the shadow config. A setting for a mode other than the
    /// active one only updates that mode's profile.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` or `UnsupportedInMode` before anything is sent; a bus
    /// error if the write fails, in which case the shadow config is restored.
    pub fn apply_setting(&mut self, setting: &Setting) -> Result<()> {
        let active = self.chip.mode;
        if let Some(mode) = setting.target_mode(active).filter(|m| *m != active) {
            let (profile, _) = self.profiles.get(mode).apply(setting)?;
            *self.profiles.get_mut(mode) = profile;
            log::info!("Updated {mode} profile: {setting:?}");
            return Ok(());
        }

        let mut next = self.chip.clone();
        let mut next_profile = None;
        let commands = match setting {
            Setting::RfFrequencyHz(hz) => {
                next.rf_frequency = RfFrequency::from_hz(*hz)?;
                vec![Command::SetRfFrequency(next.rf_frequency)]
            }
            Setting::PowerDbm(dbm) => {
                next.power = Power::from_dbm(*dbm)?;
                vec![tx_params(&next)]
            }
            Setting::RampTimeUs(us) => {
                next.ramp_time = RampTime::from_us(*us)?;
                vec![tx_params(&next)]
            }
            Setting::TxTimeoutUs(us) => {
                next.tx_timeout = Timeout::from_us(*us)?;
                Vec::new()
            }
            _ => {
                let (profile, block) = self.profiles.get(active).apply(setting)?;
                let commands = match block {
                    Block::Modulation => {
                        next.modulation = profile.modulation;
                        vec![Command::SetModulationParams(profile.modulation.encode())]
                    }
                    Block::Packet => {
                        next.packet = profile.packet;
                        vec![Command::SetPacketParams(profile.packet.encode())]
                    }
                    Block::Registers => {
                        let before = self.chip.registers.commands(active);
                        next.registers = profile.registers;
                        profile
                            .registers
                            .commands(active)
                            .into_iter()
                            .filter(|cmd| !before.contains(cmd))
                            .collect()
                    }
                };
                next_profile = Some(profile);
                commands
            }
        };

        if commands.is_empty() {
            self.chip = next;
            if let Some(profile) = next_profile {
                *self.profiles.get_mut(active) = profile;
            }
            log::debug!("Applied {setting:?} without bus traffic");
            return Ok(());
        }

        self.standby()?;
        let previous = std::mem::replace(&mut self.chip, next);
        for cmd in &commands {
            if let Err(e) = self.run(cmd) {
                log::warn!("Configuration write failed, rolling back: {e}");
                self.chip = previous;
                self.rearm_after_error();
                return Err(e);
            }
        }
        if let Some(profile) = next_profile {
            *self.profiles.get_mut(active) = profile;
        }
        log::info!("Applied {setting:?}");
        self.arm_receive()
    }

    /// Switch packet type, restoring the new mode's profile. The radio must not be transmitting.
    pub fn set_mode(&mut self, mode: RadioMode) -> Result<()> {
        if mode == self.chip.mode {
            return Ok(());
        }
        let profile = self.profiles.get(mode).clone();
        let mut next = self.chip.clone();
        next.mode = mode;
        next.modulation = profile.modulation;
        next.packet = profile.packet;
        next.registers = profile.registers;

        let mut commands = vec![
            Command::SetPacketType(mode),
            Command::SetModulationParams(next.modulation.encode()),
            Command::SetPacketParams(next.packet.encode()),
        ];
        commands.extend(next.registers.commands(mode));

        self.standby()?;
        let previous = std::mem::replace(&mut self.chip, next);
        for cmd in &commands {
            if let Err(e) = self.run(cmd) {
                log::warn!("Mode change to {mode} failed, restoring {}: {e}", previous.mode);
                self.chip = previous;
                self.resync();
                return Err(e);
            }
        }
        log::info!("Mode changed {} -> {}", previous.mode, mode);
        self.arm_receive()
    }

    /// Best-effort rewrite of the whole shadow config after a failed mode change.
    fn resync(&mut self) {
        for cmd in self.chip.setup_commands() {
            if let Err(e) = self.run(&cmd) {
                log::error!("Resync failed at opcode 0x{:02X}: {e}", cmd.opcode());
                self.stats.bus_errors += 1;
                self.state = RadioState::Standby;
                return;
            }
        }
        self.rearm_after_error();
    }

    /// Instantaneous RSSI in dBm.
    pub fn rssi_inst(&mut self) -> Result<i16> {
        let raw = self.run_checked(&Command::GetRssiInst)?;
        decode_rssi_inst(&raw)
    }

    /// Packet type as the chip reports it.
    pub fn packet_type(&mut self) -> Result<RadioMode> {
        let raw = self.run_checked(&Command::GetPacketType)?;
        decode_packet_type(&raw)
    }

    /// Decoded status byte.
    pub fn chip_status(&mut self) -> Result<ChipStatus> {
        let raw = self.run_checked(&Command::GetStatus)?;
        ChipStatus::decode(&raw)
    }

    /// Drop any frame in flight and put the chip to sleep.
    pub fn shutdown(&mut self) -> Vec<RadioEvent> {
        let mut events = Vec::new();
        if let Some(frame) = self.in_flight.take() {
            log::warn!("Shutdown with {} bytes in flight", frame.len());
            events.push(RadioEvent::TransmitDropped {
                len: frame.len(),
                reason: DropReason::Shutdown,
            });
        }
        let sleep = [
            Command::SetStandby(StandbyMode::Rc),
            Command::SetSleep(SleepConfig::default()),
        ];
        for cmd in &sleep {
            if let Err(e) = self.run(cmd) {
                log::warn!("Shutdown command 0x{:02X} failed: {e}", cmd.opcode());
            }
        }
        self.state = RadioState::Standby;
        log::info!("Radio asleep");
        events
    }
}

fn tx_params(chip: &ChipConfig) -> Command {
    Command::SetTxParams {
        power: chip.power.code(),
        ramp: chip.ramp_time.code(),
    }
}
