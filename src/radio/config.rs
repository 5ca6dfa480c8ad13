//! # Radio Configuration
//!
//! Two layers live here:
//!
//! - [`RadioConfig`] is the structured, human-unit configuration a host hands in.
//!   It derives serde so a binary can load it from JSON, but the driver itself
//!   never parses files.
//! - [`ChipConfig`] is the shadow of what was last written to the chip, in encoded
//!   form. [`ModeProfiles`] keeps the parameter blocks of every packet type, so
//!   switching modes restores the settings that belong to the new one.
//!
//! [`Setting`] names one mutable field for `Session::configure`. It is applied to a
//! profile with [`ModeProfile::apply`], which reports which command block changed.

use crate::constants::{
    REG_BLE_ACCESS_ADDRESS, REG_CRC_POLYNOMIAL, REG_CRC_SEED, REG_CRC_SEED_BLE, REG_SYNC_ADDRESS_1,
    REG_SYNC_ADDRESS_2, REG_SYNC_ADDRESS_3,
};
use crate::error::{Result, Sx1280Error};
use crate::radio::command::Command;
use crate::radio::guard::{BusyGuard, BusyPolicy};
use crate::radio::irq::DioMapping;
use crate::radio::params::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ----------------------------------------------------------------------------
// Human-unit configuration
// ----------------------------------------------------------------------------

/// Top-level configuration, in the units a person would write down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub mode: RadioMode,
    pub rf_freq_hz: u32,
    pub tx_timeout_us: u32,
    pub startup_timeout_us: u32,
    pub power_dbm: i8,
    pub ramp_time_us: u32,
    pub gfsk: GfskConfig,
    pub flrc: FlrcConfig,
    pub lora: LoraConfig,
    pub ranging: LoraConfig,
    pub ble: BleConfig,
    pub host: HostConfig,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            mode: RadioMode::Lora,
            rf_freq_hz: 2_400_000_000,
            tx_timeout_us: 1000,
            startup_timeout_us: 2000,
            power_dbm: 13,
            ramp_time_us: 2,
            gfsk: GfskConfig::default(),
            flrc: FlrcConfig::default(),
            lora: LoraConfig::default(),
            ranging: LoraConfig::default(),
            ble: BleConfig::default(),
            host: HostConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GfskConfig {
    pub bitrate_kbps: u16,
    pub bandwidth_khz: u16,
    /// Hundredths, e.g. 200 for an index of 2.0.
    pub modulation_index: u16,
    pub bt: String,
    pub preamble_bits: u32,
    pub sync_word_bytes: u8,
    pub sync_word_match: [bool; 3],
    pub fixed_length: bool,
    pub max_payload_bytes: u8,
    pub crc_bytes: u8,
    pub disable_whitening: bool,
    pub crc_seed: Option<u16>,
    pub crc_polynomial: Option<u16>,
    pub sync_words: [Option<u64>; 3],
}

impl Default for GfskConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: 2000,
            bandwidth_khz: 2400,
            modulation_index: 200,
            bt: "1.0".into(),
            preamble_bits: 8,
            sync_word_bytes: 2,
            sync_word_match: [false; 3],
            fixed_length: false,
            max_payload_bytes: 255,
            crc_bytes: 2,
            disable_whitening: false,
            crc_seed: None,
            crc_polynomial: None,
            sync_words: [None; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlrcConfig {
    pub bitrate_kbps: u16,
    pub bandwidth_khz: u16,
    pub coding_rate: String,
    pub bt: String,
    pub preamble_bits: u32,
    pub sync_word_bits: u8,
    pub sync_word_match: [bool; 3],
    pub fixed_length: bool,
    pub max_payload_bytes: u8,
    pub crc_bytes: u8,
    pub disable_whitening: bool,
    pub crc_seed: Option<u16>,
    pub sync_words: [Option<u32>; 3],
}

impl Default for FlrcConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: 1300,
            bandwidth_khz: 1200,
            coding_rate: "3/4".into(),
            bt: "1.0".into(),
            preamble_bits: 8,
            sync_word_bits: 32,
            sync_word_match: [false; 3],
            fixed_length: false,
            max_payload_bytes: 127,
            crc_bytes: 2,
            disable_whitening: false,
            crc_seed: None,
            sync_words: [None; 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoraConfig {
    pub spreading_factor: u8,
    pub bandwidth_khz: u16,
    pub coding_rate: String,
    pub long_interleaving: bool,
    pub preamble_bits: u32,
    pub implicit_header: bool,
    pub max_payload_bytes: u8,
    pub disable_crc: bool,
    pub invert_iq: bool,
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self {
            spreading_factor: 12,
            bandwidth_khz: 1600,
            coding_rate: "4/8".into(),
            long_interleaving: false,
            preamble_bits: 8,
            implicit_header: false,
            max_payload_bytes: 255,
            disable_crc: false,
            invert_iq: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    pub max_payload_bytes: u16,
    pub crc_bytes: u8,
    pub test_payload: String,
    pub disable_whitening: bool,
    pub crc_seed: Option<u32>,
    pub access_address: Option<u32>,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 37,
            crc_bytes: 3,
            test_payload: "prbs9".into(),
            disable_whitening: false,
            crc_seed: None,
            access_address: None,
        }
    }
}

/// Host-side timing and wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub busy_timeout_us: u32,
    pub busy_spin_us: u32,
    pub busy_sleep_us: u32,
    pub busy_policy: BusyPolicy,
    pub idle_timeout_ms: u64,
    pub dio_lines: Vec<u8>,
    pub reset_line: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            busy_timeout_us: 100_000,
            busy_spin_us: 50,
            busy_sleep_us: 100,
            busy_policy: BusyPolicy::Before,
            idle_timeout_ms: 5000,
            dio_lines: vec![1, 2, 3],
            reset_line: true,
        }
    }
}

/// Validated host settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSettings {
    pub guard: BusyGuard,
    pub startup_timeout: Duration,
    pub idle_timeout: Duration,
    pub dio_lines: Vec<u8>,
    pub dio_mapping: DioMapping,
    pub reset_line: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        let host = HostConfig::default();
        Self {
            guard: BusyGuard::default(),
            startup_timeout: Duration::from_micros(2000),
            idle_timeout: Duration::from_millis(host.idle_timeout_ms),
            dio_mapping: DioMapping::for_lines(&host.dio_lines),
            dio_lines: host.dio_lines,
            reset_line: host.reset_line,
        }
    }
}

/// Output of [`RadioConfig::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub chip: ChipConfig,
    pub profiles: ModeProfiles,
    pub host: HostSettings,
}

impl RadioConfig {
    /// Encode every field, failing on the first illegal one.
    pub fn validate(&self) -> Result<ValidatedConfig> {
        let profiles = ModeProfiles {
            gfsk: self.gfsk.to_profile()?,
            flrc: self.flrc.to_profile()?,
            lora: self.lora.to_profile(RadioMode::Lora)?,
            ranging: self.ranging.to_profile(RadioMode::Ranging)?,
            ble: self.ble.to_profile()?,
        };
        let active = profiles.get(self.mode).clone();
        let chip = ChipConfig {
            mode: self.mode,
            modulation: active.modulation,
            packet: active.packet,
            rf_frequency: RfFrequency::from_hz(self.rf_freq_hz)?,
            power: Power::from_dbm(self.power_dbm)?,
            ramp_time: RampTime::from_us(self.ramp_time_us)?,
            registers: active.registers,
            tx_timeout: Timeout::from_us(self.tx_timeout_us)?,
        };
        Ok(ValidatedConfig {
            chip,
            profiles,
            host: self.host.validate(self.startup_timeout_us)?,
        })
    }
}

impl HostConfig {
    fn validate(&self, startup_timeout_us: u32) -> Result<HostSettings> {
        if self.dio_lines.is_empty() || self.dio_lines.iter().any(|n| !(1..=3).contains(n)) {
            return Err(Sx1280Error::invalid(
                "host.dio_lines",
                format!("{:?} must name at least one of DIO1..DIO3", self.dio_lines),
            ));
        }
        if self.busy_timeout_us == 0 {
            return Err(Sx1280Error::invalid("host.busy_timeout_us", "must be non-zero"));
        }
        Ok(HostSettings {
            guard: BusyGuard {
                policy: self.busy_policy,
                timeout: Duration::from_micros(u64::from(self.busy_timeout_us)),
                spin: Duration::from_micros(u64::from(self.busy_spin_us)),
                sleep_step_us: self.busy_sleep_us.max(1),
            },
            startup_timeout: Duration::from_micros(u64::from(startup_timeout_us)),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            dio_lines: self.dio_lines.clone(),
            dio_mapping: DioMapping::for_lines(&self.dio_lines),
            reset_line: self.reset_line,
        })
    }
}

impl GfskConfig {
    fn to_profile(&self) -> Result<ModeProfile> {
        let modulation = GfskModulation {
            bitrate: GfskBitrate::from_kbps(self.bitrate_kbps, self.bandwidth_khz)?,
            modulation_index: ModulationIndex::from_hundredths(self.modulation_index)?,
            bandwidth_time: self.bt.parse()?,
        };
        let packet = GfskPacket {
            preamble: LinearPreamble::from_bits(self.preamble_bits)?,
            sync_word_len: GfskSyncWordLength::from_bytes(self.sync_word_bytes)?,
            sync_word_match: SyncWordMatch::from_selection(self.sync_word_match),
            header: if self.fixed_length {
                HeaderType::Fixed
            } else {
                HeaderType::Variable
            },
            payload_length: self.max_payload_bytes,
            crc: GfskCrc::from_bytes(self.crc_bytes)?,
            whitening: Whitening::from_disabled(self.disable_whitening),
        };
        let mut registers = RegisterSettings {
            crc_seed: self.crc_seed.map(u32::from),
            crc_polynomial: self.crc_polynomial,
            ..RegisterSettings::default()
        };
        for (i, word) in self.sync_words.iter().enumerate() {
            if let Some(word) = word {
                registers.set_sync_word(RadioMode::Gfsk, i as u8 + 1, *word)?;
            }
        }
        ModeProfile::new(
            ModulationParams::Gfsk(modulation),
            PacketParams::Gfsk(packet),
            registers,
        )
    }
}

impl FlrcConfig {
    fn to_profile(&self) -> Result<ModeProfile> {
        let modulation = FlrcModulation {
            bitrate: FlrcBitrate::from_kbps(self.bitrate_kbps, self.bandwidth_khz)?,
            coding_rate: self.coding_rate.parse()?,
            bandwidth_time: self.bt.parse()?,
        };
        let packet = FlrcPacket {
            preamble: LinearPreamble::from_bits(self.preamble_bits)?,
            sync_word_len: FlrcSyncWordLength::from_bits(self.sync_word_bits)?,
            sync_word_match: SyncWordMatch::from_selection(self.sync_word_match),
            header: if self.fixed_length {
                HeaderType::Fixed
            } else {
                HeaderType::Variable
            },
            payload_length: self.max_payload_bytes,
            crc: FlrcCrc::from_bytes(self.crc_bytes)?,
            whitening: Whitening::from_disabled(self.disable_whitening),
        };
        let mut registers = RegisterSettings {
            crc_seed: self.crc_seed.map(u32::from),
            ..RegisterSettings::default()
        };
        for (i, word) in self.sync_words.iter().enumerate() {
            if let Some(word) = word {
                registers.set_sync_word(RadioMode::Flrc, i as u8 + 1, u64::from(*word))?;
            }
        }
        ModeProfile::new(
            ModulationParams::Flrc(modulation),
            PacketParams::Flrc(packet),
            registers,
        )
    }
}

impl LoraConfig {
    fn to_profile(&self, mode: RadioMode) -> Result<ModeProfile> {
        let modulation = LoraModulation {
            spreading_factor: SpreadingFactor::new(self.spreading_factor)?,
            bandwidth: LoraBandwidth::from_khz(self.bandwidth_khz)?,
            coding_rate: LoraCodingRate::from_fraction(&self.coding_rate, self.long_interleaving)?,
        };
        let packet = LoraPacket {
            preamble: LoraPreamble::from_bits(self.preamble_bits)?,
            header: if self.implicit_header {
                LoraHeader::Implicit
            } else {
                LoraHeader::Explicit
            },
            payload_length: self.max_payload_bytes,
            crc: !self.disable_crc,
            iq: if self.invert_iq {
                LoraIq::Inverted
            } else {
                LoraIq::Standard
            },
        };
        let (modulation, packet) = match mode {
            RadioMode::Ranging => (
                ModulationParams::Ranging(modulation),
                PacketParams::Ranging(packet),
            ),
            _ => (ModulationParams::Lora(modulation), PacketParams::Lora(packet)),
        };
        ModeProfile::new(modulation, packet, RegisterSettings::default())
    }
}

impl BleConfig {
    fn to_profile(&self) -> Result<ModeProfile> {
        let packet = BlePacket {
            connection_state: BleConnectionState::from_max_payload(self.max_payload_bytes)?,
            crc: BleCrc::from_bytes(self.crc_bytes)?,
            test_payload: self.test_payload.parse()?,
            whitening: Whitening::from_disabled(self.disable_whitening),
        };
        let mut registers = RegisterSettings::default();
        if let Some(seed) = self.crc_seed {
            registers.set_crc_seed(RadioMode::Ble, seed)?;
        }
        registers.access_address = self.access_address;
        ModeProfile::new(
            ModulationParams::Ble(BleModulation),
            PacketParams::Ble(packet),
            registers,
        )
    }
}

// ----------------------------------------------------------------------------
// Encoded configuration
// ----------------------------------------------------------------------------

/// Settings written through WriteRegister rather than a command.
///
/// `None` leaves the chip's reset value in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterSettings {
    pub crc_seed: Option<u32>,
    pub crc_polynomial: Option<u16>,
    pub sync_words: [Option<u64>; 3],
    pub access_address: Option<u32>,
}

impl RegisterSettings {
    pub fn set_crc_seed(&mut self, mode: RadioMode, seed: u32) -> Result<()> {
        let max = match mode {
            RadioMode::Gfsk | RadioMode::Flrc => 0xFFFF,
            RadioMode::Ble => 0x00FF_FFFF,
            _ => {
                return Err(Sx1280Error::UnsupportedInMode {
                    operation: "CRC seed",
                    mode,
                })
            }
        };
        if seed > max {
            return Err(Sx1280Error::invalid(
                "crc_seed",
                format!("0x{seed:X} exceeds 0x{max:X} for {mode}"),
            ));
        }
        self.crc_seed = Some(seed);
        Ok(())
    }

    pub fn set_crc_polynomial(&mut self, mode: RadioMode, polynomial: u16) -> Result<()> {
        if mode != RadioMode::Gfsk {
            return Err(Sx1280Error::UnsupportedInMode {
                operation: "CRC polynomial",
                mode,
            });
        }
        self.crc_polynomial = Some(polynomial);
        Ok(())
    }

    pub fn set_sync_word(&mut self, mode: RadioMode, index: u8, value: u64) -> Result<()> {
        let max = match mode {
            RadioMode::Gfsk => 0xFF_FFFF_FFFF,
            RadioMode::Flrc => 0xFFFF_FFFF,
            _ => {
                return Err(Sx1280Error::UnsupportedInMode {
                    operation: "sync word",
                    mode,
                })
            }
        };
        if !(1..=3).contains(&index) {
            return Err(Sx1280Error::invalid(
                "sync_word_index",
                format!("{index} is not 1, 2 or 3"),
            ));
        }
        if value > max {
            return Err(Sx1280Error::invalid(
                "sync_word",
                format!("0x{value:X} is wider than {mode} allows"),
            ));
        }
        self.sync_words[usize::from(index - 1)] = Some(value);
        Ok(())
    }

    pub fn set_access_address(&mut self, mode: RadioMode, address: u32) -> Result<()> {
        if mode != RadioMode::Ble {
            return Err(Sx1280Error::UnsupportedInMode {
                operation: "access address",
                mode,
            });
        }
        self.access_address = Some(address);
        Ok(())
    }

    /// WriteRegister commands that put these settings on the chip for `mode`.
    pub fn commands(&self, mode: RadioMode) -> Vec<Command> {
        let mut out = Vec::new();
        match mode {
            RadioMode::Gfsk | RadioMode::Flrc => {
                if let Some(poly) = self.crc_polynomial.filter(|_| mode == RadioMode::Gfsk) {
                    out.push(Command::WriteRegister {
                        address: REG_CRC_POLYNOMIAL,
                        data: poly.to_be_bytes().to_vec(),
                    });
                }
                if let Some(seed) = self.crc_seed {
                    out.push(Command::WriteRegister {
                        address: REG_CRC_SEED,
                        data: (seed as u16).to_be_bytes().to_vec(),
                    });
                }
                let bases = [REG_SYNC_ADDRESS_1, REG_SYNC_ADDRESS_2, REG_SYNC_ADDRESS_3];
                for (word, base) in self.sync_words.iter().zip(bases) {
                    let Some(word) = word else { continue };
                    let bytes = word.to_be_bytes();
                    let cmd = if mode == RadioMode::Gfsk {
                        Command::WriteRegister {
                            address: base,
                            data: bytes[3..8].to_vec(),
                        }
                    } else {
                        Command::WriteRegister {
                            address: base + 1,
                            data: bytes[4..8].to_vec(),
                        }
                    };
                    out.push(cmd);
                }
            }
            RadioMode::Ble => {
                if let Some(seed) = self.crc_seed {
                    out.push(Command::WriteRegister {
                        address: REG_CRC_SEED_BLE,
                        data: seed.to_be_bytes()[1..4].to_vec(),
                    });
                }
                if let Some(address) = self.access_address {
                    out.push(Command::WriteRegister {
                        address: REG_BLE_ACCESS_ADDRESS,
                        data: address.to_be_bytes().to_vec(),
                    });
                }
            }
            RadioMode::Lora | RadioMode::Ranging => {}
        }
        out
    }
}

/// Parameter blocks belonging to one packet type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeProfile {
    pub modulation: ModulationParams,
    /// Packet block as armed for reception; its payload length is the receive maximum.
    pub packet: PacketParams,
    pub registers: RegisterSettings,
}

/// Which part of the chip a setting touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Modulation,
    Packet,
    Registers,
}

impl ModeProfile {
    pub fn new(
        modulation: ModulationParams,
        packet: PacketParams,
        registers: RegisterSettings,
    ) -> Result<Self> {
        validate_pair(&modulation, &packet)?;
        Ok(Self {
            modulation,
            packet,
            registers,
        })
    }

    pub fn mode(&self) -> RadioMode {
        self.modulation.mode()
    }

    /// Copy of this profile with `setting` applied, and the block it changed.
    pub fn apply(&self, setting: &Setting) -> Result<(ModeProfile, Block)> {
        let mode = self.mode();
        let mut next = self.clone();
        let block = match (setting, &mut next.modulation, &mut next.packet) {
            (Setting::Gfsk(s), ModulationParams::Gfsk(m), PacketParams::Gfsk(p)) => s.apply(m, p)?,
            (Setting::Flrc(s), ModulationParams::Flrc(m), PacketParams::Flrc(p)) => s.apply(m, p)?,
            (Setting::Lora(s), ModulationParams::Lora(m), PacketParams::Lora(p))
            | (Setting::Ranging(s), ModulationParams::Ranging(m), PacketParams::Ranging(p)) => {
                s.apply(m, p)?
            }
            (Setting::Ble(s), ModulationParams::Ble(_), PacketParams::Ble(p)) => s.apply(p)?,
            (Setting::CrcSeed(seed), _, _) => {
                next.registers.set_crc_seed(mode, *seed)?;
                Block::Registers
            }
            (Setting::CrcPolynomial(poly), _, _) => {
                next.registers.set_crc_polynomial(mode, *poly)?;
                Block::Registers
            }
            (Setting::SyncWord { index, value }, _, _) => {
                next.registers.set_sync_word(mode, *index, *value)?;
                Block::Registers
            }
            (Setting::BleAccessAddress(address), _, _) => {
                next.registers.set_access_address(mode, *address)?;
                Block::Registers
            }
            _ => {
                return Err(Sx1280Error::invalid(
                    "setting",
                    format!("{setting:?} does not belong to the {mode} profile"),
                ))
            }
        };
        validate_pair(&next.modulation, &next.packet)?;
        Ok((next, block))
    }
}

/// Profiles for every packet type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeProfiles {
    pub gfsk: ModeProfile,
    pub flrc: ModeProfile,
    pub lora: ModeProfile,
    pub ranging: ModeProfile,
    pub ble: ModeProfile,
}

impl ModeProfiles {
    pub fn get(&self, mode: RadioMode) -> &ModeProfile {
        match mode {
            RadioMode::Gfsk => &self.gfsk,
            RadioMode::Flrc => &self.flrc,
            RadioMode::Lora => &self.lora,
            RadioMode::Ranging => &self.ranging,
            RadioMode::Ble => &self.ble,
        }
    }

    pub fn get_mut(&mut self, mode: RadioMode) -> &mut ModeProfile {
        match mode {
            RadioMode::Gfsk => &mut self.gfsk,
            RadioMode::Flrc => &mut self.flrc,
            RadioMode::Lora => &mut self.lora,
            RadioMode::Ranging => &mut self.ranging,
            RadioMode::Ble => &mut self.ble,
        }
    }
}

impl Default for ModeProfiles {
    fn default() -> Self {
        let plain = |modulation, packet| ModeProfile {
            modulation,
            packet,
            registers: RegisterSettings::default(),
        };
        Self {
            gfsk: plain(
                ModulationParams::Gfsk(GfskModulation::default()),
                PacketParams::Gfsk(GfskPacket::default()),
            ),
            flrc: plain(
                ModulationParams::Flrc(FlrcModulation::default()),
                PacketParams::Flrc(FlrcPacket::default()),
            ),
            lora: plain(
                ModulationParams::Lora(LoraModulation::default()),
                PacketParams::Lora(LoraPacket::default()),
            ),
            ranging: plain(
                ModulationParams::Ranging(LoraModulation::default()),
                PacketParams::Ranging(LoraPacket::default()),
            ),
            ble: plain(
                ModulationParams::Ble(BleModulation),
                PacketParams::Ble(BlePacket::default()),
            ),
        }
    }
}

/// Shadow of the chip's volatile configuration.
///
/// Every field mirrors the last successful write, so a single-field change can
/// resend the rest of its command block unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ChipConfig {
    pub mode: RadioMode,
    pub modulation: ModulationParams,
    pub packet: PacketParams,
    pub rf_frequency: RfFrequency,
    pub power: Power,
    pub ramp_time: RampTime,
    pub registers: RegisterSettings,
    /// Host-side: used for every SetTx, never written on its own.
    pub tx_timeout: Timeout,
}

impl Default for ChipConfig {
    fn default() -> Self {
        let profiles = ModeProfiles::default();
        Self {
            mode: RadioMode::Lora,
            modulation: profiles.lora.modulation,
            packet: profiles.lora.packet,
            rf_frequency: RfFrequency::default(),
            power: Power::default(),
            ramp_time: RampTime::Us2,
            registers: RegisterSettings::default(),
            tx_timeout: Timeout::default(),
        }
    }
}

impl ChipConfig {
    pub fn frame_limits(&self) -> std::ops::RangeInclusive<usize> {
        self.packet.frame_limits(&self.modulation)
    }

    /// Every command needed to bring a chip in standby to this configuration.
    pub fn setup_commands(&self) -> Vec<Command> {
        let mut out = vec![
            Command::SetPacketType(self.mode),
            Command::SetRfFrequency(self.rf_frequency),
            Command::SetBufferBaseAddress {
                tx: crate::constants::TX_BASE_ADDRESS,
                rx: crate::constants::RX_BASE_ADDRESS,
            },
            Command::SetModulationParams(self.modulation.encode()),
            Command::SetPacketParams(self.packet.encode()),
            Command::SetTxParams {
                power: self.power.code(),
                ramp: self.ramp_time.code(),
            },
        ];
        out.extend(self.registers.commands(self.mode));
        out
    }
}

// ----------------------------------------------------------------------------
// Field-level settings
// ----------------------------------------------------------------------------

/// One mutable field, in human units.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    RfFrequencyHz(u32),
    PowerDbm(i8),
    RampTimeUs(u32),
    TxTimeoutUs(u32),
    /// Applies to the active mode.
    CrcSeed(u32),
    /// GFSK only.
    CrcPolynomial(u16),
    /// Sync word 1..=3 (GFSK, FLRC).
    SyncWord { index: u8, value: u64 },
    BleAccessAddress(u32),
    Gfsk(GfskSetting),
    Flrc(FlrcSetting),
    Lora(LoraSetting),
    Ranging(LoraSetting),
    Ble(BleSetting),
}

impl Setting {
    /// Mode whose profile the setting targets, `None` for mode-independent ones.
    pub fn target_mode(&self, active: RadioMode) -> Option<RadioMode> {
        match self {
            Setting::RfFrequencyHz(_)
            | Setting::PowerDbm(_)
            | Setting::RampTimeUs(_)
            | Setting::TxTimeoutUs(_) => None,
            Setting::CrcSeed(_)
            | Setting::CrcPolynomial(_)
            | Setting::SyncWord { .. }
            | Setting::BleAccessAddress(_) => Some(active),
            Setting::Gfsk(_) => Some(RadioMode::Gfsk),
            Setting::Flrc(_) => Some(RadioMode::Flrc),
            Setting::Lora(_) => Some(RadioMode::Lora),
            Setting::Ranging(_) => Some(RadioMode::Ranging),
            Setting::Ble(_) => Some(RadioMode::Ble),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GfskSetting {
    Bitrate { kbps: u16, bandwidth_khz: u16 },
    ModulationIndex(u16),
    BandwidthTime(BandwidthTime),
    PreambleBits(u32),
    SyncWordBytes(u8),
    SyncWordMatch([bool; 3]),
    FixedLength(bool),
    MaxPayloadBytes(u8),
    CrcBytes(u8),
    Whitening(bool),
}

impl GfskSetting {
    fn apply(&self, m: &mut GfskModulation, p: &mut GfskPacket) -> Result<Block> {
        match *self {
            GfskSetting::Bitrate { kbps, bandwidth_khz } => {
                m.bitrate = GfskBitrate::from_kbps(kbps, bandwidth_khz)?;
                return Ok(Block::Modulation);
            }
            GfskSetting::ModulationIndex(v) => {
                m.modulation_index = ModulationIndex::from_hundredths(v)?;
                return Ok(Block::Modulation);
            }
            GfskSetting::BandwidthTime(bt) => {
                m.bandwidth_time = bt;
                return Ok(Block::Modulation);
            }
            GfskSetting::PreambleBits(bits) => p.preamble = LinearPreamble::from_bits(bits)?,
            GfskSetting::SyncWordBytes(n) => p.sync_word_len = GfskSyncWordLength::from_bytes(n)?,
            GfskSetting::SyncWordMatch(sel) => p.sync_word_match = SyncWordMatch::from_selection(sel),
            GfskSetting::FixedLength(fixed) => {
                p.header = if fixed { HeaderType::Fixed } else { HeaderType::Variable }
            }
            GfskSetting::MaxPayloadBytes(n) => p.payload_length = n,
            GfskSetting::CrcBytes(n) => p.crc = GfskCrc::from_bytes(n)?,
            GfskSetting::Whitening(on) => p.whitening = Whitening::from_disabled(!on),
        }
        Ok(Block::Packet)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlrcSetting {
    Bitrate { kbps: u16, bandwidth_khz: u16 },
    CodingRate(FlrcCodingRate),
    BandwidthTime(BandwidthTime),
    PreambleBits(u32),
    SyncWordBits(u8),
    SyncWordMatch([bool; 3]),
    FixedLength(bool),
    MaxPayloadBytes(u8),
    CrcBytes(u8),
    Whitening(bool),
}

impl FlrcSetting {
    fn apply(&self, m: &mut FlrcModulation, p: &mut FlrcPacket) -> Result<Block> {
        match *self {
            FlrcSetting::Bitrate { kbps, bandwidth_khz } => {
                m.bitrate = FlrcBitrate::from_kbps(kbps, bandwidth_khz)?;
                return Ok(Block::Modulation);
            }
            FlrcSetting::CodingRate(cr) => {
                m.coding_rate = cr;
                return Ok(Block::Modulation);
            }
            FlrcSetting::BandwidthTime(bt) => {
                m.bandwidth_time = bt;
                return Ok(Block::Modulation);
            }
            FlrcSetting::PreambleBits(bits) => p.preamble = LinearPreamble::from_bits(bits)?,
            FlrcSetting::SyncWordBits(n) => p.sync_word_len = FlrcSyncWordLength::from_bits(n)?,
            FlrcSetting::SyncWordMatch(sel) => p.sync_word_match = SyncWordMatch::from_selection(sel),
            FlrcSetting::FixedLength(fixed) => {
                p.header = if fixed { HeaderType::Fixed } else { HeaderType::Variable }
            }
            FlrcSetting::MaxPayloadBytes(n) => p.payload_length = n,
            FlrcSetting::CrcBytes(n) => p.crc = FlrcCrc::from_bytes(n)?,
            FlrcSetting::Whitening(on) => p.whitening = Whitening::from_disabled(!on),
        }
        Ok(Block::Packet)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoraSetting {
    SpreadingFactor(u8),
    BandwidthKhz(u16),
    CodingRate(LoraCodingRate),
    PreambleBits(u32),
    ImplicitHeader(bool),
    MaxPayloadBytes(u8),
    Crc(bool),
    InvertIq(bool),
}

impl LoraSetting {
    fn apply(&self, m: &mut LoraModulation, p: &mut LoraPacket) -> Result<Block> {
        match *self {
            LoraSetting::SpreadingFactor(sf) => {
                m.spreading_factor = SpreadingFactor::new(sf)?;
                return Ok(Block::Modulation);
            }
            LoraSetting::BandwidthKhz(khz) => {
                m.bandwidth = LoraBandwidth::from_khz(khz)?;
                return Ok(Block::Modulation);
            }
            LoraSetting::CodingRate(cr) => {
                m.coding_rate = cr;
                return Ok(Block::Modulation);
            }
            LoraSetting::PreambleBits(bits) => p.preamble = LoraPreamble::from_bits(bits)?,
            LoraSetting::ImplicitHeader(implicit) => {
                p.header = if implicit {
                    LoraHeader::Implicit
                } else {
                    LoraHeader::Explicit
                }
            }
            LoraSetting::MaxPayloadBytes(n) => p.payload_length = n,
            LoraSetting::Crc(on) => p.crc = on,
            LoraSetting::InvertIq(inverted) => {
                p.iq = if inverted { LoraIq::Inverted } else { LoraIq::Standard }
            }
        }
        Ok(Block::Packet)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BleSetting {
    MaxPayloadBytes(u16),
    CrcBytes(u8),
    TestPayload(BleTestPayload),
    Whitening(bool),
}

impl BleSetting {
    fn apply(&self, p: &mut BlePacket) -> Result<Block> {
        match *self {
            BleSetting::MaxPayloadBytes(n) => {
                p.connection_state = BleConnectionState::from_max_payload(n)?
            }
            BleSetting::CrcBytes(n) => p.crc = BleCrc::from_bytes(n)?,
            BleSetting::TestPayload(t) => p.test_payload = t,
            BleSetting::Whitening(on) => p.whitening = Whitening::from_disabled(!on),
        }
        Ok(Block::Packet)
    }
}
