//! # Parameter Model
//!
//! Typed, validated forms of everything the chip is configured with. Each mode's
//! modulation block encodes to the 3 bytes of SetModulationParams, and each packet
//! block encodes to the 7 bytes of SetPacketParams. Constructors take human units
//! and reject anything outside the chip's legal set. Decoders take the encoded bytes
//! back to the typed form, for status reporting.

use crate::error::{Result, Sx1280Error};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub mod ble;
pub mod flrc;
pub mod gfsk;
pub mod lora;
pub mod units;

pub use ble::{BleConnectionState, BleCrc, BleModulation, BlePacket, BleTestPayload};
pub use flrc::{FlrcBitrate, FlrcCodingRate, FlrcCrc, FlrcModulation, FlrcPacket, FlrcSyncWordLength};
pub use gfsk::{GfskBitrate, GfskCrc, GfskModulation, GfskPacket, GfskSyncWordLength, ModulationIndex};
pub use lora::{
    LoraBandwidth, LoraCodingRate, LoraHeader, LoraIq, LoraModulation, LoraPacket, LoraPreamble,
    SpreadingFactor,
};
pub use units::{hz_to_pll, pll_to_hz, PeriodBase, Power, RampTime, RfFrequency, Timeout};

/// Packet type selected with SetPacketType.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadioMode {
    Gfsk,
    #[default]
    Lora,
    Ranging,
    Flrc,
    Ble,
}

impl RadioMode {
    pub const ALL: [RadioMode; 5] = [
        RadioMode::Gfsk,
        RadioMode::Lora,
        RadioMode::Ranging,
        RadioMode::Flrc,
        RadioMode::Ble,
    ];

    /// Packet type code carried by SetPacketType/GetPacketType.
    pub fn packet_type(self) -> u8 {
        match self {
            RadioMode::Gfsk => 0x00,
            RadioMode::Lora => 0x01,
            RadioMode::Ranging => 0x02,
            RadioMode::Flrc => 0x03,
            RadioMode::Ble => 0x04,
        }
    }

    pub fn from_packet_type(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.packet_type() == code)
    }

    /// LoRa and Ranging report RSSI/SNR, the others report rssi/errors/status/sync.
    pub fn is_lora_family(self) -> bool {
        matches!(self, RadioMode::Lora | RadioMode::Ranging)
    }
}

impl fmt::Display for RadioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadioMode::Gfsk => "GFSK",
            RadioMode::Lora => "LoRa",
            RadioMode::Ranging => "Ranging",
            RadioMode::Flrc => "FLRC",
            RadioMode::Ble => "BLE",
        };
        f.write_str(name)
    }
}

impl FromStr for RadioMode {
    type Err = Sx1280Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gfsk" => Ok(RadioMode::Gfsk),
            "lora" => Ok(RadioMode::Lora),
            "ranging" => Ok(RadioMode::Ranging),
            "flrc" => Ok(RadioMode::Flrc),
            "ble" => Ok(RadioMode::Ble),
            other => Err(Sx1280Error::invalid("mode", format!("unknown mode '{other}'"))),
        }
    }
}

/// Gaussian filter bandwidth-time product (GFSK, FLRC, BLE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthTime {
    Off,
    Bt1_0,
    Bt0_5,
}

impl BandwidthTime {
    pub fn code(self) -> u8 {
        match self {
            BandwidthTime::Off => 0x00,
            BandwidthTime::Bt1_0 => 0x10,
            BandwidthTime::Bt0_5 => 0x20,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(BandwidthTime::Off),
            0x10 => Ok(BandwidthTime::Bt1_0),
            0x20 => Ok(BandwidthTime::Bt0_5),
            _ => Err(Sx1280Error::invalid("bt", format!("unknown code 0x{code:02X}"))),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BandwidthTime::Off => "off",
            BandwidthTime::Bt1_0 => "1.0",
            BandwidthTime::Bt0_5 => "0.5",
        }
    }
}

impl FromStr for BandwidthTime {
    type Err = Sx1280Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(BandwidthTime::Off),
            "1.0" => Ok(BandwidthTime::Bt1_0),
            "0.5" => Ok(BandwidthTime::Bt0_5),
            _ => Err(Sx1280Error::invalid("bt", format!("'{s}' is not one of off, 1.0, 0.5"))),
        }
    }
}

/// Linear preamble code used by GFSK, FLRC and BLE: `((bits-4)/4) << 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearPreamble(u8);

impl LinearPreamble {
    pub fn from_bits(bits: u32) -> Result<Self> {
        if !(4..=32).contains(&bits) || bits % 4 != 0 {
            return Err(Sx1280Error::invalid(
                "preamble_bits",
                format!("{bits} is not a multiple of 4 in 4..=32"),
            ));
        }
        Ok(Self((((bits - 4) / 4) << 4) as u8))
    }

    pub fn from_code(code: u8) -> Result<Self> {
        if code & 0x0F != 0 || code > 0x70 {
            return Err(Sx1280Error::invalid(
                "preamble",
                format!("unknown code 0x{code:02X}"),
            ));
        }
        Ok(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn bits(self) -> u32 {
        u32::from(self.0 >> 4) * 4 + 4
    }
}

impl Default for LinearPreamble {
    fn default() -> Self {
        // 8 bits
        Self(0x10)
    }
}

bitflags! {
    /// Which of the three sync-word registers a received frame may match.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SyncWordMatch: u8 {
        const SYNC_WORD_1 = 0x10;
        const SYNC_WORD_2 = 0x20;
        const SYNC_WORD_3 = 0x40;
    }
}

impl SyncWordMatch {
    pub fn from_selection(selected: [bool; 3]) -> Self {
        let mut out = SyncWordMatch::empty();
        out.set(SyncWordMatch::SYNC_WORD_1, selected[0]);
        out.set(SyncWordMatch::SYNC_WORD_2, selected[1]);
        out.set(SyncWordMatch::SYNC_WORD_3, selected[2]);
        out
    }

    pub fn selection(self) -> [bool; 3] {
        [
            self.contains(SyncWordMatch::SYNC_WORD_1),
            self.contains(SyncWordMatch::SYNC_WORD_2),
            self.contains(SyncWordMatch::SYNC_WORD_3),
        ]
    }

    pub fn from_code(code: u8) -> Result<Self> {
        SyncWordMatch::from_bits(code)
            .ok_or_else(|| Sx1280Error::invalid("sync_word_match", format!("unknown code 0x{code:02X}")))
    }
}

/// Fixed or variable length framing (GFSK, FLRC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderType {
    Fixed,
    #[default]
    Variable,
}

impl HeaderType {
    pub fn code(self) -> u8 {
        match self {
            HeaderType::Fixed => 0x00,
            HeaderType::Variable => 0x20,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(HeaderType::Fixed),
            0x20 => Ok(HeaderType::Variable),
            _ => Err(Sx1280Error::invalid("header_type", format!("unknown code 0x{code:02X}"))),
        }
    }
}

/// Data whitening switch (GFSK, FLRC, BLE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Whitening {
    #[default]
    Enabled,
    Disabled,
}

impl Whitening {
    pub fn code(self) -> u8 {
        match self {
            Whitening::Enabled => 0x00,
            Whitening::Disabled => 0x08,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(Whitening::Enabled),
            0x08 => Ok(Whitening::Disabled),
            _ => Err(Sx1280Error::invalid("whitening", format!("unknown code 0x{code:02X}"))),
        }
    }

    pub fn from_disabled(disabled: bool) -> Self {
        if disabled {
            Whitening::Disabled
        } else {
            Whitening::Enabled
        }
    }
}

/// SetModulationParams payload, one variant per packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationParams {
    Gfsk(GfskModulation),
    Lora(LoraModulation),
    Ranging(LoraModulation),
    Flrc(FlrcModulation),
    Ble(BleModulation),
}

impl ModulationParams {
    pub fn mode(&self) -> RadioMode {
        match self {
            ModulationParams::Gfsk(_) => RadioMode::Gfsk,
            ModulationParams::Lora(_) => RadioMode::Lora,
            ModulationParams::Ranging(_) => RadioMode::Ranging,
            ModulationParams::Flrc(_) => RadioMode::Flrc,
            ModulationParams::Ble(_) => RadioMode::Ble,
        }
    }

    pub fn encode(&self) -> [u8; 3] {
        match self {
            ModulationParams::Gfsk(p) => p.encode(),
            ModulationParams::Lora(p) | ModulationParams::Ranging(p) => p.encode(),
            ModulationParams::Flrc(p) => p.encode(),
            ModulationParams::Ble(p) => p.encode(),
        }
    }

    pub fn decode(mode: RadioMode, bytes: [u8; 3]) -> Result<Self> {
        Ok(match mode {
            RadioMode::Gfsk => ModulationParams::Gfsk(GfskModulation::decode(bytes)?),
            RadioMode::Lora => ModulationParams::Lora(LoraModulation::decode(bytes)?),
            RadioMode::Ranging => ModulationParams::Ranging(LoraModulation::decode(bytes)?),
            RadioMode::Flrc => ModulationParams::Flrc(FlrcModulation::decode(bytes)?),
            RadioMode::Ble => ModulationParams::Ble(BleModulation::decode(bytes)?),
        })
    }
}

/// SetPacketParams payload, one variant per packet type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketParams {
    Gfsk(GfskPacket),
    Lora(LoraPacket),
    Ranging(LoraPacket),
    Flrc(FlrcPacket),
    Ble(BlePacket),
}

impl PacketParams {
    pub fn mode(&self) -> RadioMode {
        match self {
            PacketParams::Gfsk(_) => RadioMode::Gfsk,
            PacketParams::Lora(_) => RadioMode::Lora,
            PacketParams::Ranging(_) => RadioMode::Ranging,
            PacketParams::Flrc(_) => RadioMode::Flrc,
            PacketParams::Ble(_) => RadioMode::Ble,
        }
    }

    pub fn encode(&self) -> [u8; 7] {
        match self {
            PacketParams::Gfsk(p) => p.encode(),
            PacketParams::Lora(p) | PacketParams::Ranging(p) => p.encode(),
            PacketParams::Flrc(p) => p.encode(),
            PacketParams::Ble(p) => p.encode(),
        }
    }

    pub fn decode(mode: RadioMode, bytes: [u8; 7]) -> Result<Self> {
        Ok(match mode {
            RadioMode::Gfsk => PacketParams::Gfsk(GfskPacket::decode(bytes)?),
            RadioMode::Lora => PacketParams::Lora(LoraPacket::decode(bytes)?),
            RadioMode::Ranging => PacketParams::Ranging(LoraPacket::decode(bytes)?),
            RadioMode::Flrc => PacketParams::Flrc(FlrcPacket::decode(bytes)?),
            RadioMode::Ble => PacketParams::Ble(BlePacket::decode(bytes)?),
        })
    }

    /// Payload length field, absent for BLE.
    pub fn payload_length(&self) -> Option<u8> {
        match self {
            PacketParams::Gfsk(p) => Some(p.payload_length),
            PacketParams::Lora(p) | PacketParams::Ranging(p) => Some(p.payload_length),
            PacketParams::Flrc(p) => Some(p.payload_length),
            PacketParams::Ble(_) => None,
        }
    }

    /// Same block with the payload length field replaced. BLE has no such field.
    pub fn with_payload_length(&self, len: u8) -> Self {
        let mut out = *self;
        match &mut out {
            PacketParams::Gfsk(p) => p.payload_length = len,
            PacketParams::Lora(p) | PacketParams::Ranging(p) => p.payload_length = len,
            PacketParams::Flrc(p) => p.payload_length = len,
            PacketParams::Ble(_) => {}
        }
        out
    }

    /// Frame sizes the mode can carry.
    pub fn frame_limits(&self, modulation: &ModulationParams) -> RangeInclusive<usize> {
        match (self, modulation) {
            (PacketParams::Gfsk(_), _) => gfsk::PAYLOAD_MIN..=gfsk::PAYLOAD_MAX,
            (PacketParams::Flrc(_), _) => flrc::PAYLOAD_MIN..=flrc::PAYLOAD_MAX,
            (PacketParams::Lora(_), ModulationParams::Lora(m))
            | (PacketParams::Ranging(_), ModulationParams::Ranging(m)) => {
                lora::PAYLOAD_MIN..=m.coding_rate.max_payload()
            }
            (PacketParams::Lora(_), _) | (PacketParams::Ranging(_), _) => {
                lora::PAYLOAD_MIN..=lora::PAYLOAD_MAX
            }
            (PacketParams::Ble(p), _) => 0..=p.connection_state.max_payload(),
        }
    }
}

/// Check a modulation/packet pair for cross-field limits and a matching mode.
pub fn validate_pair(modulation: &ModulationParams, packet: &PacketParams) -> Result<()> {
    if modulation.mode() != packet.mode() {
        return Err(Sx1280Error::invalid(
            "mode",
            format!(
                "modulation is {} but packet params are {}",
                modulation.mode(),
                packet.mode()
            ),
        ));
    }
    let limits = packet.frame_limits(modulation);
    if let Some(len) = packet.payload_length() {
        let len = usize::from(len);
        if !limits.contains(&len) {
            return Err(Sx1280Error::invalid(
                "payload_length",
                format!(
                    "{len} is outside {}..={} for {}",
                    limits.start(),
                    limits.end(),
                    packet.mode()
                ),
            ));
        }
    }
    Ok(())
}

/// Check a frame length against the active mode's limits.
pub fn check_frame_len(len: usize, limits: &RangeInclusive<usize>) -> Result<()> {
    if len < *limits.start() {
        return Err(Sx1280Error::FrameTooSmall {
            len,
            min: *limits.start(),
        });
    }
    if len > *limits.end() {
        return Err(Sx1280Error::FrameTooLarge {
            len,
            max: *limits.end(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_type_codes() {
        assert_eq!(RadioMode::Gfsk.packet_type(), 0x00);
        assert_eq!(RadioMode::Lora.packet_type(), 0x01);
        assert_eq!(RadioMode::Ranging.packet_type(), 0x02);
        assert_eq!(RadioMode::Flrc.packet_type(), 0x03);
        assert_eq!(RadioMode::Ble.packet_type(), 0x04);
        assert_eq!(RadioMode::from_packet_type(5), None);
    }

    #[test]
    fn test_linear_preamble() {
        assert_eq!(LinearPreamble::from_bits(4).unwrap().code(), 0x00);
        assert_eq!(LinearPreamble::from_bits(8).unwrap().code(), 0x10);
        assert_eq!(LinearPreamble::from_bits(32).unwrap().code(), 0x70);
        assert_eq!(LinearPreamble::from_code(0x30).unwrap().bits(), 16);
        assert!(LinearPreamble::from_bits(6).is_err());
        assert!(LinearPreamble::from_bits(36).is_err());
        assert!(LinearPreamble::from_bits(0).is_err());
    }

    #[test]
    fn test_sync_word_match_codes() {
        assert_eq!(SyncWordMatch::from_selection([true, false, false]).bits(), 0x10);
        assert_eq!(SyncWordMatch::from_selection([true, true, true]).bits(), 0x70);
        assert!(SyncWordMatch::from_code(0x80).is_err());
    }

    #[test]
    fn test_frame_limits_per_mode() {
        let gfsk = ModulationParams::Gfsk(GfskModulation::default());
        let limits = PacketParams::Gfsk(GfskPacket::default()).frame_limits(&gfsk);
        assert_eq!(limits, 0..=255);

        let flrc = ModulationParams::Flrc(FlrcModulation::default());
        let limits = PacketParams::Flrc(FlrcPacket::default()).frame_limits(&flrc);
        assert_eq!(limits, 6..=127);

        let lora = ModulationParams::Lora(LoraModulation::default());
        let limits = PacketParams::Lora(LoraPacket::default()).frame_limits(&lora);
        assert_eq!(limits, 1..=255);
    }

    #[test]
    fn test_check_frame_len() {
        assert!(matches!(
            check_frame_len(3, &(6..=127)),
            Err(Sx1280Error::FrameTooSmall { len: 3, min: 6 })
        ));
        assert!(matches!(
            check_frame_len(200, &(6..=127)),
            Err(Sx1280Error::FrameTooLarge { len: 200, max: 127 })
        ));
        assert!(check_frame_len(0, &(0..=255)).is_ok());
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let m = ModulationParams::Gfsk(GfskModulation::default());
        let p = PacketParams::Flrc(FlrcPacket::default());
        assert!(validate_pair(&m, &p).is_err());
    }
}
