//! FLRC modulation and packet parameters.

use super::{BandwidthTime, HeaderType, LinearPreamble, SyncWordMatch, Whitening};
use crate::error::{Result, Sx1280Error};
use std::str::FromStr;

pub const PAYLOAD_MIN: usize = 6;
pub const PAYLOAD_MAX: usize = 127;

const BITRATE_TABLE: [(u16, u16, u8); 6] = [
    (1300, 1200, 0x45),
    (1000, 1200, 0x69),
    (650, 600, 0x86),
    (520, 600, 0xAA),
    (325, 300, 0xC7),
    (260, 300, 0xEB),
];

/// One entry of the FLRC bitrate/bandwidth table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlrcBitrate {
    kbps: u16,
    khz: u16,
    code: u8,
}

impl FlrcBitrate {
    pub fn from_kbps(kbps: u16, bandwidth_khz: u16) -> Result<Self> {
        BITRATE_TABLE
            .iter()
            .find(|(b, w, _)| *b == kbps && *w == bandwidth_khz)
            .map(|&(kbps, khz, code)| Self { kbps, khz, code })
            .ok_or_else(|| {
                Sx1280Error::invalid(
                    "flrc.bitrate",
                    format!("{kbps} kb/s at {bandwidth_khz} kHz is not a supported pair"),
                )
            })
    }

    pub fn from_code(code: u8) -> Result<Self> {
        BITRATE_TABLE
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|&(kbps, khz, code)| Self { kbps, khz, code })
            .ok_or_else(|| Sx1280Error::invalid("flrc.bitrate", format!("unknown code 0x{code:02X}")))
    }

    pub fn all() -> impl Iterator<Item = FlrcBitrate> {
        BITRATE_TABLE
            .iter()
            .map(|&(kbps, khz, code)| Self { kbps, khz, code })
    }

    pub fn kbps(self) -> u16 {
        self.kbps
    }

    pub fn bandwidth_khz(self) -> u16 {
        self.khz
    }

    pub fn code(self) -> u8 {
        self.code
    }
}

impl Default for FlrcBitrate {
    fn default() -> Self {
        Self {
            kbps: 1300,
            khz: 1200,
            code: 0x45,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlrcCodingRate {
    Cr1_2,
    #[default]
    Cr3_4,
    Cr1_1,
}

impl FlrcCodingRate {
    pub fn code(self) -> u8 {
        match self {
            FlrcCodingRate::Cr1_2 => 0x00,
            FlrcCodingRate::Cr3_4 => 0x02,
            FlrcCodingRate::Cr1_1 => 0x04,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(FlrcCodingRate::Cr1_2),
            0x02 => Ok(FlrcCodingRate::Cr3_4),
            0x04 => Ok(FlrcCodingRate::Cr1_1),
            _ => Err(Sx1280Error::invalid("flrc.coding_rate", format!("unknown code 0x{code:02X}"))),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlrcCodingRate::Cr1_2 => "1/2",
            FlrcCodingRate::Cr3_4 => "3/4",
            FlrcCodingRate::Cr1_1 => "1/1",
        }
    }
}

impl FromStr for FlrcCodingRate {
    type Err = Sx1280Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1/2" => Ok(FlrcCodingRate::Cr1_2),
            "3/4" => Ok(FlrcCodingRate::Cr3_4),
            "1/1" => Ok(FlrcCodingRate::Cr1_1),
            _ => Err(Sx1280Error::invalid(
                "flrc.coding_rate",
                format!("'{s}' is not one of 1/2, 3/4, 1/1"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlrcModulation {
    pub bitrate: FlrcBitrate,
    pub coding_rate: FlrcCodingRate,
    pub bandwidth_time: BandwidthTime,
}

impl FlrcModulation {
    pub fn encode(&self) -> [u8; 3] {
        [
            self.bitrate.code(),
            self.coding_rate.code(),
            self.bandwidth_time.code(),
        ]
    }

    pub fn decode(bytes: [u8; 3]) -> Result<Self> {
        Ok(Self {
            bitrate: FlrcBitrate::from_code(bytes[0])?,
            coding_rate: FlrcCodingRate::from_code(bytes[1])?,
            bandwidth_time: BandwidthTime::from_code(bytes[2])?,
        })
    }
}

impl Default for FlrcModulation {
    fn default() -> Self {
        Self {
            bitrate: FlrcBitrate::default(),
            coding_rate: FlrcCodingRate::Cr3_4,
            bandwidth_time: BandwidthTime::Bt1_0,
        }
    }
}

/// FLRC sync word: none or 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlrcSyncWordLength {
    NoSync,
    #[default]
    Bits32,
}

impl FlrcSyncWordLength {
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0 => Ok(FlrcSyncWordLength::NoSync),
            32 => Ok(FlrcSyncWordLength::Bits32),
            _ => Err(Sx1280Error::invalid(
                "flrc.sync_word_bits",
                format!("{bits} is not 0 or 32"),
            )),
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(FlrcSyncWordLength::NoSync),
            0x04 => Ok(FlrcSyncWordLength::Bits32),
            _ => Err(Sx1280Error::invalid("flrc.sync_word_len", format!("unknown code 0x{code:02X}"))),
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            FlrcSyncWordLength::NoSync => 0,
            FlrcSyncWordLength::Bits32 => 32,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FlrcSyncWordLength::NoSync => 0x00,
            FlrcSyncWordLength::Bits32 => 0x04,
        }
    }
}

/// CRC length: 0, 2, 3 or 4 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlrcCrc(u8);

impl FlrcCrc {
    pub fn from_bytes(n: u8) -> Result<Self> {
        match n {
            0 | 2 | 3 | 4 => Ok(Self(n)),
            _ => Err(Sx1280Error::invalid(
                "flrc.crc_bytes",
                format!("{n} is not 0, 2, 3 or 4"),
            )),
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(Self(0)),
            0x10 | 0x20 | 0x30 => Ok(Self((code >> 4) + 1)),
            _ => Err(Sx1280Error::invalid("flrc.crc", format!("unknown code 0x{code:02X}"))),
        }
    }

    pub fn bytes(self) -> u8 {
        self.0
    }

    pub fn code(self) -> u8 {
        match self.0 {
            0 => 0x00,
            n => (n - 1) << 4,
        }
    }
}

impl Default for FlrcCrc {
    fn default() -> Self {
        Self(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlrcPacket {
    pub preamble: LinearPreamble,
    pub sync_word_len: FlrcSyncWordLength,
    pub sync_word_match: SyncWordMatch,
    pub header: HeaderType,
    pub payload_length: u8,
    pub crc: FlrcCrc,
    pub whitening: Whitening,
}

impl FlrcPacket {
    pub fn encode(&self) -> [u8; 7] {
        [
            self.preamble.code(),
            self.sync_word_len.code(),
            self.sync_word_match.bits(),
            self.header.code(),
            self.payload_length,
            self.crc.code(),
            self.whitening.code(),
        ]
    }

    pub fn decode(bytes: [u8; 7]) -> Result<Self> {
        Ok(Self {
            preamble: LinearPreamble::from_code(bytes[0])?,
            sync_word_len: FlrcSyncWordLength::from_code(bytes[1])?,
            sync_word_match: SyncWordMatch::from_code(bytes[2])?,
            header: HeaderType::from_code(bytes[3])?,
            payload_length: bytes[4],
            crc: FlrcCrc::from_code(bytes[5])?,
            whitening: Whitening::from_code(bytes[6])?,
        })
    }
}

impl Default for FlrcPacket {
    fn default() -> Self {
        Self {
            preamble: LinearPreamble::default(),
            sync_word_len: FlrcSyncWordLength::Bits32,
            sync_word_match: SyncWordMatch::empty(),
            header: HeaderType::Variable,
            payload_length: PAYLOAD_MAX as u8,
            crc: FlrcCrc::default(),
            whitening: Whitening::Enabled,
        }
    }
}
