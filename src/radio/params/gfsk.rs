//! GFSK modulation and packet parameters.

use super::{BandwidthTime, HeaderType, LinearPreamble, SyncWordMatch, Whitening};
use crate::error::{Result, Sx1280Error};

pub const PAYLOAD_MIN: usize = 0;
pub const PAYLOAD_MAX: usize = 255;

/// Legal (bitrate kb/s, bandwidth kHz) pairs and their code.
const BITRATE_TABLE: [(u16, u16, u8); 13] = [
    (2000, 2400, 0x04),
    (1600, 2400, 0x28),
    (1000, 2400, 0x4C),
    (1000, 1200, 0x45),
    (800, 2400, 0x70),
    (800, 1200, 0x69),
    (500, 1200, 0x8D),
    (500, 600, 0x86),
    (400, 1200, 0xB1),
    (400, 600, 0xAA),
    (250, 600, 0xCE),
    (250, 300, 0xC7),
    (125, 300, 0xEF),
];

/// One entry of the GFSK bitrate/bandwidth table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfskBitrate {
    kbps: u16,
    khz: u16,
    code: u8,
}

impl GfskBitrate {
    pub fn from_kbps(kbps: u16, bandwidth_khz: u16) -> Result<Self> {
        BITRATE_TABLE
            .iter()
            .find(|(b, w, _)| *b == kbps && *w == bandwidth_khz)
            .map(|&(kbps, khz, code)| Self { kbps, khz, code })
            .ok_or_else(|| {
                Sx1280Error::invalid(
                    "gfsk.bitrate",
                    format!("{kbps} kb/s at {bandwidth_khz} kHz is not a supported pair"),
                )
            })
    }

    pub fn from_code(code: u8) -> Result<Self> {
        BITRATE_TABLE
            .iter()
            .find(|(_, _, c)| *c == code)
            .map(|&(kbps, khz, code)| Self { kbps, khz, code })
            .ok_or_else(|| Sx1280Error::invalid("gfsk.bitrate", format!("unknown code 0x{code:02X}")))
    }

    /// All legal pairs, in table order.
    pub fn all() -> impl Iterator<Item = GfskBitrate> {
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

impl Default for GfskBitrate {
    fn default() -> Self {
        Self {
            kbps: 2000,
            khz: 2400,
            code: 0x04,
        }
    }
}

/// Modulation index in hundredths: multiples of 25 from 50 to 400, plus 35.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulationIndex(u8);

impl ModulationIndex {
    pub fn from_hundredths(value: u16) -> Result<Self> {
        let legal = value == 35 || ((50..=400).contains(&value) && value % 25 == 0);
        if !legal {
            return Err(Sx1280Error::invalid(
                "modulation_index",
                format!("{value} is not 35 or a multiple of 25 in 50..=400"),
            ));
        }
        Ok(Self((value / 25 - 1) as u8))
    }

    pub fn from_code(code: u8) -> Result<Self> {
        if code > 0x0F {
            return Err(Sx1280Error::invalid(
                "modulation_index",
                format!("unknown code 0x{code:02X}"),
            ));
        }
        Ok(Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn hundredths(self) -> u16 {
        match self.0 {
            0 => 35,
            c => (u16::from(c) + 1) * 25,
        }
    }
}

impl Default for ModulationIndex {
    fn default() -> Self {
        // 2.00
        Self(0x07)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfskModulation {
    pub bitrate: GfskBitrate,
    pub modulation_index: ModulationIndex,
    pub bandwidth_time: BandwidthTime,
}

impl GfskModulation {
    pub fn encode(&self) -> [u8; 3] {
        [
            self.bitrate.code(),
            self.modulation_index.code(),
            self.bandwidth_time.code(),
        ]
    }

    pub fn decode(bytes: [u8; 3]) -> Result<Self> {
        Ok(Self {
            bitrate: GfskBitrate::from_code(bytes[0])?,
            modulation_index: ModulationIndex::from_code(bytes[1])?,
            bandwidth_time: BandwidthTime::from_code(bytes[2])?,
        })
    }
}

impl Default for GfskModulation {
    fn default() -> Self {
        Self {
            bitrate: GfskBitrate::default(),
            modulation_index: ModulationIndex::default(),
            bandwidth_time: BandwidthTime::Bt1_0,
        }
    }
}

/// Sync word length, 1 to 5 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfskSyncWordLength(u8);

impl GfskSyncWordLength {
    pub fn from_bytes(n: u8) -> Result<Self> {
        if !(1..=5).contains(&n) {
            return Err(Sx1280Error::invalid(
                "gfsk.sync_word_bytes",
                format!("{n} is outside 1..=5"),
            ));
        }
        Ok(Self(n))
    }

    pub fn from_code(code: u8) -> Result<Self> {
        if code % 2 != 0 || code > 0x08 {
            return Err(Sx1280Error::invalid(
                "gfsk.sync_word_len",
                format!("unknown code 0x{code:02X}"),
            ));
        }
        Ok(Self(code / 2 + 1))
    }

    pub fn bytes(self) -> u8 {
        self.0
    }

    pub fn code(self) -> u8 {
        (self.0 - 1) * 2
    }
}

impl Default for GfskSyncWordLength {
    fn default() -> Self {
        Self(2)
    }
}

/// CRC length: 0, 1 or 2 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfskCrc(u8);

impl GfskCrc {
    pub fn from_bytes(n: u8) -> Result<Self> {
        if n > 2 {
            return Err(Sx1280Error::invalid("gfsk.crc_bytes", format!("{n} is not 0, 1 or 2")));
        }
        Ok(Self(n))
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 | 0x10 | 0x20 => Ok(Self(code >> 4)),
            _ => Err(Sx1280Error::invalid("gfsk.crc", format!("unknown code 0x{code:02X}"))),
        }
    }

    pub fn bytes(self) -> u8 {
        self.0
    }

    pub fn code(self) -> u8 {
        self.0 << 4
    }
}

impl Default for GfskCrc {
    fn default() -> Self {
        Self(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GfskPacket {
    pub preamble: LinearPreamble,
    pub sync_word_len: GfskSyncWordLength,
    pub sync_word_match: SyncWordMatch,
    pub header: HeaderType,
    pub payload_length: u8,
    pub crc: GfskCrc,
    pub whitening: Whitening,
}

impl GfskPacket {
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
            sync_word_len: GfskSyncWordLength::from_code(bytes[1])?,
            sync_word_match: SyncWordMatch::from_code(bytes[2])?,
            header: HeaderType::from_code(bytes[3])?,
            payload_length: bytes[4],
            crc: GfskCrc::from_code(bytes[5])?,
            whitening: Whitening::from_code(bytes[6])?,
        })
    }
}

impl Default for GfskPacket {
    fn default() -> Self {
        Self {
            preamble: LinearPreamble::default(),
            sync_word_len: GfskSyncWordLength::default(),
            sync_word_match: SyncWordMatch::empty(),
            header: HeaderType::Variable,
            payload_length: PAYLOAD_MAX as u8,
            crc: GfskCrc::default(),
            whitening: Whitening::Enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_thirteen_pairs() {
        assert_eq!(GfskBitrate::all().count(), 13);
    }

    #[test]
    fn test_bitrate_lookup() {
        assert_eq!(GfskBitrate::from_kbps(125, 300).unwrap().code(), 0xEF);
        assert_eq!(GfskBitrate::from_kbps(1000, 1200).unwrap().code(), 0x45);
        assert!(GfskBitrate::from_kbps(125, 600).is_err());
        assert!(GfskBitrate::from_kbps(999, 999).is_err());
    }

    #[test]
    fn test_modulation_index() {
        assert_eq!(ModulationIndex::from_hundredths(35).unwrap().code(), 0);
        assert_eq!(ModulationIndex::from_hundredths(50).unwrap().code(), 1);
        assert_eq!(ModulationIndex::from_hundredths(200).unwrap().code(), 7);
        assert_eq!(ModulationIndex::from_hundredths(400).unwrap().code(), 15);
        assert_eq!(ModulationIndex::from_code(0).unwrap().hundredths(), 35);
        assert!(ModulationIndex::from_hundredths(60).is_err());
        assert!(ModulationIndex::from_hundredths(25).is_err());
        assert!(ModulationIndex::from_hundredths(425).is_err());
    }

    #[test]
    fn test_default_encoding() {
        assert_eq!(GfskModulation::default().encode(), [0x04, 0x07, 0x10]);
        assert_eq!(
            GfskPacket::default().encode(),
            [0x10, 0x02, 0x00, 0x20, 0xFF, 0x20, 0x00]
        );
    }

    #[test]
    fn test_packet_decode_matches_encode() {
        let packet = GfskPacket {
            preamble: LinearPreamble::from_bits(32).unwrap(),
            sync_word_len: GfskSyncWordLength::from_bytes(5).unwrap(),
            sync_word_match: SyncWordMatch::SYNC_WORD_1 | SyncWordMatch::SYNC_WORD_3,
            header: HeaderType::Fixed,
            payload_length: 17,
            crc: GfskCrc::from_bytes(1).unwrap(),
            whitening: Whitening::Disabled,
        };
        let bytes = packet.encode();
        assert_eq!(bytes, [0x70, 0x08, 0x50, 0x00, 17, 0x10, 0x08]);
        assert_eq!(GfskPacket::decode(bytes).unwrap(), packet);
    }

    #[test]
    fn test_sync_word_and_crc_bounds() {
        assert!(GfskSyncWordLength::from_bytes(0).is_err());
        assert!(GfskSyncWordLength::from_bytes(6).is_err());
        assert!(GfskCrc::from_bytes(3).is_err());
    }
}
