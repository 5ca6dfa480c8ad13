//! LoRa modulation and packet parameters, also used as-is by Ranging mode.

use crate::error::{Result, Sx1280Error};

pub const PAYLOAD_MIN: usize = 1;
pub const PAYLOAD_MAX: usize = 255;
/// Upper bound when long interleaving at 4/8 is active.
pub const PAYLOAD_MAX_LI_4_8: usize = 253;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadingFactor(u8);

impl SpreadingFactor {
    pub fn new(sf: u8) -> Result<Self> {
        if !(5..=12).contains(&sf) {
            return Err(Sx1280Error::invalid(
                "lora.spreading_factor",
                format!("SF{sf} is outside 5..=12"),
            ));
        }
        Ok(Self(sf))
    }

    pub fn from_code(code: u8) -> Result<Self> {
        if code & 0x0F != 0 {
            return Err(Sx1280Error::invalid(
                "lora.spreading_factor",
                format!("unknown code 0x{code:02X}"),
            ));
        }
        Self::new(code >> 4)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn code(self) -> u8 {
        self.0 << 4
    }
}

impl Default for SpreadingFactor {
    fn default() -> Self {
        Self(12)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoraBandwidth {
    #[default]
    Khz1600,
    Khz800,
    Khz400,
    Khz200,
}

impl LoraBandwidth {
    const ALL: [LoraBandwidth; 4] = [
        LoraBandwidth::Khz1600,
        LoraBandwidth::Khz800,
        LoraBandwidth::Khz400,
        LoraBandwidth::Khz200,
    ];

    pub fn from_khz(khz: u16) -> Result<Self> {
        Self::ALL.into_iter().find(|b| b.khz() == khz).ok_or_else(|| {
            Sx1280Error::invalid(
                "lora.bandwidth",
                format!("{khz} kHz is not one of 1600, 800, 400, 200"),
            )
        })
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.code() == code)
            .ok_or_else(|| Sx1280Error::invalid("lora.bandwidth", format!("unknown code 0x{code:02X}")))
    }

    pub fn khz(self) -> u16 {
        match self {
            LoraBandwidth::Khz1600 => 1600,
            LoraBandwidth::Khz800 => 800,
            LoraBandwidth::Khz400 => 400,
            LoraBandwidth::Khz200 => 200,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            LoraBandwidth::Khz1600 => 0x0A,
            LoraBandwidth::Khz800 => 0x18,
            LoraBandwidth::Khz400 => 0x26,
            LoraBandwidth::Khz200 => 0x34,
        }
    }
}

/// Forward error correction rate, with the long-interleaving variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoraCodingRate {
    Cr4_5,
    Cr4_6,
    Cr4_7,
    #[default]
    Cr4_8,
    Li4_5,
    Li4_6,
    Li4_8,
}

impl LoraCodingRate {
    const ALL: [LoraCodingRate; 7] = [
        LoraCodingRate::Cr4_5,
        LoraCodingRate::Cr4_6,
        LoraCodingRate::Cr4_7,
        LoraCodingRate::Cr4_8,
        LoraCodingRate::Li4_5,
        LoraCodingRate::Li4_6,
        LoraCodingRate::Li4_8,
    ];

    /// Parse `"4/5"`..`"4/8"`. 4/7 has no interleaved form and stays 4/7.
    pub fn from_fraction(fraction: &str, long_interleaving: bool) -> Result<Self> {
        let cr = match (fraction, long_interleaving) {
            ("4/5", false) => LoraCodingRate::Cr4_5,
            ("4/6", false) => LoraCodingRate::Cr4_6,
            ("4/7", _) => {
                if long_interleaving {
                    log::warn!("LoRa coding rate 4/7 has no long-interleaving variant, using 4/7");
                }
                LoraCodingRate::Cr4_7
            }
            ("4/8", false) => LoraCodingRate::Cr4_8,
            ("4/5", true) => LoraCodingRate::Li4_5,
            ("4/6", true) => LoraCodingRate::Li4_6,
            ("4/8", true) => LoraCodingRate::Li4_8,
            _ => {
                return Err(Sx1280Error::invalid(
                    "lora.coding_rate",
                    format!("'{fraction}' is not one of 4/5, 4/6, 4/7, 4/8"),
                ))
            }
        };
        Ok(cr)
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| Sx1280Error::invalid("lora.coding_rate", format!("unknown code 0x{code:02X}")))
    }

    pub fn code(self) -> u8 {
        match self {
            LoraCodingRate::Cr4_5 => 0x01,
            LoraCodingRate::Cr4_6 => 0x02,
            LoraCodingRate::Cr4_7 => 0x03,
            LoraCodingRate::Cr4_8 => 0x04,
            LoraCodingRate::Li4_5 => 0x05,
            LoraCodingRate::Li4_6 => 0x06,
            LoraCodingRate::Li4_8 => 0x07,
        }
    }

    pub fn fraction(self) -> &'static str {
        match self {
            LoraCodingRate::Cr4_5 | LoraCodingRate::Li4_5 => "4/5",
            LoraCodingRate::Cr4_6 | LoraCodingRate::Li4_6 => "4/6",
            LoraCodingRate::Cr4_7 => "4/7",
            LoraCodingRate::Cr4_8 | LoraCodingRate::Li4_8 => "4/8",
        }
    }

    pub fn is_long_interleaved(self) -> bool {
        matches!(
            self,
            LoraCodingRate::Li4_5 | LoraCodingRate::Li4_6 | LoraCodingRate::Li4_8
        )
    }

    pub fn max_payload(self) -> usize {
        match self {
            LoraCodingRate::Li4_8 => PAYLOAD_MAX_LI_4_8,
            _ => PAYLOAD_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoraModulation {
    pub spreading_factor: SpreadingFactor,
    pub bandwidth: LoraBandwidth,
    pub coding_rate: LoraCodingRate,
}

impl LoraModulation {
    pub fn encode(&self) -> [u8; 3] {
        [
            self.spreading_factor.code(),
            self.bandwidth.code(),
            self.coding_rate.code(),
        ]
    }

    pub fn decode(bytes: [u8; 3]) -> Result<Self> {
        Ok(Self {
            spreading_factor: SpreadingFactor::from_code(bytes[0])?,
            bandwidth: LoraBandwidth::from_code(bytes[1])?,
            coding_rate: LoraCodingRate::from_code(bytes[2])?,
        })
    }
}

/// Preamble length as `mantissa << exponent`, both in 1..=15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoraPreamble {
    mantissa: u8,
    exponent: u8,
}

impl LoraPreamble {
    pub fn from_bits(bits: u32) -> Result<Self> {
        let reject = || {
            Sx1280Error::invalid(
                "lora.preamble_bits",
                format!("{bits} cannot be written as mantissa << exponent with both in 1..=15"),
            )
        };
        if bits == 0 {
            return Err(reject());
        }

        let mut exponent = bits.trailing_zeros();
        let mut mantissa = bits >> exponent;
        if exponent > 15 {
            // push the surplus back into the mantissa
            mantissa <<= exponent - 15;
            exponent = 15;
        }
        if exponent == 0 || !(1..=15).contains(&mantissa) {
            return Err(reject());
        }
        Ok(Self {
            mantissa: mantissa as u8,
            exponent: exponent as u8,
        })
    }

    pub fn from_code(code: u8) -> Result<Self> {
        let mantissa = code & 0x0F;
        let exponent = code >> 4;
        if mantissa == 0 || exponent == 0 {
            return Err(Sx1280Error::invalid(
                "lora.preamble",
                format!("unknown code 0x{code:02X}"),
            ));
        }
        Ok(Self { mantissa, exponent })
    }

    pub fn code(self) -> u8 {
        (self.exponent << 4) | self.mantissa
    }

    pub fn bits(self) -> u32 {
        u32::from(self.mantissa) << self.exponent
    }

    pub fn mantissa(self) -> u8 {
        self.mantissa
    }

    pub fn exponent(self) -> u8 {
        self.exponent
    }
}

impl Default for LoraPreamble {
    fn default() -> Self {
        // 8 symbols
        Self {
            mantissa: 1,
            exponent: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoraHeader {
    #[default]
    Explicit,
    Implicit,
}

impl LoraHeader {
    pub fn code(self) -> u8 {
        match self {
            LoraHeader::Explicit => 0x00,
            LoraHeader::Implicit => 0x80,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(LoraHeader::Explicit),
            0x80 => Ok(LoraHeader::Implicit),
            _ => Err(Sx1280Error::invalid("lora.header", format!("unknown code 0x{code:02X}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoraIq {
    #[default]
    Standard,
    Inverted,
}

impl LoraIq {
    pub fn code(self) -> u8 {
        match self {
            LoraIq::Standard => 0x40,
            LoraIq::Inverted => 0x00,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x40 => Ok(LoraIq::Standard),
            0x00 => Ok(LoraIq::Inverted),
            _ => Err(Sx1280Error::invalid("lora.iq", format!("unknown code 0x{code:02X}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoraPacket {
    pub preamble: LoraPreamble,
    pub header: LoraHeader,
    pub payload_length: u8,
    pub crc: bool,
    pub iq: LoraIq,
}

impl LoraPacket {
    pub fn encode(&self) -> [u8; 7] {
        [
            self.preamble.code(),
            self.header.code(),
            self.payload_length,
            if self.crc { 0x20 } else { 0x00 },
            self.iq.code(),
            0x00,
            0x00,
        ]
    }

    pub fn decode(bytes: [u8; 7]) -> Result<Self> {
        let crc = match bytes[3] {
            0x20 => true,
            0x00 => false,
            code => return Err(Sx1280Error::invalid("lora.crc", format!("unknown code 0x{code:02X}"))),
        };
        Ok(Self {
            preamble: LoraPreamble::from_code(bytes[0])?,
            header: LoraHeader::from_code(bytes[1])?,
            payload_length: bytes[2],
            crc,
            iq: LoraIq::from_code(bytes[4])?,
        })
    }
}

impl Default for LoraPacket {
    fn default() -> Self {
        Self {
            preamble: LoraPreamble::default(),
            header: LoraHeader::Explicit,
            payload_length: PAYLOAD_MAX as u8,
            crc: true,
            iq: LoraIq::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_factorisation() {
        let p = LoraPreamble::from_bits(12).unwrap();
        assert_eq!((p.mantissa(), p.exponent()), (3, 2));
        assert_eq!(p.code(), 0x23);

        // 1 << 16 only fits as 2 << 15
        let p = LoraPreamble::from_bits(1 << 16).unwrap();
        assert_eq!((p.mantissa(), p.exponent()), (2, 15));
        assert_eq!(p.bits(), 1 << 16);
    }

    #[test]
    fn test_preamble_rejects_unrepresentable() {
        assert!(LoraPreamble::from_bits(0).is_err());
        // odd counts need exponent 0
        assert!(LoraPreamble::from_bits(15).is_err());
        // 17 << 1: mantissa too large
        assert!(LoraPreamble::from_bits(34).is_err());
        assert!(LoraPreamble::from_bits(1 << 20).is_err());
    }

    #[test]
    fn test_coding_rate_variants() {
        assert_eq!(LoraCodingRate::from_fraction("4/5", false).unwrap().code(), 0x01);
        assert_eq!(LoraCodingRate::from_fraction("4/8", true).unwrap().code(), 0x07);
        assert_eq!(LoraCodingRate::from_fraction("4/7", true).unwrap().code(), 0x03);
        assert!(LoraCodingRate::from_fraction("4/9", false).is_err());
        assert_eq!(LoraCodingRate::Li4_8.max_payload(), 253);
    }

    #[test]
    fn test_modulation_encoding() {
        let m = LoraModulation {
            spreading_factor: SpreadingFactor::new(7).unwrap(),
            bandwidth: LoraBandwidth::from_khz(800).unwrap(),
            coding_rate: LoraCodingRate::Cr4_5,
        };
        assert_eq!(m.encode(), [0x70, 0x18, 0x01]);
        assert_eq!(LoraModulation::decode(m.encode()).unwrap(), m);
        assert!(SpreadingFactor::new(13).is_err());
        assert!(LoraBandwidth::from_khz(500).is_err());
    }

    #[test]
    fn test_packet_encoding() {
        let p = LoraPacket {
            iq: LoraIq::Inverted,
            header: LoraHeader::Implicit,
            crc: false,
            payload_length: 10,
            ..LoraPacket::default()
        };
        assert_eq!(p.encode(), [0x31, 0x80, 10, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(LoraPacket::decode(p.encode()).unwrap(), p);
    }
}
