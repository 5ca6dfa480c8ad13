//! Conversions between human units and the chip's native encodings for the
//! settings shared by every packet type: RF frequency, output power, PA ramp time
//! and the (period base, count) timeout pair.

use crate::constants::{
    PLL_STEP_SHIFT, POWER_MAX_DBM, POWER_MIN_DBM, POWER_OFFSET, RF_FREQ_MAX_HZ, RF_FREQ_MIN_HZ,
    XTAL_FREQ_HZ,
};
use crate::error::{Result, Sx1280Error};
use std::fmt;

/// Convert Hz to PLL steps: `floor(hz * 2^18 / 52 MHz)`.
pub fn hz_to_pll(hz: u32) -> u32 {
    ((u64::from(hz) << PLL_STEP_SHIFT) / XTAL_FREQ_HZ) as u32
}

/// Convert PLL steps back to Hz: `floor(pll * 52 MHz / 2^18)`.
pub fn pll_to_hz(pll: u32) -> u32 {
    ((u64::from(pll) * XTAL_FREQ_HZ) >> PLL_STEP_SHIFT) as u32
}

/// RF carrier frequency held as the 24-bit PLL step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RfFrequency(u32);

impl RfFrequency {
    /// Validates `hz` against the 2.4 GHz ISM band and converts it.
    pub fn from_hz(hz: u32) -> Result<Self> {
        if !(RF_FREQ_MIN_HZ..=RF_FREQ_MAX_HZ).contains(&hz) {
            return Err(Sx1280Error::invalid(
                "rf_freq_hz",
                format!("{hz} Hz is outside {RF_FREQ_MIN_HZ}..={RF_FREQ_MAX_HZ}"),
            ));
        }
        Ok(Self(hz_to_pll(hz)))
    }

    /// Wraps a raw PLL value, as read back from a command payload.
    pub fn from_pll(pll: u32) -> Result<Self> {
        if pll > 0x00FF_FFFF {
            return Err(Sx1280Error::invalid(
                "rf_freq_pll",
                format!("0x{pll:X} does not fit 24 bits"),
            ));
        }
        Ok(Self(pll))
    }

    pub fn pll(self) -> u32 {
        self.0
    }

    pub fn hz(self) -> u32 {
        pll_to_hz(self.0)
    }

    /// The three payload bytes of SetRfFrequency, MSB first.
    pub fn to_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

impl Default for RfFrequency {
    fn default() -> Self {
        Self(hz_to_pll(RF_FREQ_MIN_HZ))
    }
}

/// Output power, stored the way SetTxParams expects it: `dBm + 18`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Power(u8);

impl Power {
    pub fn from_dbm(dbm: i8) -> Result<Self> {
        if !(POWER_MIN_DBM..=POWER_MAX_DBM).contains(&dbm) {
            return Err(Sx1280Error::invalid(
                "power_dbm",
                format!("{dbm} dBm is outside {POWER_MIN_DBM}..={POWER_MAX_DBM}"),
            ));
        }
        Ok(Self((i16::from(dbm) + POWER_OFFSET) as u8))
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::from_dbm((i16::from(code) - POWER_OFFSET) as i8)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn dbm(self) -> i8 {
        (i16::from(self.0) - POWER_OFFSET) as i8
    }
}

impl Default for Power {
    fn default() -> Self {
        Self((i16::from(POWER_MAX_DBM) + POWER_OFFSET) as u8)
    }
}

/// Power amplifier ramp time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RampTime {
    #[default]
    Us2,
    Us4,
    Us6,
    Us8,
    Us10,
    Us12,
    Us16,
    Us20,
}

impl RampTime {
    pub const ALL: [RampTime; 8] = [
        RampTime::Us2,
        RampTime::Us4,
        RampTime::Us6,
        RampTime::Us8,
        RampTime::Us10,
        RampTime::Us12,
        RampTime::Us16,
        RampTime::Us20,
    ];

    pub fn from_us(us: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.us() == us)
            .ok_or_else(|| {
                Sx1280Error::invalid(
                    "ramp_time_us",
                    format!("{us} us is not one of 2, 4, 6, 8, 10, 12, 16, 20"),
                )
            })
    }

    pub fn us(self) -> u32 {
        match self {
            RampTime::Us2 => 2,
            RampTime::Us4 => 4,
            RampTime::Us6 => 6,
            RampTime::Us8 => 8,
            RampTime::Us10 => 10,
            RampTime::Us12 => 12,
            RampTime::Us16 => 16,
            RampTime::Us20 => 20,
        }
    }

    /// Two-segment table: `(us-2)<<4` up to 12 us, `(us+8)<<3` above.
    pub fn code(self) -> u8 {
        let us = self.us();
        if us <= 12 {
            ((us - 2) << 4) as u8
        } else {
            ((us + 8) << 3) as u8
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.code() == code)
            .ok_or_else(|| Sx1280Error::invalid("ramp_time", format!("unknown code 0x{code:02X}")))
    }
}

/// Timer granularity of SetTx/SetRx timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodBase {
    /// 15.625 us
    Us15_625 = 0x00,
    /// 62.5 us
    Us62_5 = 0x01,
    /// 1 ms
    Ms1 = 0x02,
    /// 4 ms
    Ms4 = 0x03,
}

impl PeriodBase {
    pub const ALL: [PeriodBase; 4] = [
        PeriodBase::Us15_625,
        PeriodBase::Us62_5,
        PeriodBase::Ms1,
        PeriodBase::Ms4,
    ];

    pub fn ns(self) -> u64 {
        match self {
            PeriodBase::Us15_625 => 15_625,
            PeriodBase::Us62_5 => 62_500,
            PeriodBase::Ms1 => 1_000_000,
            PeriodBase::Ms4 => 4_000_000,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| *b as u8 == code)
            .ok_or_else(|| Sx1280Error::invalid("period_base", format!("unknown code 0x{code:02X}")))
    }
}

/// A timeout as the chip counts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    pub base: PeriodBase,
    pub count: u16,
}

impl Timeout {
    /// Receive continuously until told otherwise.
    pub const CONTINUOUS: Timeout = Timeout {
        base: PeriodBase::Us15_625,
        count: 0xFFFF,
    };

    /// Picks the finest period base whose 16-bit count covers `us`, then rounds
    /// the count up so the realized wait is never shorter than requested.
    pub fn from_us(us: u32) -> Result<Self> {
        let ns = u64::from(us) * 1_000;
        for base in PeriodBase::ALL {
            let count = ns.div_ceil(base.ns());
            if count <= u64::from(u16::MAX) {
                return Ok(Self {
                    base,
                    count: count as u16,
                });
            }
        }
        Err(Sx1280Error::invalid(
            "timeout_us",
            format!("{us} us exceeds the 262.14 s the chip can count"),
        ))
    }

    pub fn duration_ns(self) -> u64 {
        self.base.ns() * u64::from(self.count)
    }

    /// `[period_base, count_hi, count_lo]` as sent after SetTx/SetRx.
    pub fn to_bytes(self) -> [u8; 3] {
        let [hi, lo] = self.count.to_be_bytes();
        [self.base as u8, hi, lo]
    }
}

impl Default for Timeout {
    fn default() -> Self {
        // 1000 us at the 15.625 us base
        Self {
            base: PeriodBase::Us15_625,
            count: 64,
        }
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} ns", self.count, self.base.ns())
    }
}
