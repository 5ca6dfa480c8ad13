//! BLE modulation and packet parameters.
//!
//! BLE runs at a fixed 1 Mb/s with index 0.50 and BT 0.5, so only the packet block
//! carries choices.

use super::{BandwidthTime, Whitening};
use crate::error::{Result, Sx1280Error};
use std::str::FromStr;

const BLE_MODULATION: [u8; 3] = [0x45, 0x01, 0x20];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BleModulation;

impl BleModulation {
    pub fn encode(&self) -> [u8; 3] {
        BLE_MODULATION
    }

    pub fn decode(bytes: [u8; 3]) -> Result<Self> {
        if bytes != BLE_MODULATION {
            return Err(Sx1280Error::invalid(
                "ble.modulation",
                format!("{bytes:02X?} is not the fixed BLE setting"),
            ));
        }
        Ok(Self)
    }

    pub fn bitrate_kbps(&self) -> u16 {
        1000
    }

    pub fn bandwidth_time(&self) -> BandwidthTime {
        BandwidthTime::Bt0_5
    }
}

/// Maximum PDU payload, which also selects connection vs. test framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BleConnectionState {
    Max31,
    #[default]
    Max37,
    Test63,
    Max255,
}

impl BleConnectionState {
    const ALL: [BleConnectionState; 4] = [
        BleConnectionState::Max31,
        BleConnectionState::Max37,
        BleConnectionState::Test63,
        BleConnectionState::Max255,
    ];

    pub fn from_max_payload(bytes: u16) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.max_payload() == usize::from(bytes))
            .ok_or_else(|| {
                Sx1280Error::invalid(
                    "ble.max_payload_bytes",
                    format!("{bytes} is not one of 31, 37, 63, 255"),
                )
            })
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| Sx1280Error::invalid("ble.connection_state", format!("unknown code 0x{code:02X}")))
    }

    pub fn max_payload(self) -> usize {
        match self {
            BleConnectionState::Max31 => 31,
            BleConnectionState::Max37 => 37,
            BleConnectionState::Test63 => 63,
            BleConnectionState::Max255 => 255,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            BleConnectionState::Max31 => 0x00,
            BleConnectionState::Max37 => 0x20,
            BleConnectionState::Test63 => 0x40,
            BleConnectionState::Max255 => 0x80,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BleCrc {
    Off,
    #[default]
    Bytes3,
}

impl BleCrc {
    pub fn from_bytes(n: u8) -> Result<Self> {
        match n {
            0 => Ok(BleCrc::Off),
            3 => Ok(BleCrc::Bytes3),
            _ => Err(Sx1280Error::invalid("ble.crc_bytes", format!("{n} is not 0 or 3"))),
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x00 => Ok(BleCrc::Off),
            0x10 => Ok(BleCrc::Bytes3),
            _ => Err(Sx1280Error::invalid("ble.crc", format!("unknown code 0x{code:02X}"))),
        }
    }

    pub fn bytes(self) -> u8 {
        match self {
            BleCrc::Off => 0,
            BleCrc::Bytes3 => 3,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            BleCrc::Off => 0x00,
            BleCrc::Bytes3 => 0x10,
        }
    }
}

/// Direct-test-mode payload pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BleTestPayload {
    #[default]
    Prbs9,
    EyeLong10,
    EyeShort10,
    Prbs15,
    All1,
    All0,
    EyeLong01,
    EyeShort01,
}

impl BleTestPayload {
    const ALL: [BleTestPayload; 8] = [
        BleTestPayload::Prbs9,
        BleTestPayload::EyeLong10,
        BleTestPayload::EyeShort10,
        BleTestPayload::Prbs15,
        BleTestPayload::All1,
        BleTestPayload::All0,
        BleTestPayload::EyeLong01,
        BleTestPayload::EyeShort01,
    ];

    pub fn code(self) -> u8 {
        match self {
            BleTestPayload::Prbs9 => 0x00,
            BleTestPayload::EyeLong10 => 0x04,
            BleTestPayload::EyeShort10 => 0x08,
            BleTestPayload::Prbs15 => 0x0C,
            BleTestPayload::All1 => 0x10,
            BleTestPayload::All0 => 0x14,
            BleTestPayload::EyeLong01 => 0x18,
            BleTestPayload::EyeShort01 => 0x1C,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| Sx1280Error::invalid("ble.test_payload", format!("unknown code 0x{code:02X}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            BleTestPayload::Prbs9 => "prbs9",
            BleTestPayload::EyeLong10 => "eyelong10",
            BleTestPayload::EyeShort10 => "eyeshort10",
            BleTestPayload::Prbs15 => "prbs15",
            BleTestPayload::All1 => "all1",
            BleTestPayload::All0 => "all0",
            BleTestPayload::EyeLong01 => "eyelong01",
            BleTestPayload::EyeShort01 => "eyeshort01",
        }
    }
}

impl FromStr for BleTestPayload {
    type Err = Sx1280Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Sx1280Error::invalid("ble.test_payload", format!("unknown pattern '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlePacket {
    pub connection_state: BleConnectionState,
    pub crc: BleCrc,
    pub test_payload: BleTestPayload,
    pub whitening: Whitening,
}

impl BlePacket {
    pub fn encode(&self) -> [u8; 7] {
        [
            self.connection_state.code(),
            self.crc.code(),
            self.test_payload.code(),
            self.whitening.code(),
            0x00,
            0x00,
            0x00,
        ]
    }

    pub fn decode(bytes: [u8; 7]) -> Result<Self> {
        Ok(Self {
            connection_state: BleConnectionState::from_code(bytes[0])?,
            crc: BleCrc::from_code(bytes[1])?,
            test_payload: BleTestPayload::from_code(bytes[2])?,
            whitening: Whitening::from_code(bytes[3])?,
        })
    }
}
