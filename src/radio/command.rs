//! # Command Codec
//!
//! Stateless encoding of the SX1280 command set into SPI segments, and decoding of
//! the responses. Every Get* command clocks two status bytes before its payload;
//! the decoders here drop them so callers only see the meaningful bytes.
//!
//! Register and buffer accesses are two segments under one chip-select: a fixed
//! header (opcode, address, and a NOP for reads) followed by the data.

use crate::constants::*;
use crate::error::{Result, Sx1280Error};
use crate::radio::irq::{DioMapping, IrqFlags};
use crate::radio::params::{RadioMode, RfFrequency, Timeout};
use crate::transport::{Segment, TransportError};

/// Oscillator kept running in standby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyMode {
    Rc = 0x00,
    Xosc = 0x01,
}

/// What survives SetSleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SleepConfig {
    pub retain_buffer: bool,
    pub retain_ram: bool,
}

impl SleepConfig {
    pub fn code(self) -> u8 {
        (u8::from(self.retain_buffer) << 1) | u8::from(self.retain_ram)
    }
}

/// Number of symbols CAD listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CadSymbols {
    One = 0x00,
    Two = 0x20,
    Four = 0x40,
    Eight = 0x60,
    Sixteen = 0x80,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulatorMode {
    Ldo = 0x00,
    DcDc = 0x01,
}

/// Every command the driver can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetStatus,
    WriteRegister { address: u16, data: Vec<u8> },
    ReadRegister { address: u16, len: usize },
    WriteBuffer { offset: u8, data: Vec<u8> },
    ReadBuffer { offset: u8, len: usize },
    SetSleep(SleepConfig),
    SetStandby(StandbyMode),
    SetFs,
    SetTx(Timeout),
    SetRx(Timeout),
    SetRxDutyCycle { base: u8, rx_count: u16, sleep_count: u16 },
    SetCad,
    SetTxContinuousWave,
    SetTxContinuousPreamble,
    SetPacketType(RadioMode),
    GetPacketType,
    SetRfFrequency(RfFrequency),
    SetTxParams { power: u8, ramp: u8 },
    SetCadParams(CadSymbols),
    SetBufferBaseAddress { tx: u8, rx: u8 },
    SetModulationParams([u8; 3]),
    SetPacketParams([u8; 7]),
    GetRxBufferStatus,
    GetPacketStatus,
    GetRssiInst,
    SetDioIrqParams(DioMapping),
    GetIrqStatus,
    ClearIrqStatus(IrqFlags),
    SetRegulatorMode(RegulatorMode),
    SetSaveContext,
    SetAutoFs(bool),
    SetAutoTx(u16),
    SetLongPreamble(bool),
}

impl Command {
    pub fn opcode(&self) -> u8 {
        match self {
            Command::GetStatus => OP_GET_STATUS,
            Command::WriteRegister { .. } => OP_WRITE_REGISTER,
            Command::ReadRegister { .. } => OP_READ_REGISTER,
            Command::WriteBuffer { .. } => OP_WRITE_BUFFER,
            Command::ReadBuffer { .. } => OP_READ_BUFFER,
            Command::SetSleep(_) => OP_SET_SLEEP,
            Command::SetStandby(_) => OP_SET_STANDBY,
            Command::SetFs => OP_SET_FS,
            Command::SetTx(_) => OP_SET_TX,
            Command::SetRx(_) => OP_SET_RX,
            Command::SetRxDutyCycle { .. } => OP_SET_RX_DUTY_CYCLE,
            Command::SetCad => OP_SET_CAD,
            Command::SetTxContinuousWave => OP_SET_TX_CONTINUOUS_WAVE,
            Command::SetTxContinuousPreamble => OP_SET_TX_CONTINUOUS_PREAMBLE,
            Command::SetPacketType(_) => OP_SET_PACKET_TYPE,
            Command::GetPacketType => OP_GET_PACKET_TYPE,
            Command::SetRfFrequency(_) => OP_SET_RF_FREQUENCY,
            Command::SetTxParams { .. } => OP_SET_TX_PARAMS,
            Command::SetCadParams(_) => OP_SET_CAD_PARAMS,
            Command::SetBufferBaseAddress { .. } => OP_SET_BUFFER_BASE_ADDRESS,
            Command::SetModulationParams(_) => OP_SET_MODULATION_PARAMS,
            Command::SetPacketParams(_) => OP_SET_PACKET_PARAMS,
            Command::GetRxBufferStatus => OP_GET_RX_BUFFER_STATUS,
            Command::GetPacketStatus => OP_GET_PACKET_STATUS,
            Command::GetRssiInst => OP_GET_RSSI_INST,
            Command::SetDioIrqParams(_) => OP_SET_DIO_IRQ_PARAMS,
            Command::GetIrqStatus => OP_GET_IRQ_STATUS,
            Command::ClearIrqStatus(_) => OP_CLEAR_IRQ_STATUS,
            Command::SetRegulatorMode(_) => OP_SET_REGULATOR_MODE,
            Command::SetSaveContext => OP_SET_SAVE_CONTEXT,
            Command::SetAutoFs(_) => OP_SET_AUTO_FS,
            Command::SetAutoTx(_) => OP_SET_AUTO_TX,
            Command::SetLongPreamble(_) => OP_SET_LONG_PREAMBLE,
        }
    }

    /// Number of payload bytes a response carries once the status bytes are gone.
    pub fn response_len(&self) -> usize {
        match self {
            Command::GetStatus => 1,
            Command::GetPacketType | Command::GetRssiInst => 1,
            Command::GetIrqStatus | Command::GetRxBufferStatus => 2,
            Command::GetPacketStatus => 5,
            Command::ReadRegister { len, .. } | Command::ReadBuffer { len, .. } => *len,
            _ => 0,
        }
    }

    /// Bytes of the first (or only) segment.
    pub fn header(&self) -> Vec<u8> {
        let op = self.opcode();
        match self {
            Command::GetStatus => vec![op],
            Command::WriteRegister { address, .. } => {
                let [hi, lo] = address.to_be_bytes();
                vec![op, hi, lo]
            }
            Command::ReadRegister { address, .. } => {
                let [hi, lo] = address.to_be_bytes();
                vec![op, hi, lo, NOP]
            }
            Command::WriteBuffer { offset, .. } => vec![op, *offset],
            Command::ReadBuffer { offset, .. } => vec![op, *offset, NOP],
            Command::SetSleep(cfg) => vec![op, cfg.code()],
            Command::SetStandby(mode) => vec![op, *mode as u8],
            Command::SetTx(t) | Command::SetRx(t) => {
                let [base, hi, lo] = t.to_bytes();
                vec![op, base, hi, lo]
            }
            Command::SetRxDutyCycle {
                base,
                rx_count,
                sleep_count,
            } => {
                let [rx_hi, rx_lo] = rx_count.to_be_bytes();
                let [sl_hi, sl_lo] = sleep_count.to_be_bytes();
                vec![op, *base, rx_hi, rx_lo, sl_hi, sl_lo]
            }
            Command::SetPacketType(mode) => vec![op, mode.packet_type()],
            Command::SetRfFrequency(freq) => {
                let [b2, b1, b0] = freq.to_bytes();
                vec![op, b2, b1, b0]
            }
            Command::SetTxParams { power, ramp } => vec![op, *power, *ramp],
            Command::SetCadParams(symbols) => vec![op, *symbols as u8],
            Command::SetBufferBaseAddress { tx, rx } => vec![op, *tx, *rx],
            Command::SetModulationParams(p) => {
                let mut out = vec![op];
                out.extend_from_slice(p);
                out
            }
            Command::SetPacketParams(p) => {
                let mut out = vec![op];
                out.extend_from_slice(p);
                out
            }
            Command::SetDioIrqParams(mapping) => {
                let mut out = vec![op];
                out.extend_from_slice(&mapping.irq_mask.bits().to_be_bytes());
                for dio in &mapping.dio {
                    out.extend_from_slice(&dio.bits().to_be_bytes());
                }
                out
            }
            Command::ClearIrqStatus(mask) => {
                let [hi, lo] = mask.bits().to_be_bytes();
                vec![op, hi, lo]
            }
            Command::SetRegulatorMode(mode) => vec![op, *mode as u8],
            Command::SetAutoFs(on) | Command::SetLongPreamble(on) => vec![op, u8::from(*on)],
            Command::SetAutoTx(us) => {
                let [hi, lo] = us.to_be_bytes();
                vec![op, hi, lo]
            }
            Command::GetPacketType
            | Command::GetRxBufferStatus
            | Command::GetPacketStatus
            | Command::GetRssiInst
            | Command::GetIrqStatus => {
                let mut out = vec![op];
                out.resize(RESPONSE_STATUS_BYTES + self.response_len(), NOP);
                out
            }
            Command::SetFs
            | Command::SetCad
            | Command::SetTxContinuousWave
            | Command::SetTxContinuousPreamble
            | Command::SetSaveContext => vec![op, NOP],
        }
    }

    /// SPI segments for this command, issued under one chip-select.
    pub fn segments(&self) -> Vec<Segment> {
        match self {
            Command::GetStatus => vec![Segment::transfer(self.header(), 1)],
            Command::WriteRegister { data, .. } | Command::WriteBuffer { data, .. } => {
                vec![Segment::write(self.header()), Segment::write(data.clone())]
            }
            Command::ReadRegister { len, .. } | Command::ReadBuffer { len, .. } => {
                vec![Segment::write(self.header()), Segment::read(*len)]
            }
            Command::GetPacketType
            | Command::GetRxBufferStatus
            | Command::GetPacketStatus
            | Command::GetRssiInst
            | Command::GetIrqStatus => {
                let header = self.header();
                let len = header.len();
                vec![Segment::transfer(header, len)]
            }
            _ => vec![Segment::write(self.header())],
        }
    }

    /// Strip status bytes from a raw exchange result and check the length.
    pub fn strip_response<'a>(&self, raw: &'a [u8]) -> Result<&'a [u8]> {
        let skip = match self {
            Command::GetPacketType
            | Command::GetRxBufferStatus
            | Command::GetPacketStatus
            | Command::GetRssiInst
            | Command::GetIrqStatus => RESPONSE_STATUS_BYTES,
            _ => 0,
        };
        let want = skip + self.response_len();
        if raw.len() < want {
            return Err(TransportError::Spi(format!(
                "short response to opcode 0x{:02X}: {} of {} bytes",
                self.opcode(),
                raw.len(),
                want
            ))
            .into());
        }
        Ok(&raw[skip..want])
    }
}

/// Circuit mode from status bits [7:5].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitMode {
    StandbyRc,
    StandbyXosc,
    Fs,
    Rx,
    Tx,
    Unknown(u8),
}

/// Command status from status bits [4:2].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    DataAvailable,
    Timeout,
    ProcessingError,
    ExecFailure,
    TxDone,
    Reserved(u8),
}

/// Decoded status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipStatus {
    pub raw: u8,
    pub circuit_mode: CircuitMode,
    pub command_status: CommandStatus,
}

impl ChipStatus {
    pub fn from_byte(raw: u8) -> Self {
        let circuit_mode = match (raw >> 5) & 0x07 {
            CIRCUIT_MODE_STDBY_RC => CircuitMode::StandbyRc,
            CIRCUIT_MODE_STDBY_XOSC => CircuitMode::StandbyXosc,
            CIRCUIT_MODE_FS => CircuitMode::Fs,
            CIRCUIT_MODE_RX => CircuitMode::Rx,
            CIRCUIT_MODE_TX => CircuitMode::Tx,
            other => CircuitMode::Unknown(other),
        };
        let command_status = match (raw >> 2) & 0x07 {
            CMD_STATUS_SUCCESS => CommandStatus::Success,
            CMD_STATUS_DATA_AVAILABLE => CommandStatus::DataAvailable,
            CMD_STATUS_TIMEOUT => CommandStatus::Timeout,
            CMD_STATUS_PROCESSING_ERROR => CommandStatus::ProcessingError,
            CMD_STATUS_EXEC_FAILURE => CommandStatus::ExecFailure,
            CMD_STATUS_TX_DONE => CommandStatus::TxDone,
            other => CommandStatus::Reserved(other),
        };
        Self {
            raw,
            circuit_mode,
            command_status,
        }
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        let bytes = Command::GetStatus.strip_response(raw)?;
        Ok(Self::from_byte(bytes[0]))
    }

    /// Fails if the last command reported a timeout, processing error or exec failure.
    pub fn check(self) -> Result<Self> {
        match self.command_status {
            CommandStatus::Timeout | CommandStatus::ProcessingError | CommandStatus::ExecFailure => {
                Err(Sx1280Error::UnexpectedChipState {
                    expected: "successful command status",
                    status: self.raw,
                })
            }
            _ => Ok(self),
        }
    }
}

pub fn decode_packet_type(raw: &[u8]) -> Result<RadioMode> {
    let bytes = Command::GetPacketType.strip_response(raw)?;
    RadioMode::from_packet_type(bytes[0]).ok_or(Sx1280Error::UnexpectedChipState {
        expected: "packet type 0..=4",
        status: bytes[0],
    })
}

pub fn decode_irq_status(raw: &[u8]) -> Result<IrqFlags> {
    let bytes = Command::GetIrqStatus.strip_response(raw)?;
    Ok(IrqFlags::from_bits_retain(u16::from_be_bytes([
        bytes[0], bytes[1],
    ])))
}

/// Payload length and start offset of the last received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxBufferStatus {
    pub payload_length: u8,
    pub start_offset: u8,
}

pub fn decode_rx_buffer_status(raw: &[u8]) -> Result<RxBufferStatus> {
    let bytes = Command::GetRxBufferStatus.strip_response(raw)?;
    Ok(RxBufferStatus {
        payload_length: bytes[0],
        start_offset: bytes[1],
    })
}

/// Instantaneous RSSI in dBm.
pub fn decode_rssi_inst(raw: &[u8]) -> Result<i16> {
    let bytes = Command::GetRssiInst.strip_response(raw)?;
    Ok(-(i16::from(bytes[0])) / 2)
}

/// GetPacketStatus payload, interpreted per packet family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketStatus {
    /// GFSK, FLRC and BLE.
    Fsk {
        rssi_sync_dbm: i16,
        errors: u8,
        status: u8,
        sync: u8,
    },
    /// LoRa and Ranging.
    Lora { rssi_sync_dbm: i16, snr_db: f32 },
}

impl PacketStatus {
    pub fn decode(mode: RadioMode, raw: &[u8]) -> Result<Self> {
        let b = Command::GetPacketStatus.strip_response(raw)?;
        if mode.is_lora_family() {
            Ok(PacketStatus::Lora {
                rssi_sync_dbm: -(i16::from(b[0])) / 2,
                snr_db: f32::from(b[1] as i8) / 4.0,
            })
        } else {
            Ok(PacketStatus::Fsk {
                rssi_sync_dbm: -(i16::from(b[1])) / 2,
                errors: b[2],
                status: b[3],
                sync: b[4],
            })
        }
    }

    pub fn rssi_dbm(&self) -> i16 {
        match self {
            PacketStatus::Fsk { rssi_sync_dbm, .. } | PacketStatus::Lora { rssi_sync_dbm, .. } => {
                *rssi_sync_dbm
            }
        }
    }

    pub fn snr_db(&self) -> Option<f32> {
        match self {
            PacketStatus::Lora { snr_db, .. } => Some(*snr_db),
            PacketStatus::Fsk { .. } => None,
        }
    }

    /// Sync, length, CRC or abort error flagged by the packet engine.
    pub fn has_errors(&self) -> bool {
        match self {
            PacketStatus::Fsk { errors, .. } => {
                errors & (PKT_ERR_SYNC | PKT_ERR_LENGTH | PKT_ERR_CRC | PKT_ERR_ABORT) != 0
            }
            PacketStatus::Lora { .. } => false,
        }
    }

    /// Index (1..=3) of the sync word that matched, when reported.
    pub fn sync_word_index(&self) -> Option<u8> {
        match self {
            PacketStatus::Fsk { sync, .. } if (1..=3).contains(&(sync & 0x07)) => Some(sync & 0x07),
            _ => None,
        }
    }
}
