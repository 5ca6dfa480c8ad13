//! SX1280 Protocol Constants
//!
//! Opcodes, register addresses and fixed chip limits, taken from the SX1280/SX1281
//! datasheet (rev 3.2).

// ----------------------------------------------------------------------------
// Command opcodes
// ----------------------------------------------------------------------------

pub const OP_GET_STATUS: u8 = 0xC0;
pub const OP_WRITE_REGISTER: u8 = 0x18;
pub const OP_READ_REGISTER: u8 = 0x19;
pub const OP_WRITE_BUFFER: u8 = 0x1A;
pub const OP_READ_BUFFER: u8 = 0x1B;
pub const OP_SET_SLEEP: u8 = 0x84;
pub const OP_SET_STANDBY: u8 = 0x80;
pub const OP_SET_FS: u8 = 0xC1;
pub const OP_SET_TX: u8 = 0x83;
pub const OP_SET_RX: u8 = 0x82;
pub const OP_SET_RX_DUTY_CYCLE: u8 = 0x94;
pub const OP_SET_CAD: u8 = 0xC5;
pub const OP_SET_TX_CONTINUOUS_WAVE: u8 = 0xD1;
pub const OP_SET_TX_CONTINUOUS_PREAMBLE: u8 = 0xD2;
pub const OP_SET_PACKET_TYPE: u8 = 0x8A;
pub const OP_GET_PACKET_TYPE: u8 = 0x03;
pub const OP_SET_RF_FREQUENCY: u8 = 0x86;
pub const OP_SET_TX_PARAMS: u8 = 0x8E;
pub const OP_SET_CAD_PARAMS: u8 = 0x88;
pub const OP_SET_BUFFER_BASE_ADDRESS: u8 = 0x8F;
pub const OP_SET_MODULATION_PARAMS: u8 = 0x8B;
pub const OP_SET_PACKET_PARAMS: u8 = 0x8C;
pub const OP_GET_RX_BUFFER_STATUS: u8 = 0x17;
pub const OP_GET_PACKET_STATUS: u8 = 0x1D;
pub const OP_GET_RSSI_INST: u8 = 0x1F;
pub const OP_SET_DIO_IRQ_PARAMS: u8 = 0x8D;
pub const OP_GET_IRQ_STATUS: u8 = 0x15;
pub const OP_CLEAR_IRQ_STATUS: u8 = 0x97;
pub const OP_SET_REGULATOR_MODE: u8 = 0x96;
pub const OP_SET_SAVE_CONTEXT: u8 = 0xD5;
pub const OP_SET_AUTO_FS: u8 = 0x9E;
pub const OP_SET_AUTO_TX: u8 = 0x98;
pub const OP_SET_LONG_PREAMBLE: u8 = 0x9B;

/// Filler clocked out while the chip answers.
pub const NOP: u8 = 0x00;

/// Status bytes echoed ahead of the payload of every Get* command.
pub const RESPONSE_STATUS_BYTES: usize = 2;

// ----------------------------------------------------------------------------
// Register map
// ----------------------------------------------------------------------------

pub const REG_FIRMWARE_VERSION: u16 = 0x0153;
pub const REG_PAYLOAD_LENGTH: u16 = 0x0901;
pub const REG_LORA_HEADER_MODE: u16 = 0x0903;
pub const REG_LORA_SYNC_WORD_MSB: u16 = 0x0944;
pub const REG_LORA_SYNC_WORD_LSB: u16 = 0x0945;
pub const REG_WHITENING_INITIAL_VALUE: u16 = 0x09C5;
pub const REG_CRC_POLYNOMIAL: u16 = 0x09C6;
/// Top byte of the 24-bit BLE CRC initialiser; GFSK/FLRC use the two bytes after it.
pub const REG_CRC_SEED_BLE: u16 = 0x09C7;
pub const REG_CRC_SEED: u16 = 0x09C8;
pub const REG_SYNC_ADDRESS_1: u16 = 0x09CE;
pub const REG_SYNC_ADDRESS_2: u16 = 0x09D3;
pub const REG_SYNC_ADDRESS_3: u16 = 0x09D8;
pub const REG_BLE_ACCESS_ADDRESS: u16 = 0x09CF;

// ----------------------------------------------------------------------------
// Chip limits
// ----------------------------------------------------------------------------

/// Crystal reference; the PLL step is XTAL / 2^18.
pub const XTAL_FREQ_HZ: u64 = 52_000_000;
pub const PLL_STEP_SHIFT: u32 = 18;
pub const RF_FREQ_MIN_HZ: u32 = 2_400_000_000;
pub const RF_FREQ_MAX_HZ: u32 = 2_500_000_000;

pub const POWER_MIN_DBM: i8 = -18;
pub const POWER_MAX_DBM: i8 = 13;
pub const POWER_OFFSET: i16 = 18;

/// Size of the half-duplex data buffer shared by TX and RX.
pub const BUFFER_SIZE: usize = 256;
pub const TX_BASE_ADDRESS: u8 = 0x00;
pub const RX_BASE_ADDRESS: u8 = 0x00;

// Circuit modes reported in status bits [7:5]
pub const CIRCUIT_MODE_STDBY_RC: u8 = 0x2;
pub const CIRCUIT_MODE_STDBY_XOSC: u8 = 0x3;
pub const CIRCUIT_MODE_FS: u8 = 0x4;
pub const CIRCUIT_MODE_RX: u8 = 0x5;
pub const CIRCUIT_MODE_TX: u8 = 0x6;

// Command status reported in status bits [4:2]
pub const CMD_STATUS_SUCCESS: u8 = 0x1;
pub const CMD_STATUS_DATA_AVAILABLE: u8 = 0x2;
pub const CMD_STATUS_TIMEOUT: u8 = 0x3;
pub const CMD_STATUS_PROCESSING_ERROR: u8 = 0x4;
pub const CMD_STATUS_EXEC_FAILURE: u8 = 0x5;
pub const CMD_STATUS_TX_DONE: u8 = 0x6;

// Packet-status error byte (GFSK/FLRC/BLE)
pub const PKT_ERR_SYNC: u8 = 0x40;
pub const PKT_ERR_LENGTH: u8 = 0x20;
pub const PKT_ERR_CRC: u8 = 0x10;
pub const PKT_ERR_ABORT: u8 = 0x08;

/// Interface clock used by the Raspberry Pi transport.
pub const SPI_CLOCK_HZ: u32 = 18_000_000;
