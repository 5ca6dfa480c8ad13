//! # SX1280 Interrupt Handling
//!
//! The SX1280 reports events through a 16-bit IRQ register. SetDioIrqParams picks
//! which bits are enabled at all and which DIO line each enabled bit raises.
//!
//! ## Bit Assignments
//!
//! ```text
//! Bit 15: PreambleDetected (AdvancedRangingDone in ranging mode)
//! Bit 14: RxTxTimeout
//! Bit 13: CadDetected
//! Bit 12: CadDone
//! Bit 11: RangingSlaveRequestValid
//! Bit 10: RangingMasterTimeout
//! Bit 9:  RangingMasterResultValid
//! Bit 8:  RangingSlaveRequestDiscard
//! Bit 7:  RangingSlaveResponseDone
//! Bit 6:  CrcError
//! Bit 5:  HeaderError
//! Bit 4:  HeaderValid
//! Bit 3:  SyncWordError
//! Bit 2:  SyncWordValid
//! Bit 1:  RxDone
//! Bit 0:  TxDone
//! ```
//!
//! ## Usage Pattern
//!
//! 1. Route interrupts with [`DioMapping`] at setup.
//! 2. On any DIO edge, read the IRQ status.
//! 3. Clear every reported bit.
//! 4. Act on the bits the state machine handles.

use bitflags::bitflags;

bitflags! {
    /// Contents of the IRQ status register, also used for masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct IrqFlags: u16 {
        const TX_DONE = 1 << 0;
        const RX_DONE = 1 << 1;
        const SYNC_WORD_VALID = 1 << 2;
        const SYNC_WORD_ERROR = 1 << 3;
        const HEADER_VALID = 1 << 4;
        const HEADER_ERROR = 1 << 5;
        const CRC_ERROR = 1 << 6;
        const RANGING_SLAVE_RESPONSE_DONE = 1 << 7;
        const RANGING_SLAVE_REQUEST_DISCARD = 1 << 8;
        const RANGING_MASTER_RESULT_VALID = 1 << 9;
        const RANGING_MASTER_TIMEOUT = 1 << 10;
        const RANGING_SLAVE_REQUEST_VALID = 1 << 11;
        const CAD_DONE = 1 << 12;
        const CAD_DETECTED = 1 << 13;
        const RX_TX_TIMEOUT = 1 << 14;
        const PREAMBLE_DETECTED = 1 << 15;
    }
}

impl IrqFlags {
    /// Bit 15 when the chip runs advanced ranging.
    pub const ADVANCED_RANGING_DONE: IrqFlags = IrqFlags::PREAMBLE_DETECTED;

    /// Conditions that make a received frame unusable.
    pub const RX_ERRORS: IrqFlags = IrqFlags::SYNC_WORD_ERROR
        .union(IrqFlags::HEADER_ERROR)
        .union(IrqFlags::CRC_ERROR);

    /// Bits the state machine acts on.
    pub const HANDLED: IrqFlags = IrqFlags::TX_DONE
        .union(IrqFlags::RX_DONE)
        .union(IrqFlags::RX_ERRORS)
        .union(IrqFlags::RX_TX_TIMEOUT)
        .union(IrqFlags::SYNC_WORD_VALID)
        .union(IrqFlags::HEADER_VALID);

    pub fn tx_done(self) -> bool {
        self.contains(IrqFlags::TX_DONE)
    }

    pub fn rx_done(self) -> bool {
        self.contains(IrqFlags::RX_DONE)
    }

    pub fn timeout(self) -> bool {
        self.contains(IrqFlags::RX_TX_TIMEOUT)
    }

    pub fn has_rx_error(self) -> bool {
        self.intersects(IrqFlags::RX_ERRORS)
    }

    /// Ranging, CAD and preamble bits nothing acts on yet.
    pub fn unhandled(self) -> IrqFlags {
        self.difference(IrqFlags::HANDLED)
    }
}

/// IRQ enable mask plus the per-DIO routing sent with SetDioIrqParams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DioMapping {
    pub irq_mask: IrqFlags,
    pub dio: [IrqFlags; 3],
}

impl DioMapping {
    /// Default routing: DIO1 completions, DIO2 timeout, DIO3 receive errors.
    ///
    /// Lines not in `wired` get their bits folded into the lowest wired line.
    pub fn for_lines(wired: &[u8]) -> Self {
        let mut dio = [
            IrqFlags::TX_DONE | IrqFlags::RX_DONE,
            IrqFlags::RX_TX_TIMEOUT,
            IrqFlags::RX_ERRORS,
        ];
        let irq_mask = dio.iter().fold(IrqFlags::empty(), |acc, f| acc | *f);

        let lowest = (1..=3u8).find(|n| wired.contains(n));
        if let Some(lowest) = lowest {
            let target = usize::from(lowest - 1);
            for idx in 0..3 {
                let line = idx as u8 + 1;
                if !wired.contains(&line) && idx != target {
                    let moved = dio[idx];
                    dio[target] |= moved;
                    dio[idx] = IrqFlags::empty();
                }
            }
        }

        Self { irq_mask, dio }
    }
}

impl Default for DioMapping {
    fn default() -> Self {
        Self::for_lines(&[1, 2, 3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_positions() {
        assert_eq!(IrqFlags::TX_DONE.bits(), 0x0001);
        assert_eq!(IrqFlags::CRC_ERROR.bits(), 0x0040);
        assert_eq!(IrqFlags::CAD_DONE.bits(), 0x1000);
        assert_eq!(IrqFlags::RX_TX_TIMEOUT.bits(), 0x4000);
        assert_eq!(IrqFlags::ADVANCED_RANGING_DONE.bits(), 0x8000);
    }

    #[test]
    fn test_unhandled_bits() {
        let flags = IrqFlags::RX_DONE | IrqFlags::CAD_DONE | IrqFlags::PREAMBLE_DETECTED;
        assert_eq!(
            flags.unhandled(),
            IrqFlags::CAD_DONE | IrqFlags::PREAMBLE_DETECTED
        );
        assert!(IrqFlags::RX_TX_TIMEOUT.unhandled().is_empty());
    }

    #[test]
    fn test_default_mapping() {
        let m = DioMapping::default();
        assert_eq!(m.dio[0], IrqFlags::TX_DONE | IrqFlags::RX_DONE);
        assert_eq!(m.dio[1], IrqFlags::RX_TX_TIMEOUT);
        assert_eq!(m.dio[2], IrqFlags::RX_ERRORS);
        assert_eq!(m.irq_mask.bits(), 0x4000 | 0x0001 | 0x0002 | 0x0008 | 0x0020 | 0x0040);
    }

    #[test]
    fn test_mapping_folds_unwired_lines() {
        let m = DioMapping::for_lines(&[1]);
        assert_eq!(m.dio[0], m.irq_mask);
        assert!(m.dio[1].is_empty());
        assert!(m.dio[2].is_empty());
    }
}
