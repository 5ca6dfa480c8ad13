//! Property tests for the unit conversions and parameter encoders.

use proptest::prelude::*;
use sx1280_rs::radio::params::{
    FlrcBitrate, GfskBitrate, LoraPreamble, PeriodBase, RfFrequency, Timeout,
};
use sx1280_rs::{hz_to_pll, pll_to_hz, Sx1280Error};

/// One PLL step (198.4 Hz) plus the floor of the way back.
const PLL_STEP_HZ: u32 = 200;

/// Longest timeout the chip can count: 65535 x 4 ms.
const MAX_TIMEOUT_US: u32 = 262_140_000;

/// GFSK (kb/s, kHz, code) triples from the SX1280 datasheet.
const GFSK_PAIRS: [(u16, u16, u8); 13] = [
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

const FLRC_PAIRS: [(u16, u16, u8); 6] = [
    (1300, 1200, 0x45),
    (1000, 1200, 0x69),
    (650, 600, 0x86),
    (520, 600, 0xAA),
    (325, 300, 0xC7),
    (260, 300, 0xEB),
];

fn preamble_expressible(bits: u32) -> bool {
    (1..=15u32).any(|m| (1..=15u32).any(|e| m << e == bits))
}

proptest! {
    #[test]
    fn prop_hz_round_trip_never_overshoots(hz in 2_400_000_000u32..=2_500_000_000) {
        let back = pll_to_hz(hz_to_pll(hz));
        prop_assert!(back <= hz);
        prop_assert!(hz - back < PLL_STEP_HZ);
    }

    #[test]
    fn prop_pll_round_trip_never_overshoots(pll in 0u32..=0x00FF_FFFF) {
        let back = hz_to_pll(pll_to_hz(pll));
        prop_assert!(back <= pll);
        prop_assert!(pll - back <= 1);
    }

    #[test]
    fn prop_hz_to_pll_is_monotonic(a in 2_400_000_000u32..=2_500_000_000, b in 2_400_000_000u32..=2_500_000_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(hz_to_pll(lo) <= hz_to_pll(hi));
    }

    #[test]
    fn prop_frequency_bytes_are_pll_msb_first(hz in 2_400_000_000u32..=2_500_000_000) {
        let f = RfFrequency::from_hz(hz).unwrap();
        let [a, b, c] = f.to_bytes();
        prop_assert_eq!(u32::from_be_bytes([0, a, b, c]), f.pll());
    }

    #[test]
    fn prop_timeout_is_a_ceiling(us in 0u32..=MAX_TIMEOUT_US) {
        let t = Timeout::from_us(us).unwrap();
        let requested = u64::from(us) * 1_000;
        prop_assert!(t.duration_ns() >= requested);
        // One count less would fall short
        if t.count > 0 {
            prop_assert!(t.duration_ns() - t.base.ns() < requested);
        }
        // No finer base could have held the count
        for finer in PeriodBase::ALL.into_iter().take_while(|b| *b != t.base) {
            prop_assert!(requested.div_ceil(finer.ns()) > u64::from(u16::MAX));
        }
    }

    #[test]
    fn prop_timeout_beyond_range_is_rejected(us in (MAX_TIMEOUT_US + 1)..=u32::MAX) {
        let rejected = matches!(Timeout::from_us(us), Err(Sx1280Error::InvalidParameter { .. }));
        prop_assert!(rejected);
    }

    #[test]
    fn prop_lora_preamble_round_trip(m in 1u32..=15, e in 1u32..=15) {
        let bits = m << e;
        let p = LoraPreamble::from_bits(bits).unwrap();
        prop_assert_eq!(p.bits(), bits);
        prop_assert_eq!(LoraPreamble::from_code(p.code()).unwrap().bits(), bits);
    }

    #[test]
    fn prop_lora_preamble_accepts_exactly_expressible_counts(bits in 0u32..=(15 << 15) + 1) {
        let accepted = LoraPreamble::from_bits(bits).is_ok();
        prop_assert_eq!(accepted, preamble_expressible(bits));
    }

    #[test]
    fn prop_gfsk_bitrate_table_membership(kbps in 0u16..=2500, bw in 0u16..=2500) {
        let listed = GFSK_PAIRS.iter().any(|&(b, w, _)| b == kbps && w == bw);
        prop_assert_eq!(GfskBitrate::from_kbps(kbps, bw).is_ok(), listed);
    }

    #[test]
    fn prop_flrc_bitrate_table_membership(kbps in 0u16..=1500, bw in 0u16..=1500) {
        let listed = FLRC_PAIRS.iter().any(|&(b, w, _)| b == kbps && w == bw);
        prop_assert_eq!(FlrcBitrate::from_kbps(kbps, bw).is_ok(), listed);
    }
}

#[test]
fn test_bitrate_pairs_map_to_datasheet_codes() {
    assert_eq!(GfskBitrate::all().count(), GFSK_PAIRS.len());
    assert_eq!(FlrcBitrate::all().count(), FLRC_PAIRS.len());
    for &(kbps, khz, code) in &GFSK_PAIRS {
        let b = GfskBitrate::from_kbps(kbps, khz).unwrap();
        assert_eq!(b.code(), code, "GFSK {kbps} kb/s at {khz} kHz");
        let back = GfskBitrate::from_code(code).unwrap();
        assert_eq!((back.kbps(), back.bandwidth_khz()), (kbps, khz));
    }
    for &(kbps, khz, code) in &FLRC_PAIRS {
        let b = FlrcBitrate::from_kbps(kbps, khz).unwrap();
        assert_eq!(b.code(), code, "FLRC {kbps} kb/s at {khz} kHz");
        let back = FlrcBitrate::from_code(code).unwrap();
        assert_eq!((back.kbps(), back.bandwidth_khz()), (kbps, khz));
    }
}

#[test]
fn test_near_miss_bitrate_pairs_are_rejected() {
    for (kbps, khz) in [(1000, 600), (2000, 1200), (125, 600), (250, 1200), (1600, 1200)] {
        assert!(GfskBitrate::from_kbps(kbps, khz).is_err(), "GFSK {kbps}/{khz}");
    }
    for (kbps, khz) in [(1300, 600), (1000, 600), (650, 1200), (260, 600), (2000, 2400)] {
        assert!(FlrcBitrate::from_kbps(kbps, khz).is_err(), "FLRC {kbps}/{khz}");
    }
}

#[test]
fn test_preamble_edge_counts() {
    assert!(LoraPreamble::from_bits(2).is_ok());
    assert_eq!(LoraPreamble::from_bits(15 << 15).unwrap().bits(), 15 << 15);
    assert!(LoraPreamble::from_bits(17).is_err());
    assert!(LoraPreamble::from_bits(1).is_err());
    assert!(LoraPreamble::from_bits(0).is_err());
}
