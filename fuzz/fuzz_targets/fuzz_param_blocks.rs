#![no_main]

use libfuzzer_sys::fuzz_target;
use sx1280_rs::radio::{ModulationParams, PacketParams, RadioMode};

fuzz_target!(|data: &[u8]| {
    if data.len() < 11 {
        return;
    }
    let mode = RadioMode::ALL[usize::from(data[0]) % RadioMode::ALL.len()];
    let modulation: [u8; 3] = [data[1], data[2], data[3]];
    let packet: [u8; 7] = [data[4], data[5], data[6], data[7], data[8], data[9], data[10]];

    // Anything that decodes must encode back to the same bytes
    if let Ok(m) = ModulationParams::decode(mode, modulation) {
        assert_eq!(m.encode(), modulation);
        if let Ok(p) = PacketParams::decode(mode, packet) {
            assert_eq!(p.encode(), packet);
            let _ = p.frame_limits(&m);
        }
    }
});
