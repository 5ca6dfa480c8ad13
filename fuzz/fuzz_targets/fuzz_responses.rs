#![no_main]

use libfuzzer_sys::fuzz_target;
use sx1280_rs::radio::command::{
    decode_irq_status, decode_packet_type, decode_rssi_inst, decode_rx_buffer_status,
};
use sx1280_rs::radio::{ChipStatus, PacketStatus, RadioMode};

fuzz_target!(|data: &[u8]| {
    let _ = ChipStatus::decode(data);
    let _ = decode_irq_status(data);
    let _ = decode_packet_type(data);
    let _ = decode_rssi_inst(data);
    let _ = decode_rx_buffer_status(data);
    for mode in RadioMode::ALL {
        if let Ok(status) = PacketStatus::decode(mode, data) {
            let _ = status.rssi_dbm();
            let _ = status.snr_db();
            let _ = status.sync_word_index();
        }
    }
});
