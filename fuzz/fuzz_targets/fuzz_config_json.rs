#![no_main]

use libfuzzer_sys::fuzz_target;
use sx1280_rs::RadioConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = serde_json::from_str::<RadioConfig>(text) {
        let _ = config.validate();
    }
});
