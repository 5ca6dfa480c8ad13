//! Loading `RadioConfig` from JSON files the way the CLI does.

use std::fs::File;
use std::io::Write;
use std::time::Duration;
use sx1280_rs::radio::{BusyPolicy, PacketParams};
use sx1280_rs::{RadioConfig, RadioMode, Sx1280Error};
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn load(file: &NamedTempFile) -> serde_json::Result<RadioConfig> {
    serde_json::from_reader(File::open(file.path()).unwrap())
}

#[test]
fn test_empty_object_gives_defaults() {
    let file = write_config("{}");
    assert_eq!(load(&file).unwrap(), RadioConfig::default());
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    let file = write_config(
        r#"{
            "mode": "flrc",
            "rf_freq_hz": 2450000000,
            "flrc": { "bitrate_kbps": 650, "bandwidth_khz": 600, "coding_rate": "1/2" },
            "host": { "dio_lines": [1], "busy_policy": "before_and_after" }
        }"#,
    );
    let config = load(&file).unwrap();
    assert_eq!(config.mode, RadioMode::Flrc);
    assert_eq!(config.power_dbm, 13);
    assert_eq!(config.flrc.max_payload_bytes, 127);
    assert_eq!(config.host.busy_timeout_us, 100_000);

    let validated = config.validate().unwrap();
    assert_eq!(validated.chip.mode, RadioMode::Flrc);
    assert_eq!(validated.chip.rf_frequency.hz(), 2_449_999_923);
    assert!(matches!(validated.chip.packet, PacketParams::Flrc(_)));
    assert_eq!(validated.host.guard.policy, BusyPolicy::BeforeAndAfter);
    assert_eq!(validated.host.dio_lines, vec![1]);
    assert_eq!(validated.host.idle_timeout, Duration::from_millis(5000));
}

#[test]
fn test_unknown_mode_is_a_parse_error() {
    let file = write_config(r#"{ "mode": "fsk" }"#);
    assert!(load(&file).is_err());
}

#[test]
fn test_illegal_value_names_its_field() {
    let file = write_config(r#"{ "mode": "lora", "lora": { "spreading_factor": 13 } }"#);
    let err = load(&file).unwrap().validate().unwrap_err();
    assert!(matches!(
        err,
        Sx1280Error::InvalidParameter {
            field: "lora.spreading_factor",
            ..
        }
    ));
}

#[test]
fn test_inactive_mode_is_validated_too() {
    let file = write_config(r#"{ "mode": "gfsk", "ble": { "max_payload_bytes": 100 } }"#);
    assert!(load(&file).unwrap().validate().is_err());
}

#[test]
fn test_out_of_band_frequency_rejected() {
    let file = write_config(r#"{ "rf_freq_hz": 915000000 }"#);
    let err = load(&file).unwrap().validate().unwrap_err();
    assert!(matches!(
        err,
        Sx1280Error::InvalidParameter {
            field: "rf_freq_hz",
            ..
        }
    ));
}

#[test]
fn test_bad_dio_lines_rejected() {
    let file = write_config(r#"{ "host": { "dio_lines": [4] } }"#);
    assert!(load(&file).unwrap().validate().is_err());
}

#[test]
fn test_serialized_config_reloads_identically() {
    let mut config = RadioConfig {
        mode: RadioMode::Gfsk,
        power_dbm: -4,
        ..RadioConfig::default()
    };
    config.gfsk.crc_seed = Some(0x1D0F);
    config.gfsk.sync_words[0] = Some(0xD391D98D);

    let file = write_config(&serde_json::to_string_pretty(&config).unwrap());
    let reloaded = load(&file).unwrap();
    assert_eq!(reloaded, config);
    assert_eq!(reloaded.validate().unwrap(), config.validate().unwrap());
}
