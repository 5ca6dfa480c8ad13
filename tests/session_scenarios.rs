//! End-to-end session scenarios against the simulated chip.
//!
//! Each test starts a full session (reset, setup, interrupt threads) and drives
//! the chip side through a `MockHandle`.

mod common;

use common::*;
use std::thread;
use std::time::Duration;
use sx1280_rs::constants::*;
use sx1280_rs::radio::{GfskSetting, IrqFlags, LoraSetting};
use sx1280_rs::transport::MockTransport;
use sx1280_rs::{
    DropReason, RadioConfig, RadioEvent, RadioMode, RadioState, Session, Setting, Sx1280Error,
};

#[test]
fn test_gfsk_send_then_return_to_receive() {
    let (session, events, handle) = start(&gfsk_config());

    session.submit(vec![0x01, 0x02, 0x03]).unwrap();
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));

    let commands = handle.commands();
    let write = commands.iter().find(|c| c[0] == OP_WRITE_BUFFER).unwrap();
    assert_eq!(write, &vec![0x1A, 0x00, 0x01, 0x02, 0x03]);
    let packet = commands.iter().find(|c| c[0] == OP_SET_PACKET_PARAMS).unwrap();
    assert_eq!(packet, &vec![0x8C, 0x10, 0x02, 0x00, 0x20, 0x03, 0x20, 0x00]);
    assert_eq!(session.state().unwrap(), RadioState::Transmitting);

    handle.complete_tx();
    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        RadioEvent::TransmitDone { len: 3 }
    );

    // Max payload restored before SetRx
    let packets = handle.commands_with_opcode(OP_SET_PACKET_PARAMS);
    assert_eq!(
        packets.last().unwrap(),
        &vec![0x8C, 0x10, 0x02, 0x00, 0x20, 0xFF, 0x20, 0x00]
    );
    assert!(last_index_of(&handle, OP_SET_RX) > last_index_of(&handle, OP_SET_PACKET_PARAMS));
    assert_eq!(session.state().unwrap(), RadioState::Receiving);
    assert_eq!(handle.circuit_mode(), CIRCUIT_MODE_RX);

    let stats = session.stats().unwrap();
    assert_eq!(stats.tx_packets, 1);
    assert_eq!(stats.tx_bytes, 3);
}

#[test]
fn test_receive_delivers_frame_with_link_quality() {
    let (session, events, handle) = start(&gfsk_config());

    handle.set_packet_status([0x00, 80, 0x00, 0x00, 0x02]);
    handle.inject_rx(0x00, b"ping", IrqFlags::empty());

    let RadioEvent::Received(frame) = events.recv_timeout(WAIT).unwrap() else {
        panic!("expected a received frame");
    };
    assert_eq!(frame.data, b"ping");
    assert_eq!(frame.rssi_dbm, -40);
    assert_eq!(frame.snr_db, None);
    assert_eq!(frame.sync_word_index, Some(2));

    assert!(wait_until(|| session.state().unwrap() == RadioState::Receiving));
    assert_eq!(session.stats().unwrap().rx_packets, 1);
    assert!(handle.pending_irq().is_empty());
}

#[test]
fn test_lora_receive_reports_snr() {
    let (_session, events, handle) = start(&RadioConfig::default());

    // rssi -50 dBm, snr +6.25 dB
    handle.set_packet_status([100, 25, 0x00, 0x00, 0x00]);
    handle.inject_rx(0x10, &[0xAA; 12], IrqFlags::HEADER_VALID);

    let RadioEvent::Received(frame) = events.recv_timeout(WAIT).unwrap() else {
        panic!("expected a received frame");
    };
    assert_eq!(frame.data, vec![0xAA; 12]);
    assert_eq!(frame.rssi_dbm, -50);
    assert_eq!(frame.snr_db, Some(6.25));
    assert_eq!(handle.commands_with_opcode(OP_READ_BUFFER)[0][1], 0x10);
}

#[test]
fn test_crc_error_is_counted_not_delivered() {
    let (session, events, handle) = start(&gfsk_config());

    handle.inject_rx(0x00, &[1, 2, 3, 4], IrqFlags::CRC_ERROR);

    assert!(wait_until(|| session.stats().unwrap().rx_errors == 1));
    let stats = session.stats().unwrap();
    assert_eq!(stats.rx_crc_errors, 1);
    assert_eq!(stats.rx_packets, 0);
    assert!(events.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(handle.commands_with_opcode(OP_READ_BUFFER).is_empty());
    assert!(!handle.commands_with_opcode(OP_SET_RX).is_empty());
    assert_eq!(session.state().unwrap(), RadioState::Receiving);
}

#[test]
fn test_packet_status_error_discards_frame() {
    let (session, events, handle) = start(&gfsk_config());

    handle.set_packet_status([0x00, 80, PKT_ERR_LENGTH, 0x00, 0x01]);
    handle.inject_rx(0x00, &[9; 8], IrqFlags::empty());

    assert!(wait_until(|| session.stats().unwrap().rx_errors == 1));
    assert!(events.recv_timeout(Duration::from_millis(100)).is_err());
    assert!(handle.commands_with_opcode(OP_READ_BUFFER).is_empty());
}

#[test]
fn test_transmit_timeout_drops_frame_and_rearms() {
    let (session, events, handle) = start(&gfsk_config());

    session.submit(vec![0x55; 10]).unwrap();
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));
    handle.timeout_tx();

    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        RadioEvent::TransmitDropped {
            len: 10,
            reason: DropReason::Timeout
        }
    );
    assert_eq!(session.state().unwrap(), RadioState::Receiving);
    assert_eq!(session.stats().unwrap().tx_errors, 1);

    // The slot is free again
    session.submit(vec![0x66; 2]).unwrap();
}

#[test]
fn test_second_submit_is_busy_until_done() {
    let (session, events, handle) = start(&gfsk_config());

    session.submit(vec![1]).unwrap();
    assert!(matches!(session.submit(vec![2]), Err(Sx1280Error::Busy)));
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));
    assert!(matches!(session.submit(vec![2]), Err(Sx1280Error::Busy)));

    handle.complete_tx();
    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        RadioEvent::TransmitDone { len: 1 }
    );
    session.submit(vec![2]).unwrap();
}

#[test]
fn test_submit_checks_frame_length() {
    let (session, _events, _handle) = start(&RadioConfig::default());
    assert!(matches!(
        session.submit(vec![0u8; 256]),
        Err(Sx1280Error::FrameTooLarge { len: 256, .. })
    ));
    assert!(matches!(
        session.submit(Vec::new()),
        Err(Sx1280Error::FrameTooSmall { len: 0, min: 1 })
    ));

    session.set_mode(RadioMode::Flrc).unwrap();
    assert!(matches!(
        session.submit(vec![0u8; 3]),
        Err(Sx1280Error::FrameTooSmall { len: 3, min: 6 })
    ));
    assert!(matches!(
        session.submit(vec![0u8; 128]),
        Err(Sx1280Error::FrameTooLarge { len: 128, max: 127 })
    ));
}

#[test]
fn test_ranging_mode_rejects_submit() {
    let (session, _events, _handle) = start(&RadioConfig::default());
    session.set_mode(RadioMode::Ranging).unwrap();
    assert!(matches!(
        session.submit(vec![1, 2, 3]),
        Err(Sx1280Error::UnsupportedInMode {
            mode: RadioMode::Ranging,
            ..
        })
    ));
}

#[test]
fn test_invalid_setting_leaves_chip_untouched() {
    let (session, _events, handle) = start(&gfsk_config());
    let before = session.status().unwrap();

    let err = session
        .configure(Setting::Gfsk(GfskSetting::Bitrate {
            kbps: 999,
            bandwidth_khz: 999,
        }))
        .unwrap_err();
    assert!(matches!(err, Sx1280Error::InvalidParameter { .. }));
    assert_eq!(session.status().unwrap(), before);
    assert!(handle.commands().is_empty());
    assert_eq!(session.state().unwrap(), RadioState::Receiving);
}

#[test]
fn test_single_field_change_resends_its_block() {
    let (session, _events, handle) = start(&gfsk_config());

    session
        .configure(Setting::Gfsk(GfskSetting::ModulationIndex(50)))
        .unwrap();

    // Bitrate and BT come from the shadow config
    assert_eq!(
        handle.commands_with_opcode(OP_SET_MODULATION_PARAMS),
        vec![vec![0x8B, 0x04, 0x01, 0x10]]
    );
    assert!(handle.commands_with_opcode(OP_SET_PACKET_PARAMS).is_empty());
    assert_eq!(handle.opcodes().first(), Some(&OP_SET_STANDBY));
    assert_eq!(handle.opcodes().last(), Some(&OP_SET_RX));
    assert_eq!(session.status().unwrap().modulation.encode(), [0x04, 0x01, 0x10]);
}

#[test]
fn test_configure_waits_for_transmission() {
    let (session, events, handle) = start(&gfsk_config());

    session.submit(vec![7; 4]).unwrap();
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));

    thread::scope(|s| {
        let pending = s.spawn(|| session.configure(Setting::PowerDbm(10)));
        thread::sleep(Duration::from_millis(100));
        assert!(handle.commands_with_opcode(OP_SET_TX_PARAMS).is_empty());
        assert_eq!(session.state().unwrap(), RadioState::Transmitting);

        handle.complete_tx();
        pending.join().unwrap().unwrap();
    });

    assert_eq!(
        events.recv_timeout(WAIT).unwrap(),
        RadioEvent::TransmitDone { len: 4 }
    );
    assert_eq!(
        handle.commands_with_opcode(OP_SET_TX_PARAMS),
        vec![vec![0x8E, 0x1C, 0x00]]
    );
    assert!(last_index_of(&handle, OP_SET_TX_PARAMS) > last_index_of(&handle, OP_GET_IRQ_STATUS));
    assert_eq!(session.status().unwrap().power.dbm(), 10);
}

#[test]
fn test_configure_times_out_when_transmission_never_ends() {
    let mut config = gfsk_config();
    config.host.idle_timeout_ms = 50;
    let (session, _events, handle) = start(&config);

    session.submit(vec![1, 2]).unwrap();
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));
    assert!(matches!(
        session.configure(Setting::PowerDbm(0)),
        Err(Sx1280Error::IdleTimeout { waited_ms: 50 })
    ));
    assert_eq!(session.status().unwrap().power.dbm(), 13);
}

#[test]
fn test_failed_write_rolls_back_shadow() {
    let (session, _events, handle) = start(&gfsk_config());
    let before = session.status().unwrap();

    handle.fail_next(OP_SET_MODULATION_PARAMS);
    let err = session
        .configure(Setting::Gfsk(GfskSetting::Bitrate {
            kbps: 1000,
            bandwidth_khz: 1200,
        }))
        .unwrap_err();
    assert!(matches!(err, Sx1280Error::TransportFailure(_)));
    assert_eq!(session.status().unwrap(), before);
    assert_eq!(session.state().unwrap(), RadioState::Receiving);

    session
        .configure(Setting::Gfsk(GfskSetting::Bitrate {
            kbps: 1000,
            bandwidth_khz: 1200,
        }))
        .unwrap();
    assert_eq!(session.status().unwrap().modulation.encode()[0], 0x45);
}

#[test]
fn test_inactive_mode_setting_applies_on_mode_switch() {
    let (session, _events, handle) = start(&RadioConfig::default());

    session
        .configure(Setting::Gfsk(GfskSetting::Bitrate {
            kbps: 1000,
            bandwidth_khz: 1200,
        }))
        .unwrap();
    assert!(handle.commands().is_empty());
    assert_eq!(session.status().unwrap().mode, RadioMode::Lora);

    session.set_mode(RadioMode::Gfsk).unwrap();
    assert_eq!(handle.packet_type(), RadioMode::Gfsk.packet_type());
    assert_eq!(
        handle.commands_with_opcode(OP_SET_MODULATION_PARAMS),
        vec![vec![0x8B, 0x45, 0x07, 0x10]]
    );
    assert_eq!(session.packet_type().unwrap(), RadioMode::Gfsk);
    assert_eq!(session.status().unwrap().frame_limits(), 0..=255);
}

#[test]
fn test_mode_switch_keeps_profiles_apart() {
    let (session, _events, _handle) = start(&RadioConfig::default());

    session
        .configure(Setting::Lora(LoraSetting::SpreadingFactor(7)))
        .unwrap();
    session.set_mode(RadioMode::Flrc).unwrap();
    session.set_mode(RadioMode::Lora).unwrap();

    let profiles = session.profiles().unwrap();
    assert_eq!(session.status().unwrap().modulation, profiles.lora.modulation);
    assert_eq!(session.status().unwrap().modulation.encode()[0], 0x70);
}

#[test]
fn test_register_setting_writes_only_changes() {
    let (session, _events, handle) = start(&gfsk_config());

    session.configure(Setting::CrcSeed(0x1D0F)).unwrap();
    assert_eq!(
        handle.commands_with_opcode(OP_WRITE_REGISTER),
        vec![vec![0x18, 0x09, 0xC8, 0x1D, 0x0F]]
    );
    assert_eq!(handle.register(REG_CRC_SEED), Some(0x1D));

    handle.take_commands();
    session.configure(Setting::CrcPolynomial(0x1021)).unwrap();
    assert_eq!(
        handle.commands_with_opcode(OP_WRITE_REGISTER),
        vec![vec![0x18, 0x09, 0xC6, 0x10, 0x21]]
    );
}

#[test]
fn test_register_setting_rejected_in_lora() {
    let (session, _events, handle) = start(&RadioConfig::default());
    assert!(matches!(
        session.configure(Setting::CrcSeed(0x1234)),
        Err(Sx1280Error::UnsupportedInMode { .. })
    ));
    assert!(handle.commands().is_empty());
}

#[test]
fn test_tx_timeout_setting_is_host_side() {
    let (session, events, handle) = start(&gfsk_config());

    session.configure(Setting::TxTimeoutUs(4_000_000)).unwrap();
    assert!(handle.commands().is_empty());

    session.submit(vec![1]).unwrap();
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));
    // 4 s at the 62.5 us base
    assert_eq!(
        handle.commands_with_opcode(OP_SET_TX),
        vec![vec![0x83, 0x01, 0xFA, 0x00]]
    );
    handle.complete_tx();
    events.recv_timeout(WAIT).unwrap();
}

#[test]
fn test_spurious_edge_is_ignored() {
    let (session, events, handle) = start(&gfsk_config());

    handle.spurious_edge(1);
    assert!(handle.wait_for_opcode(OP_GET_IRQ_STATUS, WAIT));
    assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
    assert!(handle.commands_with_opcode(OP_CLEAR_IRQ_STATUS).is_empty());
    assert_eq!(session.state().unwrap(), RadioState::Receiving);
}

#[test]
fn test_unhandled_bits_are_counted() {
    let (session, _events, handle) = start(&gfsk_config());

    handle.raise_irq(IrqFlags::CAD_DONE, 1);
    assert!(wait_until(|| session.stats().unwrap().unhandled_irqs == 1));
    assert!(handle.pending_irq().is_empty());
    assert_eq!(session.state().unwrap(), RadioState::Receiving);
}

#[test]
fn test_rssi_inst() {
    let (session, _events, handle) = start(&gfsk_config());
    handle.set_rssi_inst(160);
    assert_eq!(session.rssi_inst().unwrap(), -80);
}

#[test]
fn test_setup_rejects_wrong_circuit_mode() {
    let (transport, handle) = MockTransport::new();
    handle.set_reset_circuit_mode(CIRCUIT_MODE_RX);
    let err = Session::start(transport, &RadioConfig::default()).err().unwrap();
    assert!(matches!(
        err,
        Sx1280Error::UnexpectedChipState { status, .. } if status >> 5 == CIRCUIT_MODE_RX
    ));
}

#[test]
fn test_setup_times_out_on_stuck_busy() {
    let (transport, handle) = MockTransport::new();
    handle.set_busy_stuck(true);
    let config = RadioConfig {
        startup_timeout_us: 1000,
        ..RadioConfig::default()
    };
    let err = Session::start(transport, &config).err().unwrap();
    assert!(matches!(err, Sx1280Error::BusTimeout { .. }));
    assert!(handle.commands().is_empty());
}

#[test]
fn test_setup_with_single_dio_line() {
    let mut config = gfsk_config();
    config.host.dio_lines = vec![1];
    let (transport, handle) = MockTransport::new();
    let (session, events) = Session::start(transport, &config).unwrap();
    assert_eq!(handle.subscribers(1), 1);
    assert_eq!(handle.subscribers(2), 0);

    // DIO1 carries every bit, so this timeout is still seen
    session.submit(vec![3; 3]).unwrap();
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));
    handle.raise_irq(IrqFlags::RX_TX_TIMEOUT, 1);
    assert!(matches!(
        events.recv_timeout(WAIT).unwrap(),
        RadioEvent::TransmitDropped {
            reason: DropReason::Timeout,
            ..
        }
    ));
}

#[test]
fn test_shutdown_drops_frame_in_flight() {
    let (session, events, handle) = start(&gfsk_config());

    session.submit(vec![0x42; 5]).unwrap();
    assert!(handle.wait_for_opcode(OP_SET_TX, WAIT));
    session.shutdown().unwrap();

    let remaining: Vec<RadioEvent> = events.iter().collect();
    assert_eq!(
        remaining,
        vec![RadioEvent::TransmitDropped {
            len: 5,
            reason: DropReason::Shutdown
        }]
    );
    assert!(handle.is_asleep());
    assert_eq!(last_index_of(&handle, OP_SET_SLEEP), Some(handle.opcodes().len() - 1));
}

#[test]
fn test_drop_stops_interrupt_threads() {
    let (session, events, handle) = start(&gfsk_config());
    drop(session);
    assert!(handle.is_asleep());

    // Nothing services this edge any more
    handle.inject_rx(0x00, &[1], IrqFlags::empty());
    assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
}
