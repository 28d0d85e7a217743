// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Endpoint-0 enumeration tests: descriptor transmission, truncation,
//! address staging and configuration handling.

mod common;

use common::*;
use crunchy_core::control::ControlTransfer;
use crunchy_core::msc::BulkState;
use crunchy_core::{descriptors, EpState, UsbEvent};

// =============================================================================
// GET_DESCRIPTOR
// =============================================================================

#[test]
fn test_device_descriptor_full_length() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0100, 0, 18));
    let reply = collect_control_in(&mut dev);
    assert_eq!(reply, descriptors::DEVICE);
}

#[test]
fn test_device_descriptor_larger_wlength_stops_at_descriptor_end() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0100, 0, 64));
    let reply = collect_control_in(&mut dev);
    assert_eq!(reply, descriptors::DEVICE);
}

#[test]
fn test_device_descriptor_truncated_replies_are_strict_prefixes() {
    for w_length in 1..=18u16 {
        let mut dev = new_device();
        send_setup(&mut dev, setup_packet(0x80, 6, 0x0100, 0, w_length));
        let reply = collect_control_in(&mut dev);
        assert_eq!(
            reply,
            &descriptors::DEVICE[..w_length as usize],
            "wLength = {}",
            w_length
        );
    }
}

#[test]
fn test_configuration_descriptor_truncated_to_wlength() {
    // Hosts first ask for the 9-byte header, then the full thing.
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0200, 0, 9));
    assert_eq!(collect_control_in(&mut dev), &descriptors::CONFIGURATION[..9]);

    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0200, 0, 32));
    assert_eq!(collect_control_in(&mut dev), descriptors::CONFIGURATION);
}

#[test]
fn test_descriptor_first_packet_is_at_most_eight_bytes() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0100, 0, 18));
    assert_eq!(dev.bus_mut().control_in.len(), 1);
    assert_eq!(dev.bus_mut().control_in[0], &descriptors::DEVICE[..8]);
}

#[test]
fn test_langid_descriptor() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0300, 0, 255));
    let reply = collect_control_in(&mut dev);
    assert_eq!(reply, descriptors::LANGIDS);
}

#[test]
fn test_string_descriptors() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0301, 0, 255));
    assert_eq!(collect_control_in(&mut dev), descriptors::STRING_MANUFACTURER);

    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0302, 0, 255));
    assert_eq!(collect_control_in(&mut dev), descriptors::STRING_PRODUCT);
}

#[test]
fn test_unknown_descriptor_stalls() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0600, 0, 10));
    assert_eq!(
        dev.bus_mut().last_ep0_state(),
        (EpState::Stall, EpState::Stall, false)
    );
    assert!(dev.bus_mut().control_in.is_empty());
}

// =============================================================================
// Serial-number string
// =============================================================================

fn expected_serial() -> Vec<u8> {
    let mut expected = vec![descriptors::SERIAL_DESCRIPTOR_LEN, 3];
    for byte in UID {
        for c in [b"0123456789ABCDEF"[(byte >> 4) as usize], b"0123456789ABCDEF"[(byte & 0xF) as usize]] {
            expected.push(c);
            expected.push(0);
        }
    }
    expected
}

#[test]
fn test_serial_string_renders_unique_id_as_hex() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0303, 0, 255));
    let reply = collect_control_in(&mut dev);
    assert_eq!(reply.len(), 50);
    assert_eq!(reply, expected_serial());
}

#[test]
fn test_serial_string_truncated_is_a_prefix() {
    let expected = expected_serial();
    for w_length in [2u16, 7, 8, 9, 16, 49, 50] {
        let mut dev = new_device();
        send_setup(&mut dev, setup_packet(0x80, 6, 0x0303, 0, w_length));
        let reply = collect_control_in(&mut dev);
        assert_eq!(
            reply,
            &expected[..w_length as usize],
            "wLength = {}",
            w_length
        );
    }
}

// =============================================================================
// SET_ADDRESS
// =============================================================================

#[test]
fn test_set_address_is_applied_after_status_stage() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x00, 5, 0x17, 0, 0));

    // Address must not change before the handshake goes out.
    assert_eq!(dev.bus_mut().address, None);
    assert_eq!(dev.control_state(), ControlTransfer::SettingAddress(0x17));

    pulse_ep0_in(&mut dev);
    assert_eq!(dev.bus_mut().address, Some(0x17));
    assert_eq!(dev.control_state(), ControlTransfer::Idle);
}

// =============================================================================
// GET_STATUS / GET_INTERFACE / GET_CONFIGURATION
// =============================================================================

#[test]
fn test_get_status_returns_two_zero_bytes() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 0, 0, 0, 2));
    assert_eq!(collect_control_in(&mut dev), [0, 0]);
}

#[test]
fn test_get_interface_returns_zero() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x81, 10, 0, 0, 1));
    assert_eq!(collect_control_in(&mut dev), [0]);
}

#[test]
fn test_get_configuration_tracks_set_configuration() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x80, 8, 0, 0, 1));
    assert_eq!(collect_control_in(&mut dev), [0]);

    send_setup(&mut dev, setup_packet(0x00, 9, 1, 0, 0));
    send_setup(&mut dev, setup_packet(0x80, 8, 0, 0, 1));
    assert_eq!(collect_control_in(&mut dev), [1]);
}

// =============================================================================
// SET_CONFIGURATION
// =============================================================================

#[test]
fn test_set_configuration_arms_bulk_endpoint_with_fresh_toggles() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x00, 9, 1, 0, 0));
    assert_eq!(
        dev.bus_mut().last_ep1_state(),
        (EpState::Ack, EpState::Stall, true)
    );
    assert_eq!(dev.bulk_state(), BulkState::WantCbw);
}

#[test]
fn test_set_configuration_zero_disables_bulk_endpoint() {
    let mut dev = configured_device();
    send_setup(&mut dev, setup_packet(0x00, 9, 0, 0, 0));
    assert_eq!(
        dev.bus_mut().last_ep1_state(),
        (EpState::Disabled, EpState::Disabled, false)
    );
}

#[test]
fn test_set_configuration_invalid_value_stalls() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x00, 9, 2, 0, 0));
    assert_eq!(
        dev.bus_mut().last_ep0_state(),
        (EpState::Stall, EpState::Stall, false)
    );
}

#[test]
fn test_unknown_request_stalls() {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x21, 0xFF, 0, 0, 0));
    assert_eq!(
        dev.bus_mut().last_ep0_state(),
        (EpState::Stall, EpState::Stall, false)
    );
}

// =============================================================================
// Bus reset
// =============================================================================

#[test]
fn test_bus_reset_cancels_everything() {
    let mut dev = configured_device();
    // Leave a descriptor transfer half-done.
    send_setup(&mut dev, setup_packet(0x80, 6, 0x0100, 0, 18));

    dev.bus_mut().events.push_back(UsbEvent::Reset);
    assert!(dev.poll().is_none());

    assert_eq!(dev.control_state(), ControlTransfer::Idle);
    assert_eq!(dev.bulk_state(), BulkState::WantCbw);
    assert_eq!(dev.bus_mut().address, Some(0));
    assert_eq!(
        dev.bus_mut().last_ep0_state(),
        (EpState::Stall, EpState::Stall, false)
    );
}

// =============================================================================
// Suspend / wakeup
// =============================================================================

#[test]
fn test_suspend_and_wakeup_are_forwarded() {
    let mut dev = new_device();
    dev.bus_mut().events.push_back(UsbEvent::Suspend);
    assert!(dev.poll().is_none());
    assert!(dev.bus_mut().suspended);

    dev.bus_mut().events.push_back(UsbEvent::Wakeup);
    assert!(dev.poll().is_none());
    assert!(!dev.bus_mut().suspended);
}
