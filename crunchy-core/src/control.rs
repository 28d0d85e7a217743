// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Endpoint-0 control transfer engine.
//!
//! Replies are bounded by the 8-byte control endpoint buffer, so every
//! descriptor goes out in up to 8-byte slices. The progress of a
//! multi-packet reply is the *only* state carried between polls, held in
//! [`ControlTransfer`].

use embedded_hal::delay::DelayNs;

use crate::bus::{Endpoint, EpState, TargetMemory, UsbBus};
use crate::descriptors;
use crate::device::Device;
use crate::msc::BulkState;
use crate::scsi::{self, Sense};

// Standard request codes.
const GET_STATUS: u8 = 0;
const CLEAR_FEATURE: u8 = 1;
const SET_ADDRESS: u8 = 5;
const GET_DESCRIPTOR: u8 = 6;
const GET_CONFIGURATION: u8 = 8;
const SET_CONFIGURATION: u8 = 9;
const GET_INTERFACE: u8 = 10;

/// Decoded SETUP packet.
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    pub fn parse(buf: &[u8; 8]) -> Self {
        Self {
            request_type: buf[0],
            request: buf[1],
            value: u16::from_le_bytes([buf[2], buf[3]]),
            index: u16::from_le_bytes([buf[4], buf[5]]),
            length: u16::from_le_bytes([buf[6], buf[7]]),
        }
    }
}

/// Which descriptor a multi-packet transmission reads from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DescriptorSource {
    Device,
    Configuration,
    Manufacturer,
    Product,
}

impl DescriptorSource {
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Self::Device => &descriptors::DEVICE,
            Self::Configuration => &descriptors::CONFIGURATION,
            Self::Manufacturer => &descriptors::STRING_MANUFACTURER,
            Self::Product => &descriptors::STRING_PRODUCT,
        }
    }
}

/// In-progress control transfer. Created by a SETUP packet, advanced on
/// each endpoint-0 completion, destroyed when the status stage runs or the
/// bus resets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ControlTransfer {
    Idle,
    /// SET_ADDRESS is staged here and applied only once its status stage
    /// has completed.
    SettingAddress(u8),
    /// Descriptor reply in flight: `pos` is the next byte offset into the
    /// source, `remaining` what the host still expects.
    SendingDescriptor {
        source: DescriptorSource,
        pos: u16,
        remaining: u16,
    },
    /// Serial-number string reply; `pos` counts hex characters already sent.
    SendingSerial { pos: u16, remaining: u16 },
    /// Single-packet reply (or status ZLP) loaded; nothing left to feed.
    AckPending,
}

impl<B: UsbBus, M: TargetMemory, D: DelayNs> Device<B, M, D> {
    pub(crate) fn handle_setup(&mut self) {
        let mut buf = [0u8; 8];
        self.bus.read_packet(Endpoint::Control, &mut buf);
        let setup = SetupPacket::parse(&buf);

        match (setup.request_type, setup.request) {
            (0x80, GET_STATUS) | (0x81, GET_STATUS) => self.simple_reply(&[0, 0], setup.length),
            (0x02, CLEAR_FEATURE) => self.clear_endpoint_halt(setup.index),
            (0x00, SET_ADDRESS) => {
                self.control = ControlTransfer::SettingAddress(setup.value as u8);
                self.bus.write_packet(Endpoint::Control, &[]);
                self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
            }
            (0x80, GET_DESCRIPTOR) => self.get_descriptor(setup.value, setup.length),
            (0x80, GET_CONFIGURATION) => {
                let config = self.active_config;
                self.simple_reply(&[config], setup.length);
            }
            (0x00, SET_CONFIGURATION) => self.set_configuration(setup.value),
            (0x81, GET_INTERFACE) => self.simple_reply(&[0], setup.length),
            _ => self.protocol_stall(),
        }
    }

    /// IN transmission on endpoint 0 completed: feed the next packet of
    /// whatever reply is in progress, or run the deferred action.
    pub(crate) fn handle_ep0_in(&mut self) {
        match self.control {
            ControlTransfer::Idle => {}
            ControlTransfer::SettingAddress(addr) => {
                // Status stage done; the address change is now legal.
                self.bus.set_address(addr);
                self.control = ControlTransfer::Idle;
                self.protocol_stall();
            }
            ControlTransfer::SendingDescriptor {
                source,
                pos,
                remaining,
            } => {
                if remaining == 0 {
                    self.arm_status_out();
                } else {
                    self.send_descriptor_chunk(source, pos, remaining);
                }
            }
            ControlTransfer::SendingSerial { pos, remaining } => {
                if remaining == 0 {
                    self.arm_status_out();
                } else {
                    self.send_serial_chunk(pos, remaining);
                }
            }
            ControlTransfer::AckPending => self.arm_status_out(),
        }
    }

    /// OUT on endpoint 0: the status stage of an IN transfer. Back to
    /// stall-everything; only SETUP gets through.
    pub(crate) fn handle_ep0_out(&mut self) {
        self.control = ControlTransfer::Idle;
        self.protocol_stall();
    }

    pub(crate) fn protocol_stall(&mut self) {
        self.bus.set_ep0_state(EpState::Stall, EpState::Stall, false);
    }

    /// Reply that fits a single packet, truncated to `wLength`.
    fn simple_reply(&mut self, data: &[u8], w_length: u16) {
        let n = data.len().min(w_length as usize);
        self.bus.write_packet(Endpoint::Control, &data[..n]);
        self.control = ControlTransfer::AckPending;
        self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
    }

    /// Accept the zero-length status OUT, stall further IN.
    fn arm_status_out(&mut self) {
        self.bus.set_ep0_state(EpState::Ack, EpState::Stall, true);
    }

    fn get_descriptor(&mut self, value: u16, length: u16) {
        let source = match value {
            0x0100 => DescriptorSource::Device,
            0x0200 => DescriptorSource::Configuration,
            0x0301 => DescriptorSource::Manufacturer,
            0x0302 => DescriptorSource::Product,
            0x0300 => return self.simple_reply(&descriptors::LANGIDS, length),
            0x0303 => return self.start_serial(length),
            _ => return self.protocol_stall(),
        };

        let bytes = source.bytes();
        let first = bytes.len().min(8).min(length as usize);
        self.bus.write_packet(Endpoint::Control, &bytes[..first]);
        self.control = if length <= 8 {
            ControlTransfer::SendingDescriptor {
                source,
                pos: 0,
                remaining: 0,
            }
        } else {
            ControlTransfer::SendingDescriptor {
                source,
                pos: 8,
                remaining: length - 8,
            }
        };
        self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
    }

    fn send_descriptor_chunk(&mut self, source: DescriptorSource, pos: u16, remaining: u16) {
        let bytes = source.bytes();
        let start = pos as usize;
        let chunk = (remaining as usize)
            .min(8)
            .min(bytes.len().saturating_sub(start));
        self.bus
            .write_packet(Endpoint::Control, &bytes[start..start + chunk]);
        self.control = if chunk < 8 {
            ControlTransfer::SendingDescriptor {
                source,
                pos,
                remaining: 0,
            }
        } else {
            ControlTransfer::SendingDescriptor {
                source,
                pos: pos + 8,
                remaining: remaining - 8,
            }
        };
        self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
    }

    fn start_serial(&mut self, length: u16) {
        let total = (descriptors::SERIAL_DESCRIPTOR_LEN as u16).min(length);
        let mut packet = [0u8; 8];
        packet[0] = descriptors::SERIAL_DESCRIPTOR_LEN;
        packet[1] = 3;
        // Three characters fill out the first 8-byte packet.
        for i in 0..3u16 {
            packet[2 + 2 * i as usize] = descriptors::serial_hex_char(&self.uid, i);
        }
        self.bus
            .write_packet(Endpoint::Control, &packet[..(total as usize).min(8)]);
        self.control = if total <= 8 {
            ControlTransfer::SendingSerial {
                pos: 0,
                remaining: 0,
            }
        } else {
            ControlTransfer::SendingSerial {
                pos: 3,
                remaining: total - 8,
            }
        };
        self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
    }

    fn send_serial_chunk(&mut self, pos: u16, remaining: u16) {
        let chunk = (remaining as usize).min(8);
        let mut packet = [0u8; 8];
        for i in 0..chunk.div_ceil(2) {
            let index = pos + i as u16;
            if index < descriptors::SERIAL_HEX_CHARS {
                packet[2 * i] = descriptors::serial_hex_char(&self.uid, index);
            }
        }
        self.bus.write_packet(Endpoint::Control, &packet[..chunk]);
        self.control = if chunk < 8 {
            ControlTransfer::SendingSerial { pos, remaining: 0 }
        } else {
            ControlTransfer::SendingSerial {
                pos: pos + 4,
                remaining: remaining - 8,
            }
        };
        self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
    }

    /// CLEAR_FEATURE(ENDPOINT_HALT) doubles as the transport recovery hook:
    /// clearing the bulk IN halt answers the stalled command with a failed
    /// CSW, clearing the bulk OUT halt re-arms for a fresh CBW.
    fn clear_endpoint_halt(&mut self, index: u16) {
        match index {
            0x81 => {
                self.send_csw(scsi::CSW_STATUS_FAILED);
                self.bus.write_packet(Endpoint::Control, &[]);
                self.control = ControlTransfer::AckPending;
                self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
            }
            0x01 => {
                self.bus.set_ep1_state(EpState::Ack, EpState::Stall, false);
                self.bulk = BulkState::WantCbw;
                self.bus.write_packet(Endpoint::Control, &[]);
                self.control = ControlTransfer::AckPending;
                self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
            }
            _ => self.protocol_stall(),
        }
    }

    fn set_configuration(&mut self, value: u16) {
        match value {
            0 | 1 => {
                self.active_config = value as u8;
                self.bus.write_packet(Endpoint::Control, &[]);
                self.control = ControlTransfer::AckPending;
                self.bus.set_ep0_state(EpState::Stall, EpState::Ack, false);
                if value == 1 {
                    // Activate: bulk OUT armed for a CBW, fresh toggles,
                    // fresh session.
                    self.bus.set_ep1_state(EpState::Ack, EpState::Stall, true);
                    self.bulk = BulkState::WantCbw;
                    self.sense = Sense::NONE;
                } else {
                    self.bus
                        .set_ep1_state(EpState::Disabled, EpState::Disabled, false);
                }
            }
            _ => self.protocol_stall(),
        }
    }
}
