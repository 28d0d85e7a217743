// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! USB descriptor tables and the SCSI INQUIRY data block.
//!
//! Everything here is `const`; only the serial-number string is synthesized
//! at request time, from the factory-programmed unique ID.

use utf16_lit::utf16;

use crate::config;

/// Device descriptor: full-speed device with an 8-byte control endpoint.
/// Class/subclass/protocol are zero; the mass-storage identity lives on the
/// interface.
pub const DEVICE: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (DEVICE)
    0x00, 0x02, // bcdUSB 2.00
    0,    // bDeviceClass
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    8,    // bMaxPacketSize0
    (config::USB_VID & 0xff) as u8,
    (config::USB_VID >> 8) as u8,
    (config::USB_PID & 0xff) as u8,
    (config::USB_PID >> 8) as u8,
    0x00, 0x00, // bcdDevice
    1,    // iManufacturer
    2,    // iProduct
    3,    // iSerialNumber
    1,    // bNumConfigurations
];

/// Configuration descriptor: one interface, mass storage (SFF-8070i over
/// Bulk-Only Transport), a 64-byte bulk endpoint in each direction.
pub const CONFIGURATION: [u8; 32] = [
    9,    // bLength
    2,    // bDescriptorType (CONFIGURATION)
    32, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    250,  // bMaxPower (500 mA)

    9,    // bLength
    4,    // bDescriptorType (INTERFACE)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    2,    // bNumEndpoints
    0x08, // bInterfaceClass (mass storage)
    0x05, // bInterfaceSubClass (SFF-8070i)
    0x50, // bInterfaceProtocol (bulk-only)
    0,    // iInterface

    7,    // bLength
    5,    // bDescriptorType (ENDPOINT)
    0x81, // bEndpointAddress (EP1 IN)
    2,    // bmAttributes (bulk)
    64, 0, // wMaxPacketSize
    0,    // bInterval

    7,    // bLength
    5,    // bDescriptorType (ENDPOINT)
    0x01, // bEndpointAddress (EP1 OUT)
    2,    // bmAttributes (bulk)
    64, 0, // wMaxPacketSize
    0,    // bInterval
];

/// String descriptor zero: en-US only.
pub const LANGIDS: [u8; 4] = [4, 3, 0x09, 0x04];

/// Build a string descriptor with its length/type prefix from UTF-16 units.
const fn string_descriptor<const N: usize>(units: &[u16]) -> [u8; N] {
    assert!(N == 2 + units.len() * 2);
    let mut out = [0u8; N];
    out[0] = N as u8;
    out[1] = 3;
    let mut i = 0;
    while i < units.len() {
        out[2 + i * 2] = units[i] as u8;
        out[3 + i * 2] = (units[i] >> 8) as u8;
        i += 1;
    }
    out
}

pub const STRING_MANUFACTURER: [u8; 10] = string_descriptor(&utf16!("ADNT"));
pub const STRING_PRODUCT: [u8; 34] = string_descriptor(&utf16!("Crunchy UF2 Boot"));

/// The serial-number string renders the 12 unique-ID bytes as 24 hex
/// characters, high nibble first. It is generated packet by packet rather
/// than stored.
pub const SERIAL_HEX_CHARS: u16 = 24;
pub const SERIAL_DESCRIPTOR_LEN: u8 = 2 + 2 * SERIAL_HEX_CHARS as u8;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Hex character `index` (0..24) of the unique-ID rendering.
pub fn serial_hex_char(uid: &[u8; 12], index: u16) -> u8 {
    let byte = uid[(index / 2) as usize];
    let nibble = if index % 2 == 0 { byte >> 4 } else { byte & 0xf };
    HEX[nibble as usize]
}

/// SCSI INQUIRY response: removable direct-access device, vendor and
/// product strings padded to the fixed field widths.
pub const INQUIRY_RESPONSE: [u8; 36] = [
    0x00, // direct-access block device
    0x80, // removable
    0x04, // SPC-2
    0x02, // response data format
    0x1F, // additional length
    0x00, 0x00, 0x00,
    b'A', b'D', b'N', b'T', b' ', b' ', b' ', b' ',
    b'C', b'r', b'u', b'n', b'c', b'h', b'y', b' ',
    b'U', b'F', b'2', b' ', b'B', b'o', b'o', b't',
    b'0', b'.', b'1', b' ',
];
