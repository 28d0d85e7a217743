// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bulk-Only Transport framing and SCSI command data.
//!
//! The CBW/CSW layouts come from the USB Mass Storage Class Bulk-Only
//! Transport specification, section 5. Both are little-endian packed
//! structs; the command block itself (the CDB) is big-endian, so the LBA
//! and transfer-length accessors convert.

use zerocopy::{FromBytes, Immutable, IntoBytes};

pub const CBW_SIGNATURE: u32 = 0x4342_5355;
pub const CSW_SIGNATURE: u32 = 0x5342_5355;

/// A CBW is valid only at exactly this size.
pub const CBW_LEN: usize = 31;

pub const CSW_STATUS_OK: u8 = 0;
pub const CSW_STATUS_FAILED: u8 = 1;

// Operation codes interpreted by the bootloader. Everything else is
// answered with a failed CSW and ILLEGAL REQUEST sense.
pub const TEST_UNIT_READY: u8 = 0x00;
pub const REQUEST_SENSE: u8 = 0x03;
pub const INQUIRY: u8 = 0x12;
pub const MODE_SENSE_6: u8 = 0x1A;
pub const START_STOP_UNIT: u8 = 0x1B;
pub const READ_FORMAT_CAPACITIES: u8 = 0x23;
pub const READ_CAPACITY_10: u8 = 0x25;
pub const READ_10: u8 = 0x28;
pub const WRITE_10: u8 = 0x2A;
pub const MODE_SENSE_10: u8 = 0x5A;

/// Command Block Wrapper.
#[repr(C, packed)]
#[derive(IntoBytes, FromBytes, Immutable)]
pub struct CommandBlockWrapper {
    pub signature: u32,
    /// Echoed back in the CSW to pair status with command.
    pub tag: u32,
    pub data_transfer_length: u32,
    pub flags: u8,
    pub lun: u8,
    pub cb_length: u8,
    /// The command descriptor block.
    pub cb: [u8; 16],
}

impl CommandBlockWrapper {
    /// Parse a bulk OUT packet as a CBW. Anything that is not exactly 31
    /// bytes with the right signature is rejected.
    pub fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() != CBW_LEN {
            return None;
        }
        let cbw = Self::read_from_bytes(packet).ok()?;
        if cbw.signature != CBW_SIGNATURE {
            return None;
        }
        Some(cbw)
    }

    pub fn opcode(&self) -> u8 {
        self.cb[0]
    }

    /// Logical block address of a READ(10)/WRITE(10), big-endian in the CDB.
    pub fn lba(&self) -> u32 {
        u32::from_be_bytes([self.cb[2], self.cb[3], self.cb[4], self.cb[5]])
    }

    /// Transfer length in blocks of a READ(10)/WRITE(10).
    pub fn transfer_blocks(&self) -> u16 {
        u16::from_be_bytes([self.cb[7], self.cb[8]])
    }
}

/// Command Status Wrapper. The residue field is always reported as zero.
#[repr(C, packed)]
#[derive(IntoBytes, Immutable)]
pub struct CommandStatusWrapper {
    pub signature: u32,
    pub tag: u32,
    pub data_residue: u32,
    pub status: u8,
}

impl CommandStatusWrapper {
    pub fn new(tag: u32, status: u8) -> Self {
        Self {
            signature: CSW_SIGNATURE,
            tag,
            data_residue: 0,
            status,
        }
    }
}

/// Most recently recorded sense data, served by REQUEST SENSE and then
/// cleared.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Sense {
    pub key: u8,
    pub asc: u8,
}

impl Sense {
    pub const NONE: Self = Self { key: 0, asc: 0 };
    pub const ILLEGAL_REQUEST: Self = Self { key: 0x05, asc: 0 };
    pub const INVALID_FIELD_IN_CDB: Self = Self { key: 0x05, asc: 0x24 };
}

/// READ FORMAT CAPACITIES: one descriptor, formatted media, 0x4000 sectors
/// of 512 bytes.
pub const FORMAT_CAPACITY_DATA: [u8; 12] = [
    0, 0, 0, 8, // capacity list header
    0x00, 0x00, 0x40, 0x00, // number of blocks
    0x02, // formatted media
    0x00, 0x02, 0x00, // block length
];

/// READ CAPACITY(10): last LBA 0x3FFF, 512-byte blocks.
pub const READ_CAPACITY_DATA: [u8; 8] = [
    0x00, 0x00, 0x3F, 0xFF, // last logical block address
    0x00, 0x00, 0x02, 0x00, // block length
];

/// MODE SENSE(6): no pages, not write protected.
pub const MODE_SENSE_6_DATA: [u8; 4] = [0x03, 0x00, 0x00, 0x00];

/// MODE SENSE(10): header only.
pub const MODE_SENSE_10_DATA: [u8; 8] = [0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
