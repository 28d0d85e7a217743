// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Mass-storage Bulk-Only Transport and the SCSI command interpreter.
//!
//! One command is in flight at a time. A CBW is only accepted in
//! [`BulkState::WantCbw`]; its data phase moves through the endpoint's
//! 64-byte buffer in 8 fragments per 512-byte block, and the CSW goes out
//! once the whole transfer is done. Command rejections stall the bulk
//! endpoints and park the failed CSW until the host clears the halt.

use embedded_hal::delay::DelayNs;
use zerocopy::IntoBytes;

use crate::bus::{Endpoint, EpState, TargetMemory, UsbBus};
use crate::config;
use crate::descriptors;
use crate::device::{Device, Reboot};
use crate::fat;
use crate::scsi::{self, CommandBlockWrapper, CommandStatusWrapper, Sense};

/// MSC session state, advanced by bulk endpoint completions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BulkState {
    /// Idle: bulk OUT armed for the next command block.
    WantCbw,
    /// Status wrapper loaded; once it is out, re-arm for the next CBW.
    SentCsw,
    /// Status wrapper for an eject or a completed UF2 transfer; reboot
    /// once it is out.
    SentCswThenReboot,
    /// A data-in reply is on the wire; the CSW follows it.
    SentDataIn,
    /// READ(10) in progress.
    SendingRead { lba: u32, fragment: u8, blocks_left: u16 },
    /// WRITE(10) in progress; `uf2_valid` caches the fragment-0 verdict for
    /// the block being received.
    ReceivingWrite { fragment: u8, uf2_valid: bool, blocks_left: u16 },
}

impl<B: UsbBus, M: TargetMemory, D: DelayNs> Device<B, M, D> {
    pub(crate) fn handle_bulk_out(&mut self) {
        match self.bulk {
            BulkState::WantCbw => self.handle_cbw(),
            BulkState::ReceivingWrite { .. } => self.handle_write_fragment(),
            _ => self.stall_bulk(),
        }
    }

    pub(crate) fn handle_bulk_in(&mut self) -> Option<Reboot> {
        match self.bulk {
            BulkState::SentCsw => {
                self.bus.set_ep1_state(EpState::Ack, EpState::Stall, false);
                self.bulk = BulkState::WantCbw;
            }
            BulkState::SentCswThenReboot => return Some(self.reboot_sequence()),
            BulkState::SentDataIn => self.send_csw(scsi::CSW_STATUS_OK),
            BulkState::SendingRead {
                lba,
                fragment,
                blocks_left,
            } => {
                if fragment < fat::FRAGMENTS_PER_SECTOR - 1 {
                    self.send_read_fragment(lba, fragment + 1);
                    self.bulk = BulkState::SendingRead {
                        lba,
                        fragment: fragment + 1,
                        blocks_left,
                    };
                } else if blocks_left <= 1 {
                    self.send_csw(scsi::CSW_STATUS_OK);
                } else {
                    self.send_read_fragment(lba + 1, 0);
                    self.bulk = BulkState::SendingRead {
                        lba: lba + 1,
                        fragment: 0,
                        blocks_left: blocks_left - 1,
                    };
                }
            }
            _ => self.stall_bulk(),
        }
        None
    }

    fn handle_cbw(&mut self) {
        let mut buf = [0u8; 64];
        let len = self.bus.read_packet(Endpoint::Bulk, &mut buf);
        let Some(cbw) = CommandBlockWrapper::parse(&buf[..len]) else {
            // Malformed CBWs are dropped; just re-arm for another attempt.
            self.bus.set_ep1_state(EpState::Ack, EpState::Stall, false);
            return;
        };
        self.tag = cbw.tag;

        match cbw.opcode() {
            scsi::TEST_UNIT_READY => self.send_csw(scsi::CSW_STATUS_OK),
            scsi::REQUEST_SENSE => self.request_sense(),
            scsi::INQUIRY => self.inquiry(&cbw),
            scsi::MODE_SENSE_6 => self.send_data_in(&scsi::MODE_SENSE_6_DATA),
            scsi::MODE_SENSE_10 => self.send_data_in(&scsi::MODE_SENSE_10_DATA),
            scsi::START_STOP_UNIT => self.start_stop(&cbw),
            scsi::READ_FORMAT_CAPACITIES => self.send_data_in(&scsi::FORMAT_CAPACITY_DATA),
            scsi::READ_CAPACITY_10 => self.send_data_in(&scsi::READ_CAPACITY_DATA),
            scsi::READ_10 => self.read_10(&cbw),
            scsi::WRITE_10 => self.write_10(&cbw),
            _ => self.reject_command(&cbw),
        }
    }

    /// Load a CSW carrying the current tag and arm it for transmission.
    pub(crate) fn send_csw(&mut self, status: u8) {
        let csw = CommandStatusWrapper::new(self.tag, status);
        self.bus.write_packet(Endpoint::Bulk, csw.as_bytes());
        self.bus.set_ep1_state(EpState::Stall, EpState::Ack, false);
        self.bulk = BulkState::SentCsw;
    }

    fn send_data_in(&mut self, data: &[u8]) {
        self.bus.write_packet(Endpoint::Bulk, data);
        self.bus.set_ep1_state(EpState::Stall, EpState::Ack, false);
        self.bulk = BulkState::SentDataIn;
    }

    /// Record sense data, stall both bulk directions and park a failed CSW;
    /// the host recovers via CLEAR_FEATURE.
    fn fail_command(&mut self, sense: Sense) {
        self.sense = sense;
        self.bulk = BulkState::SentCsw;
        self.stall_bulk();
    }

    pub(crate) fn stall_bulk(&mut self) {
        self.bus.set_ep1_state(EpState::Stall, EpState::Stall, false);
    }

    fn request_sense(&mut self) {
        let mut data = [0u8; 18];
        data[0] = 0x70; // current error, fixed format
        data[2] = self.sense.key;
        data[12] = self.sense.asc;
        self.sense = Sense::NONE;
        self.send_data_in(&data);
    }

    fn inquiry(&mut self, cbw: &CommandBlockWrapper) {
        // Only the standard inquiry page; EVPD requests are rejected.
        if cbw.cb[1] == 0 && cbw.cb[2] == 0 {
            self.send_data_in(&descriptors::INQUIRY_RESPONSE);
        } else {
            self.fail_command(Sense::INVALID_FIELD_IN_CDB);
        }
    }

    fn start_stop(&mut self, cbw: &CommandBlockWrapper) {
        // LoEj+Start == 0b10 is the host-side eject.
        let eject = cbw.cb[4] == 0x02;
        self.send_csw(scsi::CSW_STATUS_OK);
        if eject {
            self.bulk = BulkState::SentCswThenReboot;
        }
    }

    fn reject_command(&mut self, cbw: &CommandBlockWrapper) {
        self.sense = Sense::ILLEGAL_REQUEST;
        if cbw.data_transfer_length == 0 {
            self.send_csw(scsi::CSW_STATUS_FAILED);
        } else {
            self.bulk = BulkState::SentCsw;
            self.stall_bulk();
        }
    }

    fn range_is_valid(lba: u32, blocks: u32) -> bool {
        lba < config::DISK_SECTOR_COUNT
            && blocks <= config::DISK_SECTOR_COUNT
            && lba + blocks <= config::DISK_SECTOR_COUNT
    }

    fn read_10(&mut self, cbw: &CommandBlockWrapper) {
        let lba = cbw.lba();
        let blocks = cbw.transfer_blocks() as u32;
        if !Self::range_is_valid(lba, blocks) {
            return self.fail_command(Sense::INVALID_FIELD_IN_CDB);
        }
        if blocks == 0 {
            return self.send_csw(scsi::CSW_STATUS_OK);
        }
        self.send_read_fragment(lba, 0);
        self.bulk = BulkState::SendingRead {
            lba,
            fragment: 0,
            blocks_left: blocks as u16,
        };
    }

    fn send_read_fragment(&mut self, lba: u32, fragment: u8) {
        let chunk = fat::synthesize_fragment(lba, fragment);
        self.bus.write_packet(Endpoint::Bulk, &chunk);
        self.bus.set_ep1_state(EpState::Stall, EpState::Ack, false);
    }

    fn write_10(&mut self, cbw: &CommandBlockWrapper) {
        let blocks = cbw.transfer_blocks() as u32;
        if !Self::range_is_valid(cbw.lba(), blocks) {
            return self.fail_command(Sense::INVALID_FIELD_IN_CDB);
        }
        if blocks == 0 {
            return self.send_csw(scsi::CSW_STATUS_OK);
        }
        // The write LBA is irrelevant: the UF2 header names its own target.
        self.bus.set_ep1_state(EpState::Ack, EpState::Stall, false);
        self.bulk = BulkState::ReceivingWrite {
            fragment: 0,
            uf2_valid: false,
            blocks_left: blocks as u16,
        };
    }

    fn handle_write_fragment(&mut self) {
        let BulkState::ReceivingWrite {
            fragment,
            mut uf2_valid,
            blocks_left,
        } = self.bulk
        else {
            return;
        };

        let mut buf = [0u8; 64];
        self.bus.read_packet(Endpoint::Bulk, &mut buf);

        match fragment {
            0 => uf2_valid = self.writer.begin_sector(&buf),
            1..=4 => self.writer.accept_fragment(fragment, &buf),
            7 => {
                if uf2_valid {
                    self.writer.finish_sector(&buf, &mut self.mem);
                }
            }
            // Fragments 5 and 6 carry only padding.
            _ => {}
        }

        if fragment < fat::FRAGMENTS_PER_SECTOR - 1 {
            self.bus.set_ep1_state(EpState::Ack, EpState::Stall, false);
            self.bulk = BulkState::ReceivingWrite {
                fragment: fragment + 1,
                uf2_valid,
                blocks_left,
            };
        } else if blocks_left <= 1 {
            // Whole command received; success regardless of what was
            // actually committed.
            self.send_csw(scsi::CSW_STATUS_OK);
            if self.writer.transfer_complete() {
                self.bulk = BulkState::SentCswThenReboot;
            }
        } else {
            self.bus.set_ep1_state(EpState::Ack, EpState::Stall, false);
            self.bulk = BulkState::ReceivingWrite {
                fragment: 0,
                uf2_valid: false,
                blocks_left: blocks_left - 1,
            };
        }
    }
}
