// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Mock hardware and protocol drivers shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;

use crunchy_core::scsi::CBW_SIGNATURE;
use crunchy_core::uf2;
use crunchy_core::{Device, Endpoint, EpState, Reboot, TargetMemory, UsbBus, UsbEvent};

pub const UID: [u8; 12] = [
    0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0x00, 0x11, 0x22, 0x33,
];

pub const TAG: u32 = 0xC0FF_EE01;

pub type TestDevice = Device<MockBus, MockMemory, NoopDelay>;

/// Scripted USB peripheral: events are queued by the test, packets and
/// endpoint-state writes are recorded for inspection.
pub struct MockBus {
    pub events: VecDeque<UsbEvent>,
    pub control_out: VecDeque<Vec<u8>>,
    pub bulk_out: VecDeque<Vec<u8>>,
    pub control_in: Vec<Vec<u8>>,
    pub bulk_in: Vec<Vec<u8>>,
    pub ep0_states: Vec<(EpState, EpState, bool)>,
    pub ep1_states: Vec<(EpState, EpState, bool)>,
    pub address: Option<u8>,
    pub suspended: bool,
    pub detached: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            control_out: VecDeque::new(),
            bulk_out: VecDeque::new(),
            control_in: Vec::new(),
            bulk_in: Vec::new(),
            ep0_states: Vec::new(),
            ep1_states: Vec::new(),
            address: None,
            suspended: false,
            detached: false,
        }
    }

    pub fn last_ep1_state(&self) -> (EpState, EpState, bool) {
        *self.ep1_states.last().expect("no EP1 state was set")
    }

    pub fn last_ep0_state(&self) -> (EpState, EpState, bool) {
        *self.ep0_states.last().expect("no EP0 state was set")
    }
}

impl UsbBus for MockBus {
    fn poll(&mut self) -> Option<UsbEvent> {
        self.events.pop_front()
    }

    fn read_packet(&mut self, ep: Endpoint, buf: &mut [u8]) -> usize {
        let queue = match ep {
            Endpoint::Control => &mut self.control_out,
            Endpoint::Bulk => &mut self.bulk_out,
        };
        match queue.pop_front() {
            Some(packet) => {
                let n = packet.len().min(buf.len());
                buf[..n].copy_from_slice(&packet[..n]);
                n
            }
            None => 0,
        }
    }

    fn write_packet(&mut self, ep: Endpoint, data: &[u8]) {
        match ep {
            Endpoint::Control => self.control_in.push(data.to_vec()),
            Endpoint::Bulk => self.bulk_in.push(data.to_vec()),
        }
    }

    fn set_ep0_state(&mut self, rx: EpState, tx: EpState, expect_status_out: bool) {
        self.ep0_states.push((rx, tx, expect_status_out));
    }

    fn set_ep1_state(&mut self, rx: EpState, tx: EpState, reset_toggles: bool) {
        self.ep1_states.push((rx, tx, reset_toggles));
    }

    fn set_address(&mut self, address: u8) {
        self.address = Some(address);
    }

    fn suspend(&mut self) {
        self.suspended = true;
    }

    fn resume(&mut self) {
        self.suspended = false;
    }

    fn detach(&mut self) {
        self.detached = true;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemOp {
    Unlock,
    Erase(u32),
    Program(u32, u32),
    Lock,
}

/// Records every flash/RAM operation in order.
pub struct MockMemory {
    pub ops: Vec<MemOp>,
    pub ram_writes: Vec<(u32, Vec<u8>)>,
}

impl MockMemory {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            ram_writes: Vec::new(),
        }
    }

    pub fn erased_pages(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                MemOp::Erase(addr) => Some(*addr),
                _ => None,
            })
            .collect()
    }
}

impl TargetMemory for MockMemory {
    fn unlock_flash(&mut self) {
        self.ops.push(MemOp::Unlock);
    }

    fn erase_page(&mut self, addr: u32) {
        self.ops.push(MemOp::Erase(addr));
    }

    fn program_word(&mut self, addr: u32, word: u32) {
        self.ops.push(MemOp::Program(addr, word));
    }

    fn lock_flash(&mut self) {
        self.ops.push(MemOp::Lock);
    }

    fn copy_to_ram(&mut self, addr: u32, data: &[u8]) {
        self.ram_writes.push((addr, data.to_vec()));
    }
}

pub struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

pub fn new_device() -> TestDevice {
    Device::new(MockBus::new(), MockMemory::new(), NoopDelay, UID)
}

/// A device that has been configured by the host (EP1 armed, MSC idle).
pub fn configured_device() -> TestDevice {
    let mut dev = new_device();
    send_setup(&mut dev, setup_packet(0x00, 9, 1, 0, 0));
    dev
}

pub fn setup_packet(request_type: u8, request: u8, value: u16, index: u16, length: u16) -> [u8; 8] {
    let mut packet = [0u8; 8];
    packet[0] = request_type;
    packet[1] = request;
    packet[2..4].copy_from_slice(&value.to_le_bytes());
    packet[4..6].copy_from_slice(&index.to_le_bytes());
    packet[6..8].copy_from_slice(&length.to_le_bytes());
    packet
}

pub fn send_setup(dev: &mut TestDevice, packet: [u8; 8]) {
    dev.bus_mut().control_out.push_back(packet.to_vec());
    dev.bus_mut().events.push_back(UsbEvent::Setup);
    assert!(dev.poll().is_none());
}

pub fn pulse_ep0_in(dev: &mut TestDevice) {
    dev.bus_mut().events.push_back(UsbEvent::Ep0In);
    assert!(dev.poll().is_none());
}

pub fn send_bulk_out(dev: &mut TestDevice, data: &[u8]) -> Option<Reboot> {
    dev.bus_mut().bulk_out.push_back(data.to_vec());
    dev.bus_mut().events.push_back(UsbEvent::Ep1Out);
    dev.poll()
}

pub fn pulse_bulk_in(dev: &mut TestDevice) -> Option<Reboot> {
    dev.bus_mut().events.push_back(UsbEvent::Ep1In);
    dev.poll()
}

/// Drain a full control IN transfer: keep feeding IN completions until the
/// engine arms the status stage (or gives up with a stall).
pub fn collect_control_in(dev: &mut TestDevice) -> Vec<u8> {
    let mut out = Vec::new();
    for _ in 0..100 {
        let packets: Vec<Vec<u8>> = dev.bus_mut().control_in.drain(..).collect();
        out.extend(packets.into_iter().flatten());
        match dev.bus_mut().ep0_states.last() {
            Some(&(_, _, true)) => return out,
            Some(&(EpState::Stall, EpState::Stall, _)) => return out,
            _ => {}
        }
        pulse_ep0_in(dev);
    }
    panic!("control transfer never finished");
}

pub fn cbw(tag: u32, data_transfer_length: u32, flags: u8, cb: &[u8]) -> Vec<u8> {
    let mut packet = vec![0u8; 31];
    packet[0..4].copy_from_slice(&CBW_SIGNATURE.to_le_bytes());
    packet[4..8].copy_from_slice(&tag.to_le_bytes());
    packet[8..12].copy_from_slice(&data_transfer_length.to_le_bytes());
    packet[12] = flags;
    packet[13] = 0;
    packet[14] = cb.len() as u8;
    packet[15..15 + cb.len()].copy_from_slice(cb);
    packet
}

pub fn read10_cbw(lba: u32, blocks: u16) -> Vec<u8> {
    let mut cb = [0u8; 10];
    cb[0] = 0x28;
    cb[2..6].copy_from_slice(&lba.to_be_bytes());
    cb[7..9].copy_from_slice(&blocks.to_be_bytes());
    cbw(TAG, blocks as u32 * 512, 0x80, &cb)
}

pub fn write10_cbw(lba: u32, blocks: u16) -> Vec<u8> {
    let mut cb = [0u8; 10];
    cb[0] = 0x2A;
    cb[2..6].copy_from_slice(&lba.to_be_bytes());
    cb[7..9].copy_from_slice(&blocks.to_be_bytes());
    cbw(TAG, blocks as u32 * 512, 0x00, &cb)
}

/// Build one 512-byte UF2 block.
pub fn uf2_block(target_addr: u32, block_no: u32, num_blocks: u32, family_id: u32) -> Vec<u8> {
    uf2_block_with_flags(
        target_addr,
        block_no,
        num_blocks,
        family_id,
        uf2::FLAG_FAMILY_ID_PRESENT,
    )
}

pub fn uf2_block_with_flags(
    target_addr: u32,
    block_no: u32,
    num_blocks: u32,
    family_id: u32,
    flags: u32,
) -> Vec<u8> {
    let mut block = vec![0u8; 512];
    block[0..4].copy_from_slice(&uf2::MAGIC_START0.to_le_bytes());
    block[4..8].copy_from_slice(&uf2::MAGIC_START1.to_le_bytes());
    block[8..12].copy_from_slice(&flags.to_le_bytes());
    block[12..16].copy_from_slice(&target_addr.to_le_bytes());
    block[16..20].copy_from_slice(&256u32.to_le_bytes());
    block[20..24].copy_from_slice(&block_no.to_le_bytes());
    block[24..28].copy_from_slice(&num_blocks.to_le_bytes());
    block[28..32].copy_from_slice(&family_id.to_le_bytes());
    // Payload: a marker per block so programmed words are tellable apart.
    for (i, byte) in block[32..288].iter_mut().enumerate() {
        *byte = (block_no as u8).wrapping_add(i as u8);
    }
    block[508..512].copy_from_slice(&uf2::MAGIC_END.to_le_bytes());
    block
}

/// Push one WRITE(10) carrying the given 512-byte blocks through the
/// device, fragment by fragment, and complete the CSW. Returns the reboot
/// request, if the transfer finished an image.
pub fn send_uf2_write(dev: &mut TestDevice, blocks: &[Vec<u8>]) -> Option<Reboot> {
    assert!(send_bulk_out(dev, &write10_cbw(2, blocks.len() as u16)).is_none());
    for block in blocks {
        for fragment in block.chunks(64) {
            assert!(send_bulk_out(dev, fragment).is_none());
        }
    }
    pulse_bulk_in(dev)
}
