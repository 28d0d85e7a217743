// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! `UsbBus` over the CH32V203 USBD device peripheral.
//!
//! The peripheral exposes a 16-bit packet memory (PMA) that the CPU sees as
//! 16-bit halfwords on 32-bit strides; that quirk, the buffer table and the
//! toggle-bit endpoint register protocol are all confined to this module.
//!
//! Packet memory layout (PMA-local byte addresses):
//!
//! ```text
//! 0x00  buffer descriptor table (two endpoints)
//! 0x10  EP0 OUT (8 bytes)
//! 0x18  EP0 IN  (8 bytes)
//! 0x20  EP1 OUT (64 bytes)
//! 0x60  EP1 IN  (64 bytes)
//! ```

use crunchy_core::{Endpoint, EpState, UsbBus, UsbEvent};

use crate::peripherals::{APB1_USBDEN, EXTEND_CTR, EXTEND_USBD_PU_EN, RCC_APB1PCENR};

const USBD_BASE: u32 = 0x4000_5C00;
const USBD_CNTR: *mut u16 = (USBD_BASE + 0x40) as *mut u16;
const USBD_ISTR: *mut u16 = (USBD_BASE + 0x44) as *mut u16;
const USBD_DADDR: *mut u16 = (USBD_BASE + 0x4C) as *mut u16;
const USBD_BTABLE: *mut u16 = (USBD_BASE + 0x50) as *mut u16;

const PMA_BASE: u32 = 0x4000_6000;

// ISTR bits.
const ISTR_RESET: u16 = 1 << 10;
const ISTR_SUSP: u16 = 1 << 11;
const ISTR_WKUP: u16 = 1 << 12;
const ISTR_CTR: u16 = 1 << 15;

// CNTR bits.
const CNTR_FRES: u16 = 1 << 0;
const CNTR_PDWN: u16 = 1 << 1;
const CNTR_LPMODE: u16 = 1 << 2;
const CNTR_FSUSP: u16 = 1 << 3;

// EPR bits.
const EPR_CTR_RX: u16 = 1 << 15;
const EPR_SETUP: u16 = 1 << 11;
const EPR_KIND_STATUS_OUT: u16 = 1 << 8;
const EPR_CTR_TX: u16 = 1 << 7;
/// EA, EP_TYPE and EP_KIND: the bits a plain write must preserve.
const EPR_KEEP: u16 = 0x070F;
/// STAT_RX/STAT_TX toggle mask.
const EPR_STATS: u16 = 0x3030;
/// Toggle mask including both DTOG bits.
const EPR_STATS_DTOGS: u16 = 0x7070;

const EP_TYPE_BULK: u16 = 0b00;
const EP_TYPE_CONTROL: u16 = 0b01;

// PMA-local byte addresses.
const EP0_OUT_BUF: u32 = 0x10;
const EP0_IN_BUF: u32 = 0x18;
const EP1_OUT_BUF: u32 = 0x20;
const EP1_IN_BUF: u32 = 0x60;

fn epr(ep: u8) -> *mut u16 {
    (USBD_BASE + 4 * ep as u32) as *mut u16
}

/// Read a PMA halfword at a PMA-local byte offset.
fn pma_read(offset: u32) -> u16 {
    unsafe { ((PMA_BASE + 2 * offset) as *const u32).read_volatile() as u16 }
}

fn pma_write(offset: u32, value: u16) {
    unsafe { ((PMA_BASE + 2 * offset) as *mut u32).write_volatile(value as u32) }
}

/// Buffer descriptor fields for endpoint `ep`.
fn desc_count_tx(ep: u8) -> u32 {
    8 * ep as u32 + 2
}

fn desc_count_rx(ep: u8) -> u32 {
    8 * ep as u32 + 6
}

pub struct Usbd {
    _private: (),
}

impl Usbd {
    /// Configure the buffer table, release the peripheral and attach the
    /// pull-up.
    pub fn init() -> Self {
        unsafe {
            // Hold the peripheral in reset while the table is written.
            USBD_CNTR.write_volatile(CNTR_FRES);

            USBD_BTABLE.write_volatile(0);

            // EP0: 8-byte buffers (4 rx blocks of 2 bytes).
            pma_write(0, EP0_IN_BUF as u16);
            pma_write(4, EP0_OUT_BUF as u16);
            pma_write(6, 4 << 10);
            // EP1: 64-byte buffers (2 rx blocks of 32 bytes).
            pma_write(8, EP1_IN_BUF as u16);
            pma_write(12, EP1_OUT_BUF as u16);
            pma_write(14, (1 << 15) | (2 << 10));

            USBD_CNTR.write_volatile(0);
            EXTEND_CTR.write_volatile(EXTEND_CTR.read_volatile() | EXTEND_USBD_PU_EN);
        }
        Self { _private: () }
    }

    fn set_ep_mode(
        &mut self,
        ep: u8,
        ep_type: u16,
        rx: EpState,
        tx: EpState,
        kind: u16,
        clear_toggles: bool,
    ) {
        let reg = epr(ep);
        let val = unsafe { reg.read_volatile() };
        let mask = if clear_toggles { EPR_STATS_DTOGS } else { EPR_STATS };
        let want = (stat_bits(rx) << 12) | (stat_bits(tx) << 4);
        // Toggle bits flip where (current ^ wanted) is 1; CTR bits written
        // as zero are cleared, which is fine on every path that gets here.
        let value = ep as u16 | (ep_type << 9) | kind | ((val & mask) ^ want);
        unsafe { reg.write_volatile(value) };
    }

    /// Decode and acknowledge one endpoint completion.
    fn take_endpoint_event(&mut self, ep: u8) -> Option<UsbEvent> {
        let reg = epr(ep);
        let val = unsafe { reg.read_volatile() };
        let keep = val & EPR_KEEP;

        if val & EPR_CTR_RX != 0 {
            // Clear CTR_RX, leave CTR_TX alone (writing 1 is a no-op).
            unsafe { reg.write_volatile(keep | EPR_CTR_TX) };
            Some(match (ep, val & EPR_SETUP != 0) {
                (0, true) => UsbEvent::Setup,
                (0, false) => UsbEvent::Ep0Out,
                _ => UsbEvent::Ep1Out,
            })
        } else if val & EPR_CTR_TX != 0 {
            unsafe { reg.write_volatile(keep | EPR_CTR_RX) };
            Some(if ep == 0 { UsbEvent::Ep0In } else { UsbEvent::Ep1In })
        } else {
            None
        }
    }
}

fn stat_bits(state: EpState) -> u16 {
    match state {
        EpState::Disabled => 0b00,
        EpState::Stall => 0b01,
        EpState::Nak => 0b10,
        EpState::Ack => 0b11,
    }
}

impl UsbBus for Usbd {
    fn poll(&mut self) -> Option<UsbEvent> {
        let istr = unsafe { USBD_ISTR.read_volatile() };
        let event = if istr & ISTR_RESET != 0 {
            unsafe { USBD_CNTR.write_volatile(0) };
            Some(UsbEvent::Reset)
        } else if istr & ISTR_SUSP != 0 {
            Some(UsbEvent::Suspend)
        } else if istr & ISTR_WKUP != 0 {
            Some(UsbEvent::Wakeup)
        } else if istr & ISTR_CTR != 0 {
            self.take_endpoint_event((istr & 0xF) as u8)
        } else {
            None
        };
        unsafe { USBD_ISTR.write_volatile(0) };
        event
    }

    fn read_packet(&mut self, ep: Endpoint, buf: &mut [u8]) -> usize {
        let (ep_idx, buf_addr, cap) = match ep {
            Endpoint::Control => (0u8, EP0_OUT_BUF, 8usize),
            Endpoint::Bulk => (1u8, EP1_OUT_BUF, 64usize),
        };
        let count = (pma_read(desc_count_rx(ep_idx)) & 0x3FF) as usize;
        let len = count.min(cap).min(buf.len());
        let mut i = 0;
        while i < len {
            let half = pma_read(buf_addr + i as u32);
            buf[i] = half as u8;
            if i + 1 < len {
                buf[i + 1] = (half >> 8) as u8;
            }
            i += 2;
        }
        len
    }

    fn write_packet(&mut self, ep: Endpoint, data: &[u8]) {
        let (ep_idx, buf_addr) = match ep {
            Endpoint::Control => (0u8, EP0_IN_BUF),
            Endpoint::Bulk => (1u8, EP1_IN_BUF),
        };
        let mut i = 0;
        while i < data.len() {
            let lo = data[i] as u16;
            let hi = if i + 1 < data.len() { data[i + 1] as u16 } else { 0 };
            pma_write(buf_addr + i as u32, lo | (hi << 8));
            i += 2;
        }
        pma_write(desc_count_tx(ep_idx), data.len() as u16);
    }

    fn set_ep0_state(&mut self, rx: EpState, tx: EpState, expect_status_out: bool) {
        let kind = if expect_status_out { EPR_KIND_STATUS_OUT } else { 0 };
        self.set_ep_mode(0, EP_TYPE_CONTROL, rx, tx, kind, false);
    }

    fn set_ep1_state(&mut self, rx: EpState, tx: EpState, reset_toggles: bool) {
        self.set_ep_mode(1, EP_TYPE_BULK, rx, tx, 0, reset_toggles);
    }

    fn set_address(&mut self, address: u8) {
        // EF stays set; the new address takes effect immediately.
        unsafe { USBD_DADDR.write_volatile(0x80 | address as u16) };
    }

    fn suspend(&mut self) {
        unsafe {
            USBD_CNTR.write_volatile(USBD_CNTR.read_volatile() | CNTR_FSUSP);
            USBD_CNTR.write_volatile(USBD_CNTR.read_volatile() | CNTR_LPMODE);
        }
    }

    fn resume(&mut self) {
        unsafe { USBD_CNTR.write_volatile(0) };
    }

    fn detach(&mut self) {
        unsafe {
            USBD_CNTR.write_volatile(CNTR_FRES | CNTR_PDWN);
            EXTEND_CTR.write_volatile(EXTEND_CTR.read_volatile() & !EXTEND_USBD_PU_EN);
            RCC_APB1PCENR.write_volatile(RCC_APB1PCENR.read_volatile() & !APB1_USBDEN);
        }
    }
}
