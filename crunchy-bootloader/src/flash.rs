// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! `TargetMemory` over the CH32V203 flash controller (FPEC), fast mode.
//!
//! Fast-mode programming works on 256-byte pages and goes through a fixed
//! sequence:
//!   1. unlock with the two key writes, then the fast-mode keys
//!   2. FTER + page address + STRT to erase, poll BSY
//!   3. FTPG, then 64 word writes each polled on WRBSY
//!   4. FTPG + PGSTRT to commit the page buffer, poll BSY
//!   5. lock
//!
//! The core drives this as unlock / erase_page / program_word× / lock; the
//! commit in step 4 happens on `lock_flash`, tracked by the `programming`
//! flag.

use crunchy_core::TargetMemory;

const FLASH_KEYR: *mut u32 = 0x4002_2004 as *mut u32;
const FLASH_STATR: *mut u32 = 0x4002_200C as *mut u32;
const FLASH_CTLR: *mut u32 = 0x4002_2010 as *mut u32;
const FLASH_ADDR: *mut u32 = 0x4002_2014 as *mut u32;
const FLASH_MODEKEYR: *mut u32 = 0x4002_2024 as *mut u32;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

const STATR_BSY: u32 = 1 << 0;
const STATR_WRBSY: u32 = 1 << 1;

const CTLR_STRT: u32 = 1 << 6;
const CTLR_LOCK: u32 = 1 << 7;
const CTLR_FLOCK: u32 = 1 << 15;
const CTLR_FTPG: u32 = 1 << 16;
const CTLR_FTER: u32 = 1 << 17;
const CTLR_PGSTRT: u32 = 1 << 21;

pub struct Fpec {
    programming: bool,
}

impl Fpec {
    pub fn new() -> Self {
        Self { programming: false }
    }
}

impl TargetMemory for Fpec {
    fn unlock_flash(&mut self) {
        unsafe {
            FLASH_KEYR.write_volatile(KEY1);
            FLASH_KEYR.write_volatile(KEY2);
            FLASH_MODEKEYR.write_volatile(KEY1);
            FLASH_MODEKEYR.write_volatile(KEY2);
        }
    }

    fn erase_page(&mut self, addr: u32) {
        unsafe {
            FLASH_CTLR.write_volatile(CTLR_FTER);
            FLASH_ADDR.write_volatile(addr);
            FLASH_CTLR.write_volatile(CTLR_FTER | CTLR_STRT);
            while FLASH_STATR.read_volatile() & STATR_BSY != 0 {}
        }
    }

    fn program_word(&mut self, addr: u32, word: u32) {
        unsafe {
            if !self.programming {
                FLASH_CTLR.write_volatile(CTLR_FTPG);
                self.programming = true;
            }
            (addr as *mut u32).write_volatile(word);
            while FLASH_STATR.read_volatile() & STATR_WRBSY != 0 {}
        }
    }

    fn lock_flash(&mut self) {
        unsafe {
            if self.programming {
                // Commit the page buffer before locking.
                FLASH_CTLR.write_volatile(CTLR_FTPG | CTLR_PGSTRT);
                while FLASH_STATR.read_volatile() & STATR_BSY != 0 {}
                self.programming = false;
            }
            FLASH_CTLR.write_volatile(CTLR_FLOCK | CTLR_LOCK);
        }
    }

    fn copy_to_ram(&mut self, addr: u32, data: &[u8]) {
        let mut ptr = addr as *mut u8;
        for &byte in data {
            unsafe {
                ptr.write_volatile(byte);
                ptr = ptr.add(1);
            }
        }
    }
}
