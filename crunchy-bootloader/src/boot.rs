// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot handoff: the backup-register boot flag, application sanity check,
//! and the two exits: system reset into flash, or a direct jump into a
//! RAM image.

use crunchy_core::{config, Reboot};

use crate::peripherals::{self, RCC_APB1PCENR};

/// Backup data register 10; survives system resets.
const BKP_DATAR10: *mut u32 = 0x4000_6C28 as *mut u32;

/// "Don't re-enter the bootloader" magic.
const BOOT_FLAG: u32 = 0x4170;

const PWR_CTLR: *mut u32 = 0x4000_7000 as *mut u32;
const PWR_CTLR_DBP: u32 = 1 << 8;

const APB1_PWREN: u32 = 1 << 28;
const APB1_BKPEN: u32 = 1 << 27;

/// Programmable interrupt controller configuration; the keyed write below
/// issues a full system reset.
const PFIC_CFGR: *mut u32 = 0xE000_E048 as *mut u32;
const PFIC_SYSRESET: u32 = 0xBEEF_0080;

/// Read and clear the boot flag. Set by the reboot path right before a
/// system reset so the next pass through here goes straight to the
/// application.
pub fn take_boot_flag() -> bool {
    unsafe {
        RCC_APB1PCENR.write_volatile(RCC_APB1PCENR.read_volatile() | APB1_PWREN | APB1_BKPEN);
        PWR_CTLR.write_volatile(PWR_CTLR.read_volatile() | PWR_CTLR_DBP);
        let flag = BKP_DATAR10.read_volatile() & 0xFFFF;
        BKP_DATAR10.write_volatile(0);
        flag == BOOT_FLAG
    }
}

/// The application slot starts with code, not erased or blank flash.
pub fn application_is_sane() -> bool {
    let first = unsafe { (config::APP_BASE as *const u32).read_volatile() };
    first != 0xFFFF_FFFF && first != 0
}

/// # Safety
/// The application slot must contain a valid image.
pub unsafe fn jump_to_application() -> ! {
    defmt::println!("Booting application at 0x{:08x}", config::APP_BASE);
    jump(config::APP_BASE)
}

/// Leave the bootloader for good. USB is already quiesced by the core's
/// reboot sequencer.
pub fn reboot(target: Reboot) -> ! {
    match target {
        Reboot::Application => {
            defmt::println!("Rebooting into application");
            unsafe {
                BKP_DATAR10.write_volatile(BOOT_FLAG);
                system_reset()
            }
        }
        Reboot::Ram { entry } => {
            defmt::println!("Jumping to RAM image at 0x{:08x}", entry);
            peripherals::clocks_to_default();
            unsafe { jump(entry) }
        }
    }
}

unsafe fn jump(entry: u32) -> ! {
    core::arch::asm!("jr {0}", in(reg) entry, options(noreturn))
}

unsafe fn system_reset() -> ! {
    PFIC_CFGR.write_volatile(PFIC_SYSRESET);
    loop {
        riscv::asm::wfi();
    }
}
