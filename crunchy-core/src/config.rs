// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Fixed device parameters: USB identity, UF2 family, disk geometry and the
//! flash/RAM programming windows.

pub const USB_VID: u16 = 0xF055;
pub const USB_PID: u16 = 0xB007;

/// Published UF2 family ID for WCH CH32V2xx parts.
pub const UF2_FAMILY_ID: u32 = 0x699B_62EC;

/// Virtual disk geometry: 0x4000 sectors of 512 bytes (8 MiB).
pub const DISK_SECTOR_COUNT: u32 = 0x4000;
pub const DISK_SECTOR_SIZE: u32 = 512;

/// Internal flash window. The first pages hold the bootloader itself and
/// are never programmed over USB.
pub const FLASH_BASE: u32 = 0x0800_0000;
pub const BOOTLOADER_SIZE: u32 = 8 * 1024;
pub const APP_BASE: u32 = FLASH_BASE + BOOTLOADER_SIZE;
pub const FLASH_END: u32 = FLASH_BASE + 224 * 1024;

/// Fast-mode erase/program granularity.
pub const FLASH_PAGE_SIZE: u32 = 256;

/// RAM window accepted for direct image downloads.
pub const RAM_BASE: u32 = 0x2000_0000;
pub const RAM_END: u32 = RAM_BASE + 64 * 1024;

/// Delay between the final CSW going out and dropping off the bus, so the
/// host can finish its bulk-transfer housekeeping.
pub const REBOOT_SETTLE_MS: u32 = 50;
