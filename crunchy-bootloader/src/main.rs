// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Crunchy: a UF2 drag-and-drop bootloader for CH32V203.
//!
//! The device enumerates as a USB mass-storage drive holding a synthetic
//! FAT16 volume; UF2 blocks written to that drive are programmed into flash
//! or RAM, and the device reboots into the new image on its own. All
//! protocol logic lives in `crunchy-core`; this binary supplies clocks,
//! pins, the USBD peripheral, the flash controller and the reboot paths.

#![no_std]
#![no_main]

mod boot;
mod flash;
mod peripherals;
mod usbd;

use defmt_rtt as _;
use panic_halt as _;

use crunchy_core::Device;

defmt::timestamp!("{=u64:us}", { 0 });

#[qingke_rt::entry]
fn main() -> ! {
    // A just-flashed image asked for: skip straight into the application.
    if boot::take_boot_flag() && boot::application_is_sane() {
        unsafe { boot::jump_to_application() }
    }

    defmt::println!("Bootloader init");

    let uid = peripherals::read_unique_id();
    peripherals::init_clocks();
    peripherals::init_usb_pins();

    let bus = usbd::Usbd::init();
    let mem = flash::Fpec::new();

    let mut device = Device::new(bus, mem, peripherals::SysTickDelay, uid);

    defmt::println!("USB attached, serving UF2 drive");

    loop {
        if let Some(target) = device.poll() {
            boot::reboot(target)
        }
    }
}
