// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Clock, pin and timer bring-up for the CH32V203.
//!
//! Registers not covered by a HAL are accessed through raw pointers, one
//! named constant per register.

use embedded_hal::delay::DelayNs;

pub const RCC_CTLR: *mut u32 = 0x4002_1000 as *mut u32;
pub const RCC_CFGR0: *mut u32 = 0x4002_1004 as *mut u32;
pub const RCC_APB2PCENR: *mut u32 = 0x4002_1018 as *mut u32;
pub const RCC_APB1PCENR: *mut u32 = 0x4002_101C as *mut u32;

pub const GPIOA_CFGHR: *mut u32 = 0x4001_0804 as *mut u32;
pub const GPIOA_BSHR: *mut u32 = 0x4001_0810 as *mut u32;

/// Vendor extension register: PLL input divider and the USBD pull-up.
pub const EXTEND_CTR: *mut u32 = 0x4002_3800 as *mut u32;
pub const EXTEND_USBD_PU_EN: u32 = 1 << 1;

/// SysTick, clocked at HCLK/8.
const STK_CTLR: *mut u32 = 0xE000_F000 as *mut u32;
const STK_SR: *mut u32 = 0xE000_F004 as *mut u32;
const STK_CMPLR: *mut u32 = 0xE000_F010 as *mut u32;

/// Factory-programmed electronic signature: 96-bit unique ID.
const ESIG_UNIID: *const u8 = 0x1FFF_F7E8 as *const u8;

const APB2_IOPAEN: u32 = 1 << 2;
pub const APB1_USBDEN: u32 = 1 << 23;

/// Bring the system clock to 96 MHz off the internal oscillator and leave
/// the USB prescaler feeding USBD with 48 MHz.
pub fn init_clocks() {
    unsafe {
        // HSI/2 into the PLL via the extension register's divider bit.
        EXTEND_CTR.write_volatile(EXTEND_CTR.read_volatile() | (1 << 4));
        // PLL multiplier and USB prescaler in one field write.
        let cfgr = RCC_CFGR0.read_volatile();
        RCC_CFGR0.write_volatile((cfgr & !0x00FF_0000) | (0b0110_1000 << 16));
        // PLL on, wait for lock.
        RCC_CTLR.write_volatile(RCC_CTLR.read_volatile() | (1 << 24));
        while RCC_CTLR.read_volatile() & (1 << 25) == 0 {}
        // Switch SYSCLK to the PLL and wait for the mux.
        let cfgr = RCC_CFGR0.read_volatile();
        RCC_CFGR0.write_volatile((cfgr & !0b11) | 0b10);
        while RCC_CFGR0.read_volatile() & 0b1100 != 0b1000 {}
    }
}

/// Drive the USB data pins low before attaching, as the manual asks, then
/// enable the USBD peripheral clock.
pub fn init_usb_pins() {
    unsafe {
        RCC_APB2PCENR.write_volatile(RCC_APB2PCENR.read_volatile() | APB2_IOPAEN);
        // PA11/PA12 as 2 MHz push-pull outputs...
        let cfg = GPIOA_CFGHR.read_volatile();
        GPIOA_CFGHR.write_volatile((cfg & !(0xFF << 12)) | (0b0010_0010 << 12));
        // ...held low.
        GPIOA_BSHR.write_volatile((1 << 27) | (1 << 28));

        RCC_APB1PCENR.write_volatile(RCC_APB1PCENR.read_volatile() | APB1_USBDEN);
    }
}

/// Put SYSCLK back on the internal oscillator, for handing a RAM image a
/// predictable clock.
pub fn clocks_to_default() {
    unsafe {
        let cfgr = RCC_CFGR0.read_volatile();
        RCC_CFGR0.write_volatile(cfgr & !0b11);
        while RCC_CFGR0.read_volatile() & 0b1100 != 0 {}
    }
}

pub fn read_unique_id() -> [u8; 12] {
    let mut uid = [0u8; 12];
    for (i, byte) in uid.iter_mut().enumerate() {
        *byte = unsafe { ESIG_UNIID.add(i).read_volatile() };
    }
    uid
}

/// Busy-wait delay on SysTick. At 96 MHz the counter ticks at 12 MHz.
pub struct SysTickDelay;

const TICKS_PER_US: u64 = 12;

impl DelayNs for SysTickDelay {
    fn delay_ns(&mut self, ns: u32) {
        let ticks = (ns as u64 * TICKS_PER_US / 1000) as u32;
        if ticks == 0 {
            return;
        }
        unsafe {
            STK_CMPLR.write_volatile(ticks);
            // Down-count from the compare value, auto-reload off, then go.
            STK_CTLR.write_volatile(0b111000);
            STK_CTLR.write_volatile(0b111001);
            while STK_SR.read_volatile() & 1 == 0 {}
            STK_CTLR.write_volatile(0);
            STK_SR.write_volatile(0);
        }
    }
}
