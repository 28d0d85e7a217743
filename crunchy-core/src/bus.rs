// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware trait boundary.
//!
//! The core drives two pieces of hardware: the USB device peripheral and
//! the flash controller. Both are reduced here to the effects the protocol
//! logic needs; register layouts, packet-memory quirks and readiness
//! busy-waits belong to the implementations.

/// One cause pulled from the interrupt status register. The event loop
/// handles exactly one per poll.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UsbEvent {
    Reset,
    Suspend,
    Wakeup,
    /// SETUP packet received on endpoint 0.
    Setup,
    /// IN transmission on endpoint 0 completed.
    Ep0In,
    /// OUT reception on endpoint 0 completed (status stage).
    Ep0Out,
    /// IN transmission on endpoint 1 completed.
    Ep1In,
    /// OUT reception on endpoint 1 completed.
    Ep1Out,
}

/// Endpoint transfer state, per direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EpState {
    Disabled,
    Stall,
    Nak,
    Ack,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Endpoint {
    /// Endpoint 0: control, 8-byte buffers.
    Control,
    /// Endpoint 1: bulk, 64-byte buffers.
    Bulk,
}

/// USB device peripheral.
pub trait UsbBus {
    /// Read and clear the interrupt status register, decoding at most one
    /// pending event.
    fn poll(&mut self) -> Option<UsbEvent>;

    /// Copy the most recently received OUT (or SETUP) packet into `buf`,
    /// returning its length.
    fn read_packet(&mut self, ep: Endpoint, buf: &mut [u8]) -> usize;

    /// Load the IN buffer with `data` and set its transmit count.
    fn write_packet(&mut self, ep: Endpoint, data: &[u8]);

    /// Set both directions of endpoint 0. `expect_status_out` marks the
    /// next OUT as a zero-length status packet.
    fn set_ep0_state(&mut self, rx: EpState, tx: EpState, expect_status_out: bool);

    /// Set both directions of endpoint 1. `reset_toggles` clears both data
    /// toggles, as required when the configuration is (re)activated.
    fn set_ep1_state(&mut self, rx: EpState, tx: EpState, reset_toggles: bool);

    /// Program the device address register.
    fn set_address(&mut self, address: u8);

    /// Enter low-power suspend after bus inactivity.
    fn suspend(&mut self);

    /// Leave suspend on bus activity.
    fn resume(&mut self);

    /// Soft-disconnect from the bus.
    fn detach(&mut self);
}

/// Flash and RAM programming primitives.
///
/// Flash writes follow the vendor protocol: `unlock_flash`, then per
/// 256-byte page an `erase_page` followed by a word programming loop, then
/// `lock_flash`. Implementations own every readiness busy-wait; the flash
/// controller is strictly serialized, so each call returns only once the
/// operation has completed.
pub trait TargetMemory {
    fn unlock_flash(&mut self);
    fn erase_page(&mut self, addr: u32);
    fn program_word(&mut self, addr: u32, word: u32);
    fn lock_flash(&mut self);

    /// Plain memory copy for RAM-image downloads.
    fn copy_to_ram(&mut self, addr: u32, data: &[u8]);
}
