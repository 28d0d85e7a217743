// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The owning event loop.
//!
//! A single synchronous context polls the USB interrupt status and services
//! at most one event per iteration. There is no preemption and nothing is
//! retried by the firmware; every branch ends in an endpoint-state
//! transition and the host's own retry logic is the only recovery path.

use embedded_hal::delay::DelayNs;

use crate::bus::{EpState, TargetMemory, UsbBus, UsbEvent};
use crate::config;
use crate::control::ControlTransfer;
use crate::msc::BulkState;
use crate::scsi::Sense;
use crate::uf2::SectorWriter;

/// Where to hand off control after quiescing USB.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Reboot {
    /// Full system reset into the application resident in flash.
    Application,
    /// Direct jump into a freshly downloaded RAM image.
    Ram { entry: u32 },
}

/// All bootloader state. Execution fully unwinds between polls, so
/// everything that has to survive lives in these fields.
pub struct Device<B, M, D> {
    pub(crate) bus: B,
    pub(crate) mem: M,
    pub(crate) delay: D,
    pub(crate) uid: [u8; 12],
    pub(crate) active_config: u8,
    pub(crate) control: ControlTransfer,
    pub(crate) bulk: BulkState,
    pub(crate) tag: u32,
    pub(crate) sense: Sense,
    pub(crate) writer: SectorWriter,
}

impl<B: UsbBus, M: TargetMemory, D: DelayNs> Device<B, M, D> {
    pub fn new(bus: B, mem: M, delay: D, uid: [u8; 12]) -> Self {
        Self {
            bus,
            mem,
            delay,
            uid,
            active_config: 0,
            control: ControlTransfer::Idle,
            bulk: BulkState::WantCbw,
            tag: 0,
            sense: Sense::NONE,
            writer: SectorWriter::new(config::UF2_FAMILY_ID),
        }
    }

    /// Service at most one pending USB event. Returns a reboot request once
    /// a completed UF2 transfer or a host eject has been acknowledged.
    pub fn poll(&mut self) -> Option<Reboot> {
        match self.bus.poll()? {
            UsbEvent::Reset => self.handle_bus_reset(),
            UsbEvent::Suspend => self.bus.suspend(),
            UsbEvent::Wakeup => self.bus.resume(),
            UsbEvent::Setup => self.handle_setup(),
            UsbEvent::Ep0In => self.handle_ep0_in(),
            UsbEvent::Ep0Out => self.handle_ep0_out(),
            UsbEvent::Ep1Out => self.handle_bulk_out(),
            UsbEvent::Ep1In => return self.handle_bulk_in(),
        }
        None
    }

    /// Bus reset cancels everything in flight. Both control directions
    /// stall (SETUP is admitted regardless), the bulk endpoint goes away
    /// until the host configures us again, and the address resets.
    fn handle_bus_reset(&mut self) {
        self.bus.set_ep0_state(EpState::Stall, EpState::Stall, false);
        self.bus
            .set_ep1_state(EpState::Disabled, EpState::Disabled, false);
        self.bus.set_address(0);
        self.active_config = 0;
        self.control = ControlTransfer::Idle;
        self.bulk = BulkState::WantCbw;
        self.sense = Sense::NONE;
    }

    /// Quiesce USB and decide where the reboot goes: a RAM image if this
    /// transfer downloaded one, the flashed application otherwise.
    pub(crate) fn reboot_sequence(&mut self) -> Reboot {
        self.delay.delay_ms(config::REBOOT_SETTLE_MS);
        self.bus.detach();
        match self.writer.ram_entry() {
            Some(entry) => Reboot::Ram { entry },
            None => Reboot::Application,
        }
    }

    // Accessors used by the host-side tests.

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn bulk_state(&self) -> BulkState {
        self.bulk
    }

    pub fn control_state(&self) -> ControlTransfer {
        self.control
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn writer(&self) -> &SectorWriter {
        &self.writer
    }
}
