// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Protocol core for crunchy-bootloader.
//!
//! Everything that makes the bootloader appear as a USB mass-storage UF2
//! drive lives here as hardware-independent logic: endpoint-0 enumeration,
//! Bulk-Only Transport with its SCSI command subset, on-demand FAT16 sector
//! synthesis, and the UF2 flash/RAM write pipeline. Hardware is reached only
//! through the traits in [`bus`], so the whole stack runs against mocks on
//! the host.
//!
//! There is no interrupt context and no scheduler on the device: the
//! peripheral's interrupt status register is polled, and every piece of
//! state that must survive between polls is an explicit field of
//! [`device::Device`].

#![cfg_attr(not(feature = "std"), no_std)]

pub mod bus;
pub mod config;
pub mod control;
pub mod descriptors;
pub mod device;
pub mod fat;
pub mod msc;
pub mod scsi;
pub mod uf2;

pub use bus::{Endpoint, EpState, TargetMemory, UsbBus, UsbEvent};
pub use device::{Device, Reboot};
