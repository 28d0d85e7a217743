// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UF2 packing and deployment tool for crunchy-bootloader.
//!
//! Usage:
//!   crunchy-uf2 pack firmware.bin --address 0x08002000
//!   crunchy-uf2 info firmware.uf2
//!   crunchy-uf2 deploy firmware.uf2 /media/CRUNCHY_UF2

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
