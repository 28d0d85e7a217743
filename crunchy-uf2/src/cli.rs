// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "crunchy-uf2")]
#[command(about = "UF2 packing and deployment tool for crunchy-bootloader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Pack a raw firmware binary into a UF2 image
    Pack {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output path (defaults to the input with a .uf2 extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target address of the first byte
        #[arg(short, long, value_parser = parse_address, default_value = "0x08002000")]
        address: u32,
    },

    /// Inspect a UF2 file
    Info {
        /// UF2 file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Copy a UF2 file onto a mounted bootloader drive
    Deploy {
        /// UF2 file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Mount point of the bootloader drive
        #[arg(value_name = "MOUNT")]
        mount: PathBuf,
    },
}

fn parse_address(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| e.to_string())
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Pack {
            input,
            output,
            address,
        } => commands::pack(&input, output, address),
        Commands::Info { file } => commands::info(&file),
        Commands::Deploy { file, mount } => commands::deploy(&file, &mount),
    }
}
