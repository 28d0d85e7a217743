// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use zerocopy::FromBytes;

use crunchy_core::config;
use crunchy_core::uf2::{self, Uf2Header};

/// Pack a raw binary into UF2 blocks targeting `address`.
pub fn pack(input: &Path, output: Option<PathBuf>, address: u32) -> Result<()> {
    let image = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    if image.is_empty() {
        bail!("{} is empty", input.display());
    }

    if address % config::FLASH_PAGE_SIZE != 0 {
        bail!("Address 0x{:08x} is not {}-byte aligned", address, config::FLASH_PAGE_SIZE);
    }

    let end = address as u64 + image.len() as u64;
    let in_flash = address >= config::APP_BASE && end <= config::FLASH_END as u64;
    let in_ram = address >= config::RAM_BASE && end <= config::RAM_END as u64;
    if !in_flash && !in_ram {
        bail!(
            "0x{:08x}..0x{:08x} fits neither the application flash window \
             (0x{:08x}..0x{:08x}) nor RAM (0x{:08x}..0x{:08x})",
            address,
            end,
            config::APP_BASE,
            config::FLASH_END,
            config::RAM_BASE,
            config::RAM_END
        );
    }

    let packed = uf2::pack_image(&image, address, config::UF2_FAMILY_ID);
    let out_path = output.unwrap_or_else(|| input.with_extension("uf2"));
    fs::write(&out_path, &packed)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    println!(
        "Packed {} bytes into {} blocks at 0x{:08x} -> {}",
        image.len(),
        packed.len() / uf2::BLOCK_SIZE,
        address,
        out_path.display()
    );
    Ok(())
}

/// Decode and summarize a UF2 file.
pub fn info(file: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if data.is_empty() || data.len() % uf2::BLOCK_SIZE != 0 {
        bail!(
            "{} is not a UF2 file ({} bytes, not a multiple of {})",
            file.display(),
            data.len(),
            uf2::BLOCK_SIZE
        );
    }

    let mut lowest = u32::MAX;
    let mut highest = 0u32;
    let mut family = None;

    for (i, block) in data.chunks_exact(uf2::BLOCK_SIZE).enumerate() {
        let header = Uf2Header::read_from_bytes(&block[..uf2::HEADER_SIZE])
            .ok()
            .filter(|h| h.magic_start0 == uf2::MAGIC_START0 && h.magic_start1 == uf2::MAGIC_START1)
            .with_context(|| format!("Block {} has bad magic", i))?;

        let addr = header.target_addr;
        let size = header.payload_size;
        lowest = lowest.min(addr);
        highest = highest.max(addr + size);

        if header.flags & uf2::FLAG_FAMILY_ID_PRESENT != 0 {
            family = Some(header.family_id);
        }
    }

    println!("{}:", file.display());
    println!("  Blocks:  {}", data.len() / uf2::BLOCK_SIZE);
    println!("  Range:   0x{:08x}..0x{:08x} ({} bytes)", lowest, highest, highest - lowest);
    match family {
        Some(id) => {
            let ours = if id == config::UF2_FAMILY_ID { " (this device)" } else { "" };
            println!("  Family:  0x{:08x}{}", id, ours);
        }
        None => println!("  Family:  none"),
    }
    Ok(())
}

/// Copy a UF2 file onto the mounted bootloader drive. The device flashes
/// each block as it lands and reboots by itself once the image is complete.
pub fn deploy(file: &Path, mount: &Path) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if data.len() % uf2::BLOCK_SIZE != 0 {
        bail!("{} is not a UF2 file", file.display());
    }
    if !mount.is_dir() {
        bail!("{} is not a mounted directory", mount.display());
    }

    let name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?;
    let dest = mount.join(name);

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut out = fs::File::create(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    for chunk in data.chunks(64 * 1024) {
        out.write_all(chunk)?;
        pb.inc(chunk.len() as u64);
    }
    out.sync_all()?;
    pb.finish();

    println!("Deployed; the device reboots into the new firmware on its own");
    Ok(())
}
