// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Virtual FAT16 volume, synthesized sector by sector.
//!
//! Nothing is stored: every sector of the 8 MiB volume is generated on
//! demand from a handful of `const` tables. The layout is fixed: boot
//! sector, one live FAT sector, a root directory with a volume label and
//! two read-only files, and the raw bytes of those files:
//!
//! ```text
//! LBA 0        boot sector
//! LBA 1..65    FAT (only the first sector has live entries)
//! LBA 65       root directory (16 entries, one sector)
//! LBA 66       INFO_UF2.TXT   (cluster 2)
//! LBA 67       INDEX.HTM      (cluster 3)
//! everything else reads as zeros
//! ```

pub const SECTOR_SIZE: usize = 512;
pub const FRAGMENT_SIZE: usize = 64;
pub const FRAGMENTS_PER_SECTOR: u8 = 8;

pub const LBA_BOOT_SECTOR: u32 = 0;
pub const LBA_FAT: u32 = 1;
/// One reserved sector plus a 64-sector FAT.
pub const LBA_ROOT_DIR: u32 = 65;
/// Data region: clusters 2 and 3 map to the two files.
pub const LBA_INFO_UF2: u32 = 66;
pub const LBA_INDEX_HTM: u32 = 67;

pub const VOLUME_LABEL: &[u8; 11] = b"CRUNCHY UF2";

pub const INFO_UF2_TXT: &[u8] =
    b"UF2 Bootloader v0.1.0\nModel: Crunchy CH32V\nBoard-ID: CH32V203-Crunchy\n";

pub const INDEX_HTM: &[u8] = b"<!doctype html>\n<html><body><script>location.replace(\"https://adnt.io/crunchy\")</script></body></html>\n";

/// BIOS parameter block. The boot signature 0xAA55 is not part of this
/// table; it is patched into bytes 510/511 during synthesis.
const BOOT_SECTOR: [u8; 62] = [
    0xEB, 0x3C, 0x90, // jump
    b'C', b'R', b'U', b'N', b'C', b'H', b'Y', b' ', // OEM name
    0x00, 0x02, // 512 bytes/sector
    0x01, // 1 sector/cluster
    0x01, 0x00, // 1 reserved sector
    0x01, // 1 FAT
    0x10, 0x00, // 16 root directory entries
    0x00, 0x40, // 0x4000 total sectors
    0xF8, // media descriptor
    0x40, 0x00, // 64 sectors/FAT
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // geometry / hidden sectors
    0x80, // drive number
    0x00, // reserved
    0x29, // extended boot signature
    0xC8, 0x32, 0x55, 0xF2, // volume serial number
    b'C', b'R', b'U', b'N', b'C', b'H', b'Y', b' ', b'U', b'F', b'2', // label
    b'F', b'A', b'T', b'1', b'6', b' ', b' ', b' ', // filesystem type
];

/// First FAT sector: media entry, reserved entry, and one single-cluster
/// end-of-chain entry per file. Every other entry in the FAT reads as free.
const FAT_HEAD: [u8; 8] = [0xF8, 0xFF, 0xFF, 0xFF, 0xF8, 0xFF, 0xF8, 0xFF];

const ATTR_READ_ONLY: u8 = 0x01;
const ATTR_VOLUME_LABEL: u8 = 0x08;

const fn dir_entry(name: &[u8; 11], attrs: u8, start_cluster: u16, size: u32) -> [u8; 32] {
    let mut entry = [0u8; 32];
    let mut i = 0;
    while i < 11 {
        entry[i] = name[i];
        i += 1;
    }
    entry[11] = attrs;
    entry[26] = start_cluster as u8;
    entry[27] = (start_cluster >> 8) as u8;
    entry[28] = size as u8;
    entry[29] = (size >> 8) as u8;
    entry[30] = (size >> 16) as u8;
    entry[31] = (size >> 24) as u8;
    entry
}

const fn root_dir() -> [u8; 96] {
    let entries = [
        dir_entry(VOLUME_LABEL, ATTR_VOLUME_LABEL, 0, 0),
        dir_entry(b"INFO_UF2TXT", ATTR_READ_ONLY, 2, INFO_UF2_TXT.len() as u32),
        dir_entry(b"INDEX   HTM", ATTR_READ_ONLY, 3, INDEX_HTM.len() as u32),
    ];
    let mut dir = [0u8; 96];
    let mut e = 0;
    while e < 3 {
        let mut i = 0;
        while i < 32 {
            dir[e * 32 + i] = entries[e][i];
            i += 1;
        }
        e += 1;
    }
    dir
}

/// Root directory sector contents (the 13 remaining entries are zero).
pub const ROOT_DIR: [u8; 96] = root_dir();

/// Produce 64 bytes of sector `lba` starting at `fragment * 64`, matching
/// the bulk endpoint buffer size. Out-of-range LBAs and the tail beyond any
/// source table read as zeros.
pub fn synthesize_fragment(lba: u32, fragment: u8) -> [u8; FRAGMENT_SIZE] {
    let mut out = [0u8; FRAGMENT_SIZE];
    let window = fragment as usize * FRAGMENT_SIZE;

    match lba {
        LBA_BOOT_SECTOR => {
            fill_from(&mut out, window, &BOOT_SECTOR);
            if fragment == FRAGMENTS_PER_SECTOR - 1 {
                out[62] = 0x55;
                out[63] = 0xAA;
            }
        }
        LBA_FAT => fill_from(&mut out, window, &FAT_HEAD),
        LBA_ROOT_DIR => fill_from(&mut out, window, &ROOT_DIR),
        LBA_INFO_UF2 => fill_from(&mut out, window, INFO_UF2_TXT),
        LBA_INDEX_HTM => fill_from(&mut out, window, INDEX_HTM),
        _ => {}
    }

    out
}

/// Copy the part of `src` (placed at sector offset 0) that overlaps the
/// 64-byte window starting at `window`.
fn fill_from(out: &mut [u8; FRAGMENT_SIZE], window: usize, src: &[u8]) {
    if window < src.len() {
        let n = (src.len() - window).min(FRAGMENT_SIZE);
        out[..n].copy_from_slice(&src[window..window + n]);
    }
}
