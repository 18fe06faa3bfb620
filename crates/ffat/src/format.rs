//! Formats a brand new FAT12/16 image from scratch.
//!
//! Unlike the read/write paths elsewhere in this crate, formatting owns
//! the file end to end: it creates (or truncates) the backing file,
//! sizes it, and writes every region explicitly rather than relying on
//! sparse-file zero-fill, so a formatted image is well-defined even on
//! filesystems without sparse file support.

use std::fs::OpenOptions;
use std::path::Path;

use crate::bpb::{FatType, MEDIA_DESCRIPTOR_FLOPPY};
use crate::error::FfatError;
use crate::io::{FileDevice, SectorDevice};

/// Parameters for [`format_image`]. `Default` produces the classic
/// 1.44MB (3.5", 2 FATs) floppy geometry used throughout this crate's
/// tests and documented scenarios.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    pub root_entry_count: u32,
    pub total_sectors: u32,
    pub media_descriptor: u8,
    pub sectors_per_fat: u32,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub volume_label: [u8; 11],
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            num_fats: 2,
            root_entry_count: 224,
            total_sectors: 2880,
            media_descriptor: MEDIA_DESCRIPTOR_FLOPPY,
            sectors_per_fat: 9,
            sectors_per_track: 18,
            num_heads: 2,
            volume_label: *b"NO NAME    ",
        }
    }
}

impl FormatOptions {
    fn root_dir_sectors(&self) -> u32 {
        (self.root_entry_count * 32).div_ceil(self.bytes_per_sector)
    }

    fn first_data_sector(&self) -> u32 {
        self.reserved_sectors + self.num_fats * self.sectors_per_fat + self.root_dir_sectors()
    }

    fn cluster_count(&self) -> u32 {
        let data_sectors = self.total_sectors.saturating_sub(self.first_data_sector());
        data_sectors / self.sectors_per_cluster.max(1)
    }
}

/// Builds the boot sector bytes (jump instruction, OEM name, BPB,
/// signature). Everything past the end of the BPB proper (bootstrap
/// code, the `0x55AA` signature at the very end) is written but never
/// executed — this crate never produces a bootable image.
fn build_boot_sector(options: &FormatOptions) -> Vec<u8> {
    let mut sector = vec![0u8; options.bytes_per_sector as usize];

    sector[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
    sector[3..11].copy_from_slice(b"MSDOS5.0");

    sector[11..13].copy_from_slice(&(options.bytes_per_sector as u16).to_le_bytes());
    sector[13] = options.sectors_per_cluster as u8;
    sector[14..16].copy_from_slice(&(options.reserved_sectors as u16).to_le_bytes());
    sector[16] = options.num_fats as u8;
    sector[17..19].copy_from_slice(&(options.root_entry_count as u16).to_le_bytes());

    if options.total_sectors <= u16::MAX as u32 {
        sector[19..21].copy_from_slice(&(options.total_sectors as u16).to_le_bytes());
        sector[32..36].copy_from_slice(&0u32.to_le_bytes());
    } else {
        sector[19..21].copy_from_slice(&0u16.to_le_bytes());
        sector[32..36].copy_from_slice(&options.total_sectors.to_le_bytes());
    }

    sector[21] = options.media_descriptor;
    sector[22..24].copy_from_slice(&(options.sectors_per_fat as u16).to_le_bytes());
    sector[24..26].copy_from_slice(&options.sectors_per_track.to_le_bytes());
    sector[26..28].copy_from_slice(&options.num_heads.to_le_bytes());
    sector[28..32].copy_from_slice(&0u32.to_le_bytes()); // hidden sectors

    // Extended BPB (BPB_DrvNum, BPB_Reserved1, BPB_BootSig, BPB_VolID)
    sector[36] = 0x00;
    sector[37] = 0x00;
    sector[38] = 0x29;
    sector[39..43].copy_from_slice(&0x00000000u32.to_le_bytes());
    sector[43..54].copy_from_slice(&options.volume_label);
    sector[54..62].copy_from_slice(b"FAT12   ");

    sector[510] = 0x55;
    sector[511] = 0xAA;

    sector
}

/// Creates `path` (or reuses it, if it already exists) and writes a boot
/// sector, zeroed-then-seeded FAT copies, and a zeroed root directory.
///
/// If `path` already exists, its current length is preserved and
/// `options.total_sectors` is overridden to match — reformatting a file
/// doesn't change its size. Otherwise `path` is created and extended to
/// `options.total_sectors`, which defaults to the classic 1.44MB floppy
/// size.
///
/// Every FAT copy gets the same two reserved entries seeded
/// (`media_descriptor` in the low byte of entry 0, `0xFF` filling the
/// rest of entries 0 and 1) and the remainder of the region zeroed —
/// the whole region, not just its first sector, so a formatted image
/// never carries stale bytes from whatever used to occupy `path`.
pub fn format_image(path: &Path, mut options: FormatOptions) -> Result<(), FfatError> {
    if !matches!(options.bytes_per_sector, 512 | 1024 | 2048 | 4096) {
        return Err(FfatError::InvalidImage {
            reason: format!("unsupported bytes_per_sector: {}", options.bytes_per_sector),
        });
    }

    let existing_len = std::fs::metadata(path).ok().map(|m| m.len());

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let total_bytes = match existing_len {
        Some(len) if len > 0 => {
            options.total_sectors = (len / options.bytes_per_sector as u64) as u32;
            len
        }
        _ => options.total_sectors as u64 * options.bytes_per_sector as u64,
    };
    file.set_len(total_bytes)?;

    let cluster_count = options.cluster_count();
    let fat_type = FatType::classify(cluster_count)?;

    let mut device = FileDevice::new(file, options.bytes_per_sector);

    tracing::info!(
        path = %path.display(),
        total_sectors = options.total_sectors,
        fat_type = ?fat_type,
        "formatting image"
    );

    let boot = build_boot_sector(&options);
    device.write_sector(0, &boot)?;

    let fat_region_sectors = options.sectors_per_fat;
    let mut fat_sector0 = vec![0u8; options.bytes_per_sector as usize];
    fat_sector0[0] = options.media_descriptor;
    fat_sector0[1] = 0xFF;
    fat_sector0[2] = 0xFF;
    if fat_type == FatType::Fat16 {
        fat_sector0[3] = 0xFF;
    }
    let zero_sector = vec![0u8; options.bytes_per_sector as usize];

    for fi in 0..options.num_fats {
        let fat_base = options.reserved_sectors + fi * fat_region_sectors;
        device.write_sector(fat_base as u64, &fat_sector0)?;
        for s in 1..fat_region_sectors {
            device.write_sector((fat_base + s) as u64, &zero_sector)?;
        }
    }

    let first_root_sector = options.reserved_sectors + options.num_fats * fat_region_sectors;
    for s in 0..options.root_dir_sectors() {
        device.write_sector((first_root_sector + s) as u64, &zero_sector)?;
    }

    Ok(())
}
