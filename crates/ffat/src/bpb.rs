//! BIOS Parameter Block parsing and derived geometry.
//!
//! [`Geometry`] is the value object every other layer is handed: it is
//! computed once per operation from the boot sector and never mutated or
//! smuggled through global state.

use crate::codec::{read_u16_le, read_u32_le};
use crate::error::FfatError;
use crate::io::SectorDevice;

/// Media descriptor byte (`BPB_Media`). `0xF0` is the classic 1.44MB
/// floppy value this crate's formatter writes.
pub const MEDIA_DESCRIPTOR_FLOPPY: u8 = 0xF0;

/// Which width the on-disk FAT entries use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
}

impl FatType {
    /// End-of-chain marker for this FAT width.
    pub fn eoc_marker(self) -> u32 {
        match self {
            FatType::Fat12 => 0x0FFF,
            FatType::Fat16 => 0xFFFF,
        }
    }

    /// Value that marks a cluster as free.
    pub fn free_marker(self) -> u32 {
        0
    }

    /// Mask applied to every value stored in an entry of this width.
    pub fn mask(self) -> u32 {
        match self {
            FatType::Fat12 => 0x0FFF,
            FatType::Fat16 => 0xFFFF,
        }
    }

    /// Classifies a FAT width from the cluster count, per the classic
    /// Microsoft rule: FAT type is a property of the volume's cluster
    /// count, not a field anyone writes down directly.
    pub fn classify(cluster_count: u32) -> Result<FatType, FfatError> {
        if cluster_count < 4085 {
            Ok(FatType::Fat12)
        } else if cluster_count < 65525 {
            Ok(FatType::Fat16)
        } else {
            Err(FfatError::Fat32Unsupported)
        }
    }
}

/// Derived geometry of a FAT12/16 volume, computed once from the BPB.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    pub root_entry_count: u32,
    pub sectors_per_fat: u32,
    pub media_descriptor: u8,
    pub total_sectors: u32,

    // Geometry fields no operation in this crate currently reads back,
    // but which the BPB carries and the data model says `Geometry` owns.
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],

    // Derived
    pub root_dir_sectors: u32,
    pub first_fat_sector: u32,
    pub first_root_sector: u32,
    pub first_data_sector: u32,
    pub data_sectors: u32,
    pub cluster_count: u32,
    pub fat_type: FatType,
}

impl Geometry {
    pub fn entries_per_root_sector(&self) -> u32 {
        self.bytes_per_sector / 32
    }

    pub fn cluster_size_bytes(&self) -> u32 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    /// First sector of the data region. Cluster 2 starts here.
    pub fn cluster_to_sector(&self, cluster: u32) -> u32 {
        self.first_data_sector + (cluster - 2) * self.sectors_per_cluster
    }
}

/// Parses the boot sector (sector 0) into a [`Geometry`], validating the
/// fields the spec requires and warning (via `tracing`) on the ones that
/// are merely unusual.
pub fn parse_bpb(device: &mut dyn SectorDevice) -> Result<Geometry, FfatError> {
    let mut boot = vec![0u8; device.bytes_per_sector().max(512) as usize];
    // The BPB's own fields all live in the first 512 bytes regardless of
    // the volume's actual sector size, so we always read exactly one
    // minimum-size sector's worth up front.
    let mut first_512 = [0u8; 512];
    device.read_sector(0, &mut boot[..device.bytes_per_sector() as usize])?;
    first_512.copy_from_slice(&boot[..512.min(boot.len())]);

    if !(first_512[510] == 0x55 && first_512[511] == 0xAA) {
        tracing::warn!("boot sector signature 0x55AA not found");
    }

    let bytes_per_sector = read_u16_le(&first_512, 11) as u32;
    if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096) {
        return Err(FfatError::InvalidImage {
            reason: format!("unsupported bytes_per_sector: {bytes_per_sector}"),
        });
    }

    let sectors_per_cluster = first_512[13] as u32;
    if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
        tracing::warn!(
            sectors_per_cluster,
            "sectors_per_cluster should be a nonzero power of two"
        );
    }

    let reserved_sectors = read_u16_le(&first_512, 14) as u32;
    let num_fats = first_512[16] as u32;
    if num_fats == 0 {
        tracing::warn!("num_fats is zero");
    }

    let root_entry_count = read_u16_le(&first_512, 17) as u32;
    let total_sectors_16 = read_u16_le(&first_512, 19) as u32;
    let media_descriptor = first_512[21];
    let sectors_per_fat = read_u16_le(&first_512, 22) as u32;
    let sectors_per_track = read_u16_le(&first_512, 24);
    let num_heads = read_u16_le(&first_512, 26);
    let hidden_sectors = read_u32_le(&first_512, 28);
    let total_sectors_32 = read_u32_le(&first_512, 32);
    let volume_id = read_u32_le(&first_512, 39);
    let mut volume_label = [0u8; 11];
    volume_label.copy_from_slice(&first_512[43..54]);
    let mut fs_type = [0u8; 8];
    fs_type.copy_from_slice(&first_512[54..62]);

    if root_entry_count == 0 || sectors_per_fat == 0 {
        return Err(FfatError::Fat32Unsupported);
    }

    let total_sectors = if total_sectors_16 != 0 {
        total_sectors_16
    } else {
        total_sectors_32
    };

    let root_dir_sectors = (root_entry_count * 32).div_ceil(bytes_per_sector);
    let first_fat_sector = reserved_sectors;
    let first_root_sector = reserved_sectors + num_fats * sectors_per_fat;
    let first_data_sector = first_root_sector + root_dir_sectors;
    let data_sectors = total_sectors.saturating_sub(first_data_sector);
    let cluster_count = data_sectors / sectors_per_cluster.max(1);
    let fat_type = FatType::classify(cluster_count)?;

    Ok(Geometry {
        bytes_per_sector,
        sectors_per_cluster,
        reserved_sectors,
        num_fats,
        root_entry_count,
        sectors_per_fat,
        media_descriptor,
        total_sectors,
        sectors_per_track,
        num_heads,
        hidden_sectors,
        volume_id,
        volume_label,
        fs_type,
        root_dir_sectors,
        first_fat_sector,
        first_root_sector,
        first_data_sector,
        data_sectors,
        cluster_count,
        fat_type,
    })
}
