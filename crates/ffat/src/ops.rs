//! High-level volume operations: the surface the CLI (and any other
//! embedder) actually calls. Everything below this layer only knows
//! about sectors, clusters, and raw entries; everything here speaks in
//! terms of files, names, and whole operations.

use std::fs::OpenOptions;
use std::path::Path;

use crate::bpb::{parse_bpb, Geometry};
use crate::dir::{DirEntry, FileAttributes, RootDirectory};
use crate::error::FfatError;
use crate::fat::FatTable;
use crate::format::{format_image, FormatOptions};
use crate::io::{FileDevice, SectorDevice};
use crate::name::ShortName;

/// A summary of a volume's geometry, as reported by `info`.
#[derive(Debug, Clone)]
pub struct VolumeInfo {
    pub fat_type: &'static str,
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub cluster_count: u32,
    pub total_sectors: u32,
    pub num_fats: u32,
    pub root_entry_count: u32,
}

/// One entry as reported by `list`.
#[derive(Debug, Clone)]
pub struct ListEntry {
    pub name: String,
    pub attributes: FileAttributes,
    pub is_directory: bool,
    pub size: u32,
    pub first_cluster: u32,
}

fn open_device(path: &Path) -> Result<FileDevice, FfatError> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    // The actual sector size is only known once we've read the boot
    // sector, but reading the boot sector itself requires a device —
    // 512 is the universal minimum block size every FAT image uses for
    // at least its first sector, so it's always safe for this first read.
    Ok(FileDevice::new(file, 512))
}

fn open_with_geometry(path: &Path) -> Result<(FileDevice, Geometry), FfatError> {
    let mut device = open_device(path)?;
    let geometry = parse_bpb(&mut device)?;
    if geometry.bytes_per_sector != device.bytes_per_sector() {
        device = FileDevice::new(device.into_inner(), geometry.bytes_per_sector);
    }
    Ok((device, geometry))
}

/// Reads and reports a volume's geometry.
pub fn info(path: &Path) -> Result<VolumeInfo, FfatError> {
    let (_device, geometry) = open_with_geometry(path)?;
    Ok(VolumeInfo {
        fat_type: match geometry.fat_type {
            crate::bpb::FatType::Fat12 => "FAT12",
            crate::bpb::FatType::Fat16 => "FAT16",
        },
        bytes_per_sector: geometry.bytes_per_sector,
        sectors_per_cluster: geometry.sectors_per_cluster,
        cluster_count: geometry.cluster_count,
        total_sectors: geometry.total_sectors,
        num_fats: geometry.num_fats,
        root_entry_count: geometry.root_entry_count,
    })
}

/// Lists every active entry in the root directory. Entries with the
/// `HIDDEN` or `SYSTEM` attribute are omitted unless `show_hidden` is set.
pub fn list(path: &Path, show_hidden: bool) -> Result<Vec<ListEntry>, FfatError> {
    let (mut device, geometry) = open_with_geometry(path)?;
    let root = RootDirectory::new(&geometry);
    let entries = root.scan(&mut device)?;
    Ok(entries
        .into_iter()
        .map(|(_, e)| ListEntry {
            name: e.short_name().unpack(),
            attributes: e.attributes(),
            is_directory: e.attributes().contains(FileAttributes::DIRECTORY),
            size: e.size(),
            first_cluster: e.first_cluster(),
        })
        .filter(|e| {
            show_hidden
                || !e
                    .attributes
                    .intersects(FileAttributes::HIDDEN | FileAttributes::SYSTEM)
        })
        .collect())
}

/// Formats a brand new image at `path`.
pub fn format(path: &Path, options: FormatOptions) -> Result<(), FfatError> {
    let _span = tracing::info_span!("format", path = %path.display()).entered();
    format_image(path, options)
}

/// Copies the host file at `source` into the volume's root directory,
/// packing its file name into an 8.3 name, allocating a fresh cluster
/// chain sized to its contents, and copying the data cluster by
/// cluster (an empty file gets `first_cluster = 0` and no chain at
/// all). If an entry with the same name already exists, `overwrite`
/// decides whether it is replaced (its chain freed first) or the call
/// fails with `AlreadyExists`.
pub fn copy_in(path: &Path, source: &Path, overwrite: bool) -> Result<(), FfatError> {
    let source_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FfatError::InvalidImage {
            reason: "source path has no file name".to_string(),
        })?;
    let _span = tracing::info_span!("copy_in", source_name).entered();
    let (mut device, geometry) = open_with_geometry(path)?;
    let root = RootDirectory::new(&geometry);
    let name = ShortName::pack(source_name)?;

    if let Some((location, existing)) = root.find(&mut device, &name)? {
        if !overwrite {
            return Err(FfatError::AlreadyExists);
        }
        let first_cluster = existing.first_cluster();
        if first_cluster >= 2 {
            FatTable::new(&geometry).free_chain(&mut device, first_cluster)?;
        }
        root.delete_entry(&mut device, location)?;
    }

    let data = std::fs::read(source)?;
    let cluster_size = geometry.cluster_size_bytes() as usize;

    // An empty file gets no cluster chain at all, matching how this
    // crate's own zero-size entries (root subdirectory slots, etc.)
    // represent "no data" with `first_cluster = 0`.
    let first_cluster = if data.is_empty() {
        0
    } else {
        let clusters_needed = data.len().div_ceil(cluster_size.max(1)) as u32;
        let fat = FatTable::new(&geometry);
        let chain = fat.allocate_chain(&mut device, clusters_needed)?;

        for (i, &cluster) in chain.iter().enumerate() {
            let start = i * cluster_size;
            let end = (start + cluster_size).min(data.len());
            let mut buf = vec![0u8; cluster_size];
            if start < data.len() {
                buf[..end - start].copy_from_slice(&data[start..end]);
            }
            let sector = geometry.cluster_to_sector(cluster) as u64;
            device.write_sectors(sector, geometry.sectors_per_cluster, &buf)?;
        }
        tracing::info!(bytes = data.len(), clusters = chain.len(), "copied file in");
        chain[0]
    };

    let entry = DirEntry::new(name, FileAttributes::ARCHIVE, first_cluster, data.len() as u32);
    root.create_entry(&mut device, entry)?;
    Ok(())
}

/// Deletes `name` from the root directory: frees its cluster chain
/// first, then marks the directory slot deleted. A crash between the
/// two steps leaves clusters freed but the entry still visible — freeing
/// is idempotent on retry since the chain's clusters are already marked
/// free, but the entry read/write itself is not retried automatically.
pub fn delete(path: &Path, name: &str) -> Result<(), FfatError> {
    let _span = tracing::info_span!("delete", name).entered();
    let (mut device, geometry) = open_with_geometry(path)?;
    let root = RootDirectory::new(&geometry);
    let short = ShortName::pack(name)?;

    let (location, entry) = root.find(&mut device, &short)?.ok_or(FfatError::NotFound)?;

    let first_cluster = entry.first_cluster();
    if first_cluster >= 2 {
        let fat = FatTable::new(&geometry);
        fat.free_chain(&mut device, first_cluster)?;
    }
    root.delete_entry(&mut device, location)?;
    Ok(())
}

/// Creates a subdirectory in the root: allocates one cluster, zeroes it
/// and writes its `.`/`..` bootstrap entries (parent is always the root,
/// cluster `0` — this crate only ever creates subdirectories under the
/// root, never nested further), then adds the root-directory entry
/// pointing at it.
pub fn mkdir(path: &Path, name: &str) -> Result<(), FfatError> {
    let _span = tracing::info_span!("mkdir", name).entered();
    let (mut device, geometry) = open_with_geometry(path)?;
    let root = RootDirectory::new(&geometry);
    let short = ShortName::pack(name)?;

    if root.find(&mut device, &short)?.is_some() {
        return Err(FfatError::AlreadyExists);
    }

    let fat = FatTable::new(&geometry);
    let cluster = fat.alloc_free_cluster(&mut device)?;
    crate::dir::write_subdirectory_bootstrap(&mut device, &geometry, cluster, 0)?;

    let entry = DirEntry::new(short, FileAttributes::DIRECTORY, cluster, 0);
    root.create_entry(&mut device, entry)?;
    Ok(())
}
