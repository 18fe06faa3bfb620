//! The root directory: fixed-size, fixed-location 32-byte entries.
//!
//! FAT12/16 (unlike FAT32) keeps its root directory in a region of its
//! own, immediately after the FAT copies, sized by `root_entry_count`.
//! This module only ever touches that region — subdirectories are out
//! of scope beyond the two bootstrap entries `mkdir` writes into a
//! freshly allocated cluster.

use bitflags::bitflags;

use crate::bpb::Geometry;
use crate::error::FfatError;
use crate::io::SectorDevice;
use crate::name::ShortName;

bitflags! {
    /// `DIR_Attr` — the attribute byte of a directory entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileAttributes: u8 {
        const READ_ONLY    = 0x01;
        const HIDDEN       = 0x02;
        const SYSTEM       = 0x04;
        const VOLUME_LABEL = 0x08;
        const DIRECTORY    = 0x10;
        const ARCHIVE      = 0x20;
    }
}

/// Attribute value reserved for long-file-name continuation entries;
/// this crate skips them on read and never writes them.
const ATTR_LFN: u8 = 0x0F;

const ENTRY_FREE: u8 = 0x00;
const ENTRY_DELETED: u8 = 0xE5;
const ENTRY_SIZE: usize = 32;

/// A raw 32-byte directory entry, byte-exact with the on-disk layout.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct DirEntry {
    pub name: [u8; 8],
    pub ext: [u8; 3],
    pub attributes: u8,
    pub reserved: u8,
    pub creation_time_tenths: u8,
    pub creation_time: [u8; 2],
    pub creation_date: [u8; 2],
    pub last_access_date: [u8; 2],
    pub first_cluster_hi: [u8; 2],
    pub last_write_time: [u8; 2],
    pub last_write_date: [u8; 2],
    pub first_cluster_lo: [u8; 2],
    pub size: [u8; 4],
}

static_assertions::const_assert_eq!(core::mem::size_of::<DirEntry>(), ENTRY_SIZE);

impl DirEntry {
    pub fn empty() -> Self {
        bytemuck::Zeroable::zeroed()
    }

    pub fn is_end_of_directory(&self) -> bool {
        self.name[0] == ENTRY_FREE
    }

    pub fn is_deleted(&self) -> bool {
        self.name[0] == ENTRY_DELETED
    }

    pub fn is_lfn(&self) -> bool {
        self.attributes == ATTR_LFN
    }

    pub fn short_name(&self) -> ShortName {
        ShortName::from_raw(self.name, self.ext)
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes::from_bits_truncate(self.attributes)
    }

    pub fn first_cluster(&self) -> u32 {
        let hi = u16::from_le_bytes(self.first_cluster_hi) as u32;
        let lo = u16::from_le_bytes(self.first_cluster_lo) as u32;
        (hi << 16) | lo
    }

    pub fn size(&self) -> u32 {
        u32::from_le_bytes(self.size)
    }

    pub fn new(
        name: ShortName,
        attributes: FileAttributes,
        first_cluster: u32,
        size: u32,
    ) -> Self {
        let mut entry = Self::empty();
        entry.name = name.base;
        entry.ext = name.ext;
        entry.attributes = attributes.bits();
        entry.first_cluster_hi = ((first_cluster >> 16) as u16).to_le_bytes();
        entry.first_cluster_lo = (first_cluster as u16).to_le_bytes();
        entry.size = size.to_le_bytes();
        entry
    }
}

/// A matched entry's location: the absolute byte offset of its 32-byte
/// slot within the image.
#[derive(Debug, Clone, Copy)]
pub struct EntryLocation {
    pub byte_offset: u64,
}

/// Zeroes a freshly allocated subdirectory cluster and writes its `.`
/// and `..` bootstrap entries into the first two 32-byte slots.
/// `parent_cluster` is `0` when the new directory's parent is the root
/// (this crate never creates subdirectories inside subdirectories, so
/// that's the only value callers pass today).
pub fn write_subdirectory_bootstrap(
    device: &mut dyn SectorDevice,
    geometry: &Geometry,
    cluster: u32,
    parent_cluster: u32,
) -> Result<(), FfatError> {
    let cluster_bytes = geometry.cluster_size_bytes() as usize;
    let mut buf = vec![0u8; cluster_bytes];

    let dot = DirEntry::new(ShortName::dot(), FileAttributes::DIRECTORY, cluster, 0);
    let dot_dot = DirEntry::new(
        ShortName::dot_dot(),
        FileAttributes::DIRECTORY,
        parent_cluster,
        0,
    );
    buf[0..ENTRY_SIZE].copy_from_slice(bytemuck::bytes_of(&dot));
    buf[ENTRY_SIZE..ENTRY_SIZE * 2].copy_from_slice(bytemuck::bytes_of(&dot_dot));

    let sector = geometry.cluster_to_sector(cluster) as u64;
    device.write_sectors(sector, geometry.sectors_per_cluster, &buf)?;
    Ok(())
}

/// Operates on the fixed root directory region described by `geometry`.
pub struct RootDirectory<'g> {
    geometry: &'g Geometry,
}

impl<'g> RootDirectory<'g> {
    pub fn new(geometry: &'g Geometry) -> Self {
        Self { geometry }
    }

    fn region_byte_range(&self) -> (u64, u64) {
        let start = self.geometry.first_root_sector as u64 * self.geometry.bytes_per_sector as u64;
        let len = self.geometry.root_dir_sectors as u64 * self.geometry.bytes_per_sector as u64;
        (start, len)
    }

    fn read_region(&self, device: &mut dyn SectorDevice) -> Result<Vec<u8>, FfatError> {
        let (_, len) = self.region_byte_range();
        let mut buf = vec![0u8; len as usize];
        device.read_sectors(
            self.geometry.first_root_sector as u64,
            self.geometry.root_dir_sectors,
            &mut buf,
        )?;
        Ok(buf)
    }

    fn write_entry_bytes(
        &self,
        device: &mut dyn SectorDevice,
        byte_offset: u64,
        entry: &DirEntry,
    ) -> Result<(), FfatError> {
        let bps = self.geometry.bytes_per_sector as u64;
        let sector = byte_offset / bps;
        let within = (byte_offset % bps) as usize;
        let mut buf = vec![0u8; bps as usize];
        device.read_sector(sector, &mut buf)?;
        buf[within..within + ENTRY_SIZE].copy_from_slice(bytemuck::bytes_of(entry));
        device.write_sector(sector, &buf)?;
        Ok(())
    }

    /// Scans the root directory, returning every active (non-deleted,
    /// non-LFN) entry with its location, stopping at the first
    /// end-of-directory sentinel.
    pub fn scan(
        &self,
        device: &mut dyn SectorDevice,
    ) -> Result<Vec<(EntryLocation, DirEntry)>, FfatError> {
        let region = self.read_region(device)?;
        let (start, _) = self.region_byte_range();
        let mut out = Vec::new();

        for i in 0..self.geometry.root_entry_count as usize {
            let slice = &region[i * ENTRY_SIZE..(i + 1) * ENTRY_SIZE];
            let entry: DirEntry = *bytemuck::from_bytes(slice);
            if entry.is_end_of_directory() {
                break;
            }
            if entry.is_deleted() || entry.is_lfn() {
                continue;
            }
            out.push((
                EntryLocation {
                    byte_offset: start + (i * ENTRY_SIZE) as u64,
                },
                entry,
            ));
        }
        Ok(out)
    }

    /// Finds the entry matching `name`, if any.
    pub fn find(
        &self,
        device: &mut dyn SectorDevice,
        name: &ShortName,
    ) -> Result<Option<(EntryLocation, DirEntry)>, FfatError> {
        Ok(self
            .scan(device)?
            .into_iter()
            .find(|(_, e)| e.name == name.base && e.ext == name.ext))
    }

    /// Finds the first free slot (end-of-directory or deleted), without
    /// regard to the end-sentinel invariant beyond what's needed to
    /// identify the slot: a deleted slot may be reused in place; an
    /// end-of-directory slot becomes active and the *next* slot is left
    /// untouched, preserving the sentinel.
    fn find_free_slot(&self, device: &mut dyn SectorDevice) -> Result<usize, FfatError> {
        let region = self.read_region(device)?;
        for i in 0..self.geometry.root_entry_count as usize {
            let first_byte = region[i * ENTRY_SIZE];
            if first_byte == ENTRY_FREE || first_byte == ENTRY_DELETED {
                return Ok(i);
            }
        }
        Err(FfatError::DirectoryFull)
    }

    /// Writes `entry` into the first free slot, returning its location.
    pub fn create_entry(
        &self,
        device: &mut dyn SectorDevice,
        entry: DirEntry,
    ) -> Result<EntryLocation, FfatError> {
        let index = self.find_free_slot(device)?;
        let (start, _) = self.region_byte_range();
        let byte_offset = start + (index * ENTRY_SIZE) as u64;
        self.write_entry_bytes(device, byte_offset, &entry)?;
        Ok(EntryLocation { byte_offset })
    }

    /// Marks the slot at `location` deleted (`0xE5`). Does not touch the
    /// FAT — callers that need the cluster chain freed call
    /// [`crate::fat::FatTable::free_chain`] first (see [`crate::ops::delete`]).
    pub fn delete_entry(
        &self,
        device: &mut dyn SectorDevice,
        location: EntryLocation,
    ) -> Result<(), FfatError> {
        let bps = self.geometry.bytes_per_sector as u64;
        let sector = location.byte_offset / bps;
        let within = (location.byte_offset % bps) as usize;
        let mut buf = vec![0u8; bps as usize];
        device.read_sector(sector, &mut buf)?;
        buf[within] = ENTRY_DELETED;
        device.write_sector(sector, &buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{format_image, FormatOptions};
    use crate::io::FileDevice;
    use std::fs::OpenOptions;

    fn open(path: &std::path::Path) -> FileDevice {
        let file = OpenOptions::new().read(true).write(true).open(path).unwrap();
        FileDevice::new(file, 512)
    }

    #[test]
    fn fresh_image_has_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.img");
        format_image(&path, FormatOptions::default()).unwrap();
        let mut dev = open(&path);
        let geom = crate::bpb::parse_bpb(&mut dev).unwrap();
        let root = RootDirectory::new(&geom);
        assert!(root.scan(&mut dev).unwrap().is_empty());
    }

    #[test]
    fn create_then_find() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.img");
        format_image(&path, FormatOptions::default()).unwrap();
        let mut dev = open(&path);
        let geom = crate::bpb::parse_bpb(&mut dev).unwrap();
        let root = RootDirectory::new(&geom);

        let name = ShortName::pack("FOO").unwrap();
        let entry = DirEntry::new(name, FileAttributes::DIRECTORY, 5, 0);
        root.create_entry(&mut dev, entry).unwrap();

        let (_, found) = root.find(&mut dev, &name).unwrap().unwrap();
        assert_eq!(found.first_cluster(), 5);
        assert!(found.attributes().contains(FileAttributes::DIRECTORY));
    }

    #[test]
    fn delete_marks_slot_but_preserves_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.img");
        format_image(&path, FormatOptions::default()).unwrap();
        let mut dev = open(&path);
        let geom = crate::bpb::parse_bpb(&mut dev).unwrap();
        let root = RootDirectory::new(&geom);

        let name = ShortName::pack("FOO").unwrap();
        let entry = DirEntry::new(name, FileAttributes::DIRECTORY, 5, 0);
        let loc = root.create_entry(&mut dev, entry).unwrap();
        root.delete_entry(&mut dev, loc).unwrap();

        assert!(root.find(&mut dev, &name).unwrap().is_none());

        let bps = geom.bytes_per_sector as u64;
        let sector = loc.byte_offset / bps;
        let within = (loc.byte_offset % bps) as usize;
        let mut buf = vec![0u8; bps as usize];
        dev.read_sector(sector, &mut buf).unwrap();
        assert_eq!(buf[within], ENTRY_DELETED);
        let reread: DirEntry = *bytemuck::from_bytes(&buf[within..within + ENTRY_SIZE]);
        assert_eq!(reread.first_cluster(), 5);
    }

    #[test]
    fn subdirectory_bootstrap_writes_dot_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.img");
        format_image(&path, FormatOptions::default()).unwrap();
        let mut dev = open(&path);
        let geom = crate::bpb::parse_bpb(&mut dev).unwrap();
        let fat = crate::fat::FatTable::new(&geom);

        let cluster = fat.alloc_free_cluster(&mut dev).unwrap();
        write_subdirectory_bootstrap(&mut dev, &geom, cluster, 0).unwrap();

        let sector = geom.cluster_to_sector(cluster) as u64;
        let mut buf = vec![0u8; geom.cluster_size_bytes() as usize];
        dev.read_sectors(sector, geom.sectors_per_cluster, &mut buf).unwrap();

        let dot: DirEntry = *bytemuck::from_bytes(&buf[0..ENTRY_SIZE]);
        let dot_dot: DirEntry = *bytemuck::from_bytes(&buf[ENTRY_SIZE..ENTRY_SIZE * 2]);
        assert_eq!(&dot.name, b".       ");
        assert_eq!(dot.first_cluster(), cluster);
        assert_eq!(&dot_dot.name, b"..      ");
        assert_eq!(dot_dot.first_cluster(), 0);
    }

    #[test]
    fn directory_full_after_filling_every_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.img");
        format_image(&path, FormatOptions::default()).unwrap();
        let mut dev = open(&path);
        let geom = crate::bpb::parse_bpb(&mut dev).unwrap();
        let root = RootDirectory::new(&geom);

        for i in 0..geom.root_entry_count {
            let name = ShortName::pack(&format!("F{i}")).unwrap();
            let entry = DirEntry::new(name, FileAttributes::empty(), 0, 0);
            root.create_entry(&mut dev, entry).unwrap();
        }
        let name = ShortName::pack("OVERFLOW").unwrap();
        let entry = DirEntry::new(name, FileAttributes::empty(), 0, 0);
        assert!(matches!(
            root.create_entry(&mut dev, entry),
            Err(FfatError::DirectoryFull)
        ));
    }
}
