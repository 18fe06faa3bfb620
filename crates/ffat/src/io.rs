//! Sector-addressed I/O over an image file.
//!
//! [`SectorDevice`] is the seam between the engine and the backing
//! storage: every higher layer addresses the image in whole sectors,
//! never raw byte offsets, mirroring the classic BIOS view of a disk.
//! [`FileDevice`] is the only implementation this crate ships — it wraps
//! a [`std::fs::File`] and a fixed `bytes_per_sector`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// A block device addressed by sector number.
///
/// Implementations transfer exactly one sector per call; callers that
/// need several consecutive sectors loop over [`SectorDevice::read_sectors`]
/// / [`SectorDevice::write_sectors`] rather than requesting a bigger
/// buffer in one call — there is no buffering layer here, by design.
pub trait SectorDevice {
    fn bytes_per_sector(&self) -> u32;

    /// Reads one sector into `buf`. `buf` must be exactly
    /// `bytes_per_sector()` long.
    fn read_sector(&mut self, lba: u64, buf: &mut [u8]) -> std::io::Result<()>;

    /// Writes one sector from `buf`. `buf` must be exactly
    /// `bytes_per_sector()` long.
    fn write_sector(&mut self, lba: u64, buf: &[u8]) -> std::io::Result<()>;

    /// Reads `count` consecutive sectors starting at `lba` into `buf`.
    fn read_sectors(&mut self, lba: u64, count: u32, buf: &mut [u8]) -> std::io::Result<()> {
        let sector_size = self.bytes_per_sector() as usize;
        for i in 0..count as u64 {
            let chunk = &mut buf[i as usize * sector_size..(i as usize + 1) * sector_size];
            self.read_sector(lba + i, chunk)?;
        }
        Ok(())
    }

    /// Writes `count` consecutive sectors starting at `lba` from `buf`.
    fn write_sectors(&mut self, lba: u64, count: u32, buf: &[u8]) -> std::io::Result<()> {
        let sector_size = self.bytes_per_sector() as usize;
        for i in 0..count as u64 {
            let chunk = &buf[i as usize * sector_size..(i as usize + 1) * sector_size];
            self.write_sector(lba + i, chunk)?;
        }
        Ok(())
    }
}

/// A [`SectorDevice`] backed by a regular file.
///
/// The file is expected to already be open read-write; this type does
/// not itself create or truncate anything (the formatter does that
/// explicitly — see [`crate::format::format_image`]).
pub struct FileDevice {
    file: File,
    bytes_per_sector: u32,
}

impl FileDevice {
    pub fn new(file: File, bytes_per_sector: u32) -> Self {
        Self {
            file,
            bytes_per_sector,
        }
    }

    pub fn into_inner(self) -> File {
        self.file
    }

    pub fn get_ref(&self) -> &File {
        &self.file
    }
}

impl SectorDevice for FileDevice {
    fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    fn read_sector(&mut self, lba: u64, buf: &mut [u8]) -> std::io::Result<()> {
        debug_assert_eq!(buf.len(), self.bytes_per_sector as usize);
        let offset = lba * self.bytes_per_sector as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    fn write_sector(&mut self, lba: u64, buf: &[u8]) -> std::io::Result<()> {
        debug_assert_eq!(buf.len(), self.bytes_per_sector as usize);
        let offset = lba * self.bytes_per_sector as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn scratch_file(len: usize) -> File {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(&vec![0u8; len]).unwrap();
        f
    }

    #[test]
    fn sector_roundtrip() {
        let mut dev = FileDevice::new(scratch_file(512 * 4), 512);
        let mut sector = vec![0xAB; 512];
        dev.write_sector(2, &sector).unwrap();
        sector.fill(0);
        dev.read_sector(2, &mut sector).unwrap();
        assert!(sector.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn multi_sector_roundtrip() {
        let mut dev = FileDevice::new(scratch_file(512 * 4), 512);
        let data: Vec<u8> = (0..512u32 * 2).map(|i| (i % 251) as u8).collect();
        dev.write_sectors(1, 2, &data).unwrap();
        let mut readback = vec![0u8; 512 * 2];
        dev.read_sectors(1, 2, &mut readback).unwrap();
        assert_eq!(data, readback);
    }

    #[test]
    fn short_read_is_an_error() {
        let mut dev = FileDevice::new(scratch_file(256), 512);
        let mut buf = vec![0u8; 512];
        assert!(dev.read_sector(0, &mut buf).is_err());
    }
}
