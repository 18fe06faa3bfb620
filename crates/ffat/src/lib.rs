//! A library for reading and mutating FAT12/FAT16 "super-floppy" disk
//! images: a single volume with no partition table, as produced by
//! classic floppy and small flash-media formatting tools.
//!
//! The crate is layered bottom-up:
//!
//! - [`codec`] — endian-aware integer reads/writes over byte slices.
//! - [`io`] — sector-addressed access to the backing file ([`io::SectorDevice`]).
//! - [`bpb`] — boot sector parsing into a [`bpb::Geometry`].
//! - [`fat`] — the FAT itself: per-cluster get/set, allocation, freeing.
//! - [`name`] — 8.3 short name packing.
//! - [`dir`] — the root directory region: scan, find, create, delete.
//! - [`format`] — writes a brand new image from scratch.
//! - [`ops`] — the operation surface the CLI drives.
//!
//! FAT32 images are detected and rejected rather than misread; see
//! [`error::FfatError::Fat32Unsupported`].

pub mod bpb;
pub mod codec;
pub mod dir;
pub mod error;
pub mod fat;
pub mod format;
pub mod io;
pub mod name;
pub mod ops;

pub use bpb::{FatType, Geometry};
pub use dir::{DirEntry, FileAttributes};
pub use error::FfatError;
pub use format::FormatOptions;
pub use name::ShortName;
