use crate::name::NameError;

/// Errors produced by the volume engine.
///
/// Every fallible operation in this crate returns one of these variants;
/// none are retried internally and none trigger a rollback of partial
/// writes (see [`crate::fat::FatTable::set`] for the one place this
/// matters most).
#[derive(Debug, thiserror::Error)]
pub enum FfatError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("FAT32 images are not supported")]
    Fat32Unsupported,

    #[error("invalid 8.3 name: {0}")]
    InvalidName(#[from] NameError),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("root directory is full")]
    DirectoryFull,

    #[error("no free cluster available")]
    NoSpace,
}
