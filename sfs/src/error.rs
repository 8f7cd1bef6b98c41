//! Error kinds shared by every engine operation.

use std::fmt;
use std::io;

/// An error produced by the block device or the filesystem engine.
#[derive(Debug)]
pub enum Error {
    /// A bad handle, out-of-range block/inode index, or missing buffer.
    BadArgs,
    /// The underlying read/write/seek on the backing file failed.
    Io(io::Error),
    /// Superblock verification failed at mount time.
    BadSuperblock,
    /// `format`/`mount` attempted on a device that is already mounted.
    AlreadyMounted,
    /// An operation that requires a mounted filesystem was attempted without one.
    NotMounted,
    /// No free inode (`create`) or no free data block (`write`).
    NoSpace,
    /// The targeted inode slot has `valid == 0`.
    InvalidInode,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadArgs => write!(fmt, "invalid arguments"),
            Self::Io(e) => write!(fmt, "I/O error: {e}"),
            Self::BadSuperblock => write!(fmt, "invalid superblock"),
            Self::AlreadyMounted => write!(fmt, "device already mounted"),
            Self::NotMounted => write!(fmt, "device not mounted"),
            Self::NoSpace => write!(fmt, "no space left"),
            Self::InvalidInode => write!(fmt, "invalid inode"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shorthand result type used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
