//! The block device: fixed-size block I/O over a backing host file.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Size in bytes of every block transferred to or from the device.
pub const BLOCK_SIZE: usize = 4096;

/// A raw block buffer, the only place a 4096-byte on-disk block is held as
/// undifferentiated bytes; every other view (superblock, inode table,
/// indirect pointers) is decoded from or encoded into one of these.
pub type RawBlock = [u8; BLOCK_SIZE];

/// A block-addressable backing file.
///
/// Tracks the requested block count, an I/O counter pair used by the
/// `debug` surface, and the `mounted` flag that is the single source of
/// truth for the device's lifecycle (`format` requires it clear, `mount`
/// sets it, `unmount` clears it).
pub struct BlockDevice {
    file: File,
    blocks: u32,
    mounted: bool,
    reads: u64,
    writes: u64,
}

impl BlockDevice {
    /// Opens (creating if absent) the backing file at `path` as a device of
    /// `blocks` fixed-size blocks.
    ///
    /// Fails if the path cannot be opened read-write, or if `blocks` is a
    /// pathological value that could never back a real image.
    pub fn open(path: &Path, blocks: u32) -> Result<Self> {
        if blocks == u32::MAX {
            return Err(Error::BadArgs);
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            file,
            blocks,
            mounted: false,
            reads: 0,
            writes: 0,
        })
    }

    /// Releases the backing file. Present for contract symmetry with
    /// `open`/`close`; dropping the value has the same effect.
    pub fn close(self) {}

    /// Total number of addressable blocks.
    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Whether a `FileSystem` is currently attached to this device.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Sets the mount flag. Only `mount`/`unmount` should call this.
    pub fn set_mounted(&mut self, mounted: bool) {
        self.mounted = mounted;
    }

    /// Number of successful block reads performed since `open`.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Number of successful block writes performed since `open`.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Reads block `b` into `buf`. Seeks to `b * BLOCK_SIZE` first.
    pub fn read(&mut self, b: u32, buf: &mut RawBlock) -> Result<usize> {
        if b >= self.blocks {
            return Err(Error::BadArgs);
        }
        self.file.seek(SeekFrom::Start(b as u64 * BLOCK_SIZE as u64))?;
        self.file.read_exact(buf)?;
        self.reads += 1;
        Ok(BLOCK_SIZE)
    }

    /// Writes `buf` to block `b`. Seeks to `b * BLOCK_SIZE` first.
    pub fn write(&mut self, b: u32, buf: &RawBlock) -> Result<usize> {
        if b >= self.blocks {
            return Err(Error::BadArgs);
        }
        self.file.seek(SeekFrom::Start(b as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(buf)?;
        self.writes += 1;
        Ok(BLOCK_SIZE)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("sfs-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn read_write_round_trip() {
        let path = temp_path("block-rw");
        let mut dev = BlockDevice::open(&path, 4).unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0] = 0x42;
        assert_eq!(dev.write(1, &buf).unwrap(), BLOCK_SIZE);
        let mut out = [0u8; BLOCK_SIZE];
        assert_eq!(dev.read(1, &mut out).unwrap(), BLOCK_SIZE);
        assert_eq!(buf, out);
        assert_eq!(dev.reads(), 1);
        assert_eq!(dev.writes(), 1);
        drop(dev);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn out_of_range_is_bad_args() {
        let path = temp_path("block-oob");
        let mut dev = BlockDevice::open(&path, 2).unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        assert!(matches!(dev.read(2, &mut buf), Err(Error::BadArgs)));
        assert!(matches!(dev.write(5, &buf), Err(Error::BadArgs)));
        assert_eq!(dev.reads(), 0);
        assert_eq!(dev.writes(), 0);
        drop(dev);
        let _ = fs::remove_file(&path);
    }
}
