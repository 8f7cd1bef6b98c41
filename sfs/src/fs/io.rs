//! The byte-range read/write path: maps `(inode, offset, length)` onto a
//! sequence of block I/Os through `direct[0..5]` and one indirect block of
//! 1024 pointers, allocating data blocks lazily on write.

use super::{locate, FileSystem, MAX_FILE_SIZE};
use crate::block::{BlockDevice, BLOCK_SIZE};
use crate::codec::{Inode, InodeTableBlock, IndirectBlock, DIRECT_POINTERS};
use crate::error::Result;

/// Resolves block index `k` to a physical block number, or `None` if it is
/// a hole (never written).
fn resolve_read(
    device: &mut BlockDevice,
    inode: &Inode,
    k: usize,
) -> Result<Option<u32>> {
    if k < DIRECT_POINTERS {
        let ptr = inode.direct[k];
        return Ok((ptr != 0).then_some(ptr));
    }
    if inode.indirect == 0 {
        return Ok(None);
    }
    let mut buf = [0u8; BLOCK_SIZE];
    device.read(inode.indirect, &mut buf)?;
    let indirect = IndirectBlock::from_bytes(&buf);
    let ptr = indirect.pointers[k - DIRECT_POINTERS];
    Ok((ptr != 0).then_some(ptr))
}

/// Reads up to `buf.len()` bytes of `inode_number`'s contents starting at
/// `offset`, clamped to the inode's logical size. Returns `-1` if the inode
/// is invalid or out of range.
pub fn read(
    fs: &FileSystem,
    device: &mut BlockDevice,
    inode_number: u32,
    buf: &mut [u8],
    offset: u64,
) -> Result<i64> {
    let (table_block, slot) = match locate(fs, inode_number) {
        Ok(v) => v,
        Err(_) => return Ok(-1),
    };
    let mut tbuf = [0u8; BLOCK_SIZE];
    device.read(table_block, &mut tbuf)?;
    let table = InodeTableBlock::from_bytes(&tbuf);
    let inode = table.inodes[slot];
    if !inode.is_valid() {
        return Ok(-1);
    }
    if offset >= inode.size as u64 {
        return Ok(0);
    }
    let length = (buf.len() as u64).min(inode.size as u64 - offset) as usize;

    let mut copied = 0usize;
    while copied < length {
        let pos = offset as usize + copied;
        let k = pos / BLOCK_SIZE;
        let block_off = pos % BLOCK_SIZE;
        let chunk = (BLOCK_SIZE - block_off).min(length - copied);

        match resolve_read(device, &inode, k)? {
            Some(block) => {
                let mut data = [0u8; BLOCK_SIZE];
                device.read(block, &mut data)?;
                buf[copied..copied + chunk].copy_from_slice(&data[block_off..block_off + chunk]);
            }
            None => {
                buf[copied..copied + chunk].fill(0);
            }
        }
        copied += chunk;
    }
    Ok(copied as i64)
}

/// Resolves block index `k` for writing, allocating a data block (and, the
/// first time `k >= 5` is needed, the indirect block itself) from the
/// bitmap if not already present. Returns `None` if no free block remains.
fn resolve_or_allocate(
    fs: &mut FileSystem,
    device: &mut BlockDevice,
    inode: &mut Inode,
    k: usize,
) -> Result<Option<u32>> {
    if k < DIRECT_POINTERS {
        if inode.direct[k] == 0 {
            let Some(block) = allocate_block(fs) else {
                return Ok(None);
            };
            inode.direct[k] = block;
        }
        return Ok(Some(inode.direct[k]));
    }

    if inode.indirect == 0 {
        let Some(block) = allocate_block(fs) else {
            return Ok(None);
        };
        device.write(block, &IndirectBlock::zeroed().to_bytes())?;
        inode.indirect = block;
    }

    let mut buf = [0u8; BLOCK_SIZE];
    device.read(inode.indirect, &mut buf)?;
    let mut indirect = IndirectBlock::from_bytes(&buf);
    let slot = k - DIRECT_POINTERS;
    if indirect.pointers[slot] == 0 {
        let Some(block) = allocate_block(fs) else {
            return Ok(None);
        };
        indirect.pointers[slot] = block;
        device.write(inode.indirect, &indirect.to_bytes())?;
    }
    Ok(Some(indirect.pointers[slot]))
}

/// Scans the bitmap in ascending block-number order for the first free data
/// block, marking it used.
fn allocate_block(fs: &mut FileSystem) -> Option<u32> {
    let data_start = 1 + fs.meta.inode_blocks as usize;
    for b in data_start..fs.bitmap.len() {
        if fs.bitmap[b] {
            fs.bitmap[b] = false;
            return Some(b as u32);
        }
    }
    None
}

/// Writes `buf` into `inode_number` starting at `offset`, allocating data
/// blocks as needed. Stops early (without failing the call) if the device
/// runs out of free blocks, returning the short count. Returns `-1` if the
/// inode is invalid or out of range.
pub fn write(
    fs: &mut FileSystem,
    device: &mut BlockDevice,
    inode_number: u32,
    buf: &[u8],
    offset: u64,
) -> Result<i64> {
    let (table_block, slot) = match locate(fs, inode_number) {
        Ok(v) => v,
        Err(_) => return Ok(-1),
    };
    let mut tbuf = [0u8; BLOCK_SIZE];
    device.read(table_block, &mut tbuf)?;
    let mut table = InodeTableBlock::from_bytes(&tbuf);
    if !table.inodes[slot].is_valid() {
        return Ok(-1);
    }
    let mut inode = table.inodes[slot];

    let length = buf.len();
    let max_written = (MAX_FILE_SIZE.saturating_sub(offset)).min(length as u64) as usize;
    let mut written = 0usize;
    while written < max_written {
        let pos = offset as usize + written;
        let k = pos / BLOCK_SIZE;
        let block_off = pos % BLOCK_SIZE;
        let chunk = (BLOCK_SIZE - block_off).min(length - written);

        let Some(block) = resolve_or_allocate(fs, device, &mut inode, k)? else {
            break;
        };

        if block_off == 0 && chunk == BLOCK_SIZE {
            let mut data = [0u8; BLOCK_SIZE];
            data.copy_from_slice(&buf[written..written + chunk]);
            device.write(block, &data)?;
        } else {
            let mut data = [0u8; BLOCK_SIZE];
            device.read(block, &mut data)?;
            data[block_off..block_off + chunk].copy_from_slice(&buf[written..written + chunk]);
            device.write(block, &data)?;
        }
        written += chunk;
    }

    inode.size = inode.size.max(offset as u32 + written as u32);
    table.inodes[slot] = inode;
    device.write(table_block, &table.to_bytes())?;
    Ok(written as i64)
}

#[cfg(test)]
mod test {
    use crate::fs::{create, format, mount, read, write};
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("sfs-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn tiny_write_read_round_trip() {
        let path = temp_path("io-tiny");
        let mut device = crate::block::BlockDevice::open(&path, 20).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let n = create(&mut fs, &mut device).unwrap() as u32;
        assert_eq!(write(&mut fs, &mut device, n, b"hello", 0).unwrap(), 5);
        assert_eq!(crate::fs::stat(&fs, &mut device, n).unwrap(), 5);
        let mut out = [0u8; 5];
        assert_eq!(read(&fs, &mut device, n, &mut out, 0).unwrap(), 5);
        assert_eq!(&out, b"hello");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn offset_write_leaves_hole_as_zero() {
        let path = temp_path("io-hole");
        let mut device = crate::block::BlockDevice::open(&path, 20).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let n = create(&mut fs, &mut device).unwrap() as u32;
        assert_eq!(write(&mut fs, &mut device, n, b"end", 4096).unwrap(), 3);
        let mut out = vec![0u8; 4099];
        let r = read(&fs, &mut device, n, &mut out, 0).unwrap();
        assert_eq!(r, 4099);
        assert!(out[..4096].iter().all(|&b| b == 0));
        assert_eq!(&out[4096..], b"end");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn indirect_crossing_round_trip() {
        let path = temp_path("io-indirect");
        let mut device = crate::block::BlockDevice::open(&path, 200).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let n = create(&mut fs, &mut device).unwrap() as u32;
        let pattern: Vec<u8> = (0..21000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(
            write(&mut fs, &mut device, n, &pattern, 0).unwrap(),
            21000
        );
        assert_eq!(crate::fs::stat(&fs, &mut device, n).unwrap(), 21000);
        let mut out = vec![0u8; 21000];
        assert_eq!(
            read(&fs, &mut device, n, &mut out, 0).unwrap(),
            21000
        );
        assert_eq!(out, pattern);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn write_exhaustion_returns_short_count() {
        let path = temp_path("io-exhaust");
        // 1 superblock + 1 inode-table block + 3 data blocks.
        let mut device = crate::block::BlockDevice::open(&path, 5).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let n = create(&mut fs, &mut device).unwrap() as u32;
        let pattern = vec![0x7Au8; 20000];
        let written = write(&mut fs, &mut device, n, &pattern, 0).unwrap();
        assert_eq!(written, 3 * crate::block::BLOCK_SIZE as i64);
        assert_eq!(crate::fs::stat(&fs, &mut device, n).unwrap(), written);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn write_caps_at_max_file_size() {
        use crate::fs::MAX_FILE_SIZE;

        let path = temp_path("io-max-size");
        // Enough data blocks to back a file at the maximum size and then some.
        let mut device = crate::block::BlockDevice::open(&path, 1200).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let n = create(&mut fs, &mut device).unwrap() as u32;
        let pattern = vec![0x5Cu8; MAX_FILE_SIZE as usize + 4096];
        let written = write(&mut fs, &mut device, n, &pattern, 0).unwrap();
        assert_eq!(written, MAX_FILE_SIZE as i64);
        assert_eq!(crate::fs::stat(&fs, &mut device, n).unwrap(), written);
        let _ = std::fs::remove_file(&path);
    }
}
