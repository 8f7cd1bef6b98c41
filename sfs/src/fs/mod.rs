//! Filesystem handle, geometry derivation, format/mount/unmount, and the
//! in-memory free-block bitmap.

mod alloc;
mod io;
mod remove;

use crate::block::{BlockDevice, BLOCK_SIZE};
use crate::codec::{Inode, InodeTableBlock, Superblock, IndirectBlock, DIRECT_POINTERS, MAGIC_NUMBER};
use crate::error::{Error, Result};
use utils::util::ceil_division;

/// Number of inodes packed into one inode-table block.
const INODES_PER_BLOCK: u32 = crate::codec::INODES_PER_BLOCK as u32;

/// Maximum logical file size: 5 direct blocks plus 1024 indirect blocks.
pub const MAX_FILE_SIZE: u64 =
    (DIRECT_POINTERS as u64) * (BLOCK_SIZE as u64) + 1024 * (BLOCK_SIZE as u64);

/// A mounted SimpleFS handle: a copy of the superblock plus the in-memory
/// free-block bitmap reconstructed at mount time. Every operation takes the
/// attached `BlockDevice` as an explicit parameter rather than storing a
/// reference to it, so the handle never needs a lifetime tied to the
/// device.
pub struct FileSystem {
    meta: Superblock,
    /// `true` means the block is free.
    bitmap: Vec<bool>,
}

/// Derives the single-group geometry for a device of `total_blocks` blocks.
fn derive_geometry(total_blocks: u32) -> Superblock {
    let inode_blocks = ceil_div_ratio(total_blocks);
    let inodes = inode_blocks * INODES_PER_BLOCK;
    Superblock {
        magic_number: MAGIC_NUMBER,
        total_blocks,
        total_inodes: inodes,
        blocks: total_blocks,
        inode_blocks,
        inodes,
    }
}

/// `ceil(0.10 * total_blocks)`, computed in integer arithmetic as
/// `ceil(total_blocks / 10)` to avoid floating-point rounding at the block
/// boundary.
fn ceil_div_ratio(total_blocks: u32) -> u32 {
    ceil_division(total_blocks, 10)
}

/// Verifies a superblock read from disk against the attached device's own
/// idea of its block count.
fn verify_superblock(sb: &Superblock, device_blocks: u32) -> bool {
    sb.magic_number == MAGIC_NUMBER
        && sb.inode_blocks == ceil_div_ratio(sb.total_blocks)
        && sb.inodes == sb.inode_blocks * INODES_PER_BLOCK
        && sb.total_blocks == device_blocks
        && sb.inode_blocks < sb.total_blocks
}

/// Formats `device`: derives geometry, writes the superblock to block 0,
/// and zeroes every other block. Fails if the device is mounted.
pub fn format(device: &mut BlockDevice) -> Result<bool> {
    if device.is_mounted() {
        return Err(Error::AlreadyMounted);
    }
    let meta = derive_geometry(device.blocks());
    if 1 + meta.inode_blocks > meta.total_blocks {
        return Ok(false);
    }
    device.write(0, &meta.to_bytes())?;
    let zero = [0u8; BLOCK_SIZE];
    for b in 1..meta.total_blocks {
        device.write(b, &zero)?;
    }
    Ok(true)
}

/// Mounts `device`: verifies its superblock, attaches it, and rebuilds the
/// free-block bitmap from the inode table.
pub fn mount(device: &mut BlockDevice) -> Result<FileSystem> {
    if device.is_mounted() {
        return Err(Error::AlreadyMounted);
    }
    let mut buf = [0u8; BLOCK_SIZE];
    device.read(0, &mut buf)?;
    let meta = Superblock::from_bytes(&buf);
    if !verify_superblock(&meta, device.blocks()) {
        return Err(Error::BadSuperblock);
    }
    let bitmap = build_bitmap(device, &meta)?;
    device.set_mounted(true);
    Ok(FileSystem { meta, bitmap })
}

/// Releases the bitmap and detaches `device`. A no-op if already unmounted.
pub fn unmount(device: &mut BlockDevice) {
    device.set_mounted(false);
}

fn build_bitmap(device: &mut BlockDevice, meta: &Superblock) -> Result<Vec<bool>> {
    let total = meta.total_blocks as usize;
    let mut bitmap = vec![false; total];
    bitmap[(1 + meta.inode_blocks as usize)..total].fill(true);
    let mut buf = [0u8; BLOCK_SIZE];
    for table_block in 1..(1 + meta.inode_blocks) {
        device.read(table_block, &mut buf)?;
        let table = InodeTableBlock::from_bytes(&buf);
        for inode in table.inodes.iter() {
            if !inode.is_valid() {
                continue;
            }
            mark_inode_used(device, meta, inode, &mut bitmap)?;
        }
    }
    Ok(bitmap)
}

/// Marks every block referenced by `inode` as non-free in `bitmap`.
/// Malformed direct pointers (out of the data range) are skipped rather
/// than treated as an error.
fn mark_inode_used(
    device: &mut BlockDevice,
    meta: &Superblock,
    inode: &Inode,
    bitmap: &mut [bool],
) -> Result<()> {
    let data_start = 1 + meta.inode_blocks;
    for &ptr in inode.direct.iter() {
        if ptr != 0 && is_data_block(ptr, data_start, meta.total_blocks) {
            bitmap[ptr as usize] = false;
        }
    }
    if (inode.size as u64) > DIRECT_POINTERS as u64 * BLOCK_SIZE as u64 {
        if inode.indirect != 0 && is_data_block(inode.indirect, data_start, meta.total_blocks) {
            bitmap[inode.indirect as usize] = false;
        }
        if inode.indirect != 0 {
            let mut buf = [0u8; BLOCK_SIZE];
            device.read(inode.indirect, &mut buf)?;
            let indirect = IndirectBlock::from_bytes(&buf);
            let used = indirect_pointer_count(inode.size);
            for &ptr in indirect.pointers.iter().take(used) {
                if ptr != 0 && is_data_block(ptr, data_start, meta.total_blocks) {
                    bitmap[ptr as usize] = false;
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn is_data_block(b: u32, data_start: u32, total_blocks: u32) -> bool {
    b >= data_start && b < total_blocks
}

/// Number of indirect pointers referenced by a file of `size` bytes, i.e.
/// `ceil((size - 5*4096) / 4096)`.
pub(crate) fn indirect_pointer_count(size: u32) -> usize {
    let direct_bytes = DIRECT_POINTERS as u32 * BLOCK_SIZE as u32;
    if size <= direct_bytes {
        return 0;
    }
    ceil_division(size - direct_bytes, BLOCK_SIZE as u32) as usize
}

impl FileSystem {
    /// The superblock captured at mount time.
    pub fn meta(&self) -> &Superblock {
        &self.meta
    }
}

/// Locates the inode-table block and in-block slot for a global inode
/// number, failing if it falls outside the inode table.
pub(crate) fn locate(fs: &FileSystem, inode_number: u32) -> Result<(u32, usize)> {
    let table_block = 1 + inode_number / INODES_PER_BLOCK;
    if table_block > fs.meta.inode_blocks {
        return Err(Error::BadArgs);
    }
    Ok((table_block, (inode_number % INODES_PER_BLOCK) as usize))
}

pub use alloc::create;
pub use io::{read, write};
pub use remove::{remove, stat};
