//! Inode allocation: `create` scans the inode table for a free slot.

use super::FileSystem;
use crate::block::BlockDevice;
use crate::codec::{Inode, InodeTableBlock};
use crate::error::Result;

/// Scans the inode table in order for a `valid == 0` slot, marks it
/// allocated with a zeroed body, and returns its global inode number.
/// Returns `-1` if the table is full.
pub fn create(fs: &mut FileSystem, device: &mut BlockDevice) -> Result<i64> {
    for table_block in 1..(1 + fs.meta.inode_blocks) {
        let mut buf = [0u8; crate::block::BLOCK_SIZE];
        device.read(table_block, &mut buf)?;
        let mut table = InodeTableBlock::from_bytes(&buf);
        for (slot, inode) in table.inodes.iter_mut().enumerate() {
            if inode.is_valid() {
                continue;
            }
            *inode = Inode {
                valid: 1,
                size: 0,
                direct: [0; crate::codec::DIRECT_POINTERS],
                indirect: 0,
            };
            device.write(table_block, &table.to_bytes())?;
            let number = (table_block - 1) as i64 * super::INODES_PER_BLOCK as i64 + slot as i64;
            return Ok(number);
        }
    }
    Ok(-1)
}

#[cfg(test)]
mod test {
    use crate::fs::{format, mount};
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("sfs-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn create_returns_ascending_numbers() {
        let path = temp_path("alloc-ascending");
        let mut device = crate::block::BlockDevice::open(&path, 20).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        assert_eq!(super::create(&mut fs, &mut device).unwrap(), 0);
        assert_eq!(super::create(&mut fs, &mut device).unwrap(), 1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn create_exhausts_inode_table() {
        let path = temp_path("alloc-exhaust");
        // 1 superblock + 1 inode-table block (128 inodes) + data.
        let mut device = crate::block::BlockDevice::open(&path, 20).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let total_inodes = fs.meta.inodes;
        for expected in 0..total_inodes {
            assert_eq!(
                super::create(&mut fs, &mut device).unwrap(),
                expected as i64
            );
        }
        assert_eq!(super::create(&mut fs, &mut device).unwrap(), -1);
        let _ = std::fs::remove_file(&path);
    }
}
