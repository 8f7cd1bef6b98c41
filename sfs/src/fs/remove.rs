//! Reclaim (`remove`) and metadata query (`stat`).

use super::{indirect_pointer_count, is_data_block, locate, FileSystem};
use crate::block::{BlockDevice, BLOCK_SIZE};
use crate::codec::{InodeTableBlock, IndirectBlock, DIRECT_POINTERS};
use crate::error::{Error, Result};

/// Frees every block the inode references (direct, indirect, and the
/// indirect block itself) and clears the inode. Fails if the inode number
/// is out of range or the slot is already free.
pub fn remove(fs: &mut FileSystem, device: &mut BlockDevice, inode_number: u32) -> Result<bool> {
    let (table_block, slot) = locate(fs, inode_number)?;
    let mut buf = [0u8; BLOCK_SIZE];
    device.read(table_block, &mut buf)?;
    let mut table = InodeTableBlock::from_bytes(&buf);
    let inode = &mut table.inodes[slot];
    if !inode.is_valid() {
        return Err(Error::InvalidInode);
    }

    let data_start = 1 + fs.meta.inode_blocks;
    let total_blocks = fs.meta.total_blocks;
    for &ptr in inode.direct.iter() {
        if is_data_block(ptr, data_start, total_blocks) {
            fs.bitmap[ptr as usize] = true;
        }
    }
    if (inode.size as u64) > DIRECT_POINTERS as u64 * BLOCK_SIZE as u64
        && inode.indirect != 0 {
            if is_data_block(inode.indirect, data_start, total_blocks) {
                fs.bitmap[inode.indirect as usize] = true;
            }
            let mut ind_buf = [0u8; BLOCK_SIZE];
            device.read(inode.indirect, &mut ind_buf)?;
            let indirect = IndirectBlock::from_bytes(&ind_buf);
            let used = indirect_pointer_count(inode.size);
            for &ptr in indirect.pointers.iter().take(used) {
                if is_data_block(ptr, data_start, total_blocks) {
                    fs.bitmap[ptr as usize] = true;
                }
            }
        }

    inode.valid = 0;
    inode.size = 0;
    device.write(table_block, &table.to_bytes())?;
    Ok(true)
}

/// Returns the inode's logical size, or `-1` if it is out of range or not
/// allocated.
pub fn stat(fs: &FileSystem, device: &mut BlockDevice, inode_number: u32) -> Result<i64> {
    let (table_block, slot) = match locate(fs, inode_number) {
        Ok(v) => v,
        Err(_) => return Ok(-1),
    };
    let mut buf = [0u8; BLOCK_SIZE];
    device.read(table_block, &mut buf)?;
    let table = InodeTableBlock::from_bytes(&buf);
    let inode = &table.inodes[slot];
    if !inode.is_valid() {
        return Ok(-1);
    }
    Ok(inode.size as i64)
}

#[cfg(test)]
mod test {
    use crate::fs::{create, format, mount, read, remove, stat, write};
    use std::env;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("sfs-test-{}-{}", std::process::id(), name))
    }

    #[test]
    fn remove_then_create_reuses_number() {
        let path = temp_path("remove-reuse");
        let mut device = crate::block::BlockDevice::open(&path, 20).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let n = create(&mut fs, &mut device).unwrap();
        assert!(remove(&mut fs, &mut device, n as u32).unwrap());
        let n2 = create(&mut fs, &mut device).unwrap();
        assert_eq!(n, n2);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn stat_invalid_inode_is_minus_one() {
        let path = temp_path("stat-invalid");
        let mut device = crate::block::BlockDevice::open(&path, 20).unwrap();
        format(&mut device).unwrap();
        let fs = mount(&mut device).unwrap();
        assert_eq!(stat(&fs, &mut device, 0).unwrap(), -1);
        assert_eq!(stat(&fs, &mut device, 10_000).unwrap(), -1);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn remove_frees_blocks_for_reuse() {
        let path = temp_path("remove-frees");
        let mut device = crate::block::BlockDevice::open(&path, 200).unwrap();
        format(&mut device).unwrap();
        let mut fs = mount(&mut device).unwrap();
        let n = create(&mut fs, &mut device).unwrap() as u32;
        let data = vec![0xAB; 21000];
        write(&mut fs, &mut device, n, &data, 0).unwrap();
        assert!(remove(&mut fs, &mut device, n).unwrap());
        let free_after = fs.bitmap.iter().filter(|&&b| b).count();

        let n2 = create(&mut fs, &mut device).unwrap() as u32;
        let mut out = vec![0u8; 21000];
        let written = write(&mut fs, &mut device, n2, &data, 0).unwrap();
        assert_eq!(written, 21000);
        let read_back = read(&fs, &mut device, n2, &mut out, 0).unwrap();
        assert_eq!(read_back, 21000);
        assert_eq!(out, data);
        assert!(free_after >= 7);
        let _ = std::fs::remove_file(&path);
    }
}
