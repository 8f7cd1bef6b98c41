//! `sfs <diskfile> <nblocks>` — opens (or creates) a disk image and runs the
//! SimpleFS shell against it.

use sfs::BlockDevice;
use std::path::PathBuf;
use std::process::exit;
use utils::args;

fn main() {
    let (bin, mut rest) = args();
    let (Some(diskfile), Some(nblocks_arg)) = (rest.next(), rest.next()) else {
        eprintln!("Usage: {bin} <diskfile> <nblocks>");
        exit(1);
    };
    let Some(nblocks_arg) = nblocks_arg.to_str() else {
        eprintln!("Usage: {bin} <diskfile> <nblocks>");
        exit(1);
    };
    let Ok(nblocks) = nblocks_arg.parse::<u32>() else {
        eprintln!("Usage: {bin} <diskfile> <nblocks>");
        exit(1);
    };

    let path = PathBuf::from(diskfile);
    let device = BlockDevice::open(&path, nblocks).unwrap_or_else(|e| {
        eprintln!("{bin}: {}: {e}", path.display());
        exit(1);
    });

    sfs::shell::run(device);
}
