//! The interactive REPL: commands that parse text lines into engine calls
//! and print the shell's fixed-format responses.
//!
//! Line prompting uses `utils::prompt::prompt`; this shell only ever reads
//! plain command lines, so no password-hiding input mode is needed.

use crate::block::{BlockDevice, BLOCK_SIZE};
use crate::codec::Superblock;
use crate::fs::{self, FileSystem};
use std::fs::File;
use std::io::{Read, Write};

/// Runs the REPL against `device` until `exit`/`quit`/EOF.
pub fn run(mut device: BlockDevice) {
    let mut fs: Option<FileSystem> = None;

    while let Some(line) = utils::prompt::prompt("sfs> ") {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            continue;
        };
        let arg1 = parts.next();
        let arg2 = parts.next();

        match cmd {
            "debug" => do_debug(&mut device, &fs),
            "format" => do_format(&mut device, &mut fs),
            "mount" => do_mount(&mut device, &mut fs),
            "create" => do_create(&mut device, &mut fs),
            "remove" => do_remove(&mut device, &mut fs, arg1),
            "stat" => do_stat(&mut device, &fs, arg1),
            "cat" => do_cat(&mut device, &mut fs, arg1),
            "copyout" => do_copyout(&mut device, &mut fs, arg1, arg2),
            "copyin" => do_copyin(&mut device, &mut fs, arg1, arg2),
            "help" => do_help(),
            "exit" | "quit" => break,
            _ => {
                println!("Unknown command: {line}");
                println!("Type 'help' for a list of commands.");
            }
        }
    }

    if let Some(_fs) = fs.take() {
        fs::unmount(&mut device);
    }
}

/// Prints the superblock summary straight off the disk, independent of the
/// shell's own mount state.
fn do_debug(device: &mut BlockDevice, fs: &Option<FileSystem>) {
    let _ = fs;
    let mut buf = [0u8; BLOCK_SIZE];
    if device.read(0, &mut buf).is_err() {
        println!("debug failed!");
        return;
    }
    let meta = Superblock::from_bytes(&buf);
    println!("SuperBlock:");
    println!("    {} blocks", meta.blocks);
    println!("    {} inode blocks", meta.inode_blocks);
    println!("    {} inodes", meta.inodes);
}

fn do_format(device: &mut BlockDevice, fs: &mut Option<FileSystem>) {
    match fs::format(device) {
        Ok(true) => println!("disk formatted."),
        _ => println!("format failed!"),
    }
    let _ = fs;
}

fn do_mount(device: &mut BlockDevice, fs: &mut Option<FileSystem>) {
    match fs::mount(device) {
        Ok(mounted) => {
            *fs = Some(mounted);
            println!("disk mounted.");
        }
        Err(_) => println!("mount failed!"),
    }
}

fn do_create(device: &mut BlockDevice, fs: &mut Option<FileSystem>) {
    let Some(fs) = fs else {
        println!("create failed!");
        return;
    };
    match fs::create(fs, device) {
        Ok(n) if n >= 0 => println!("created inode {n}."),
        _ => println!("create failed!"),
    }
}

fn do_remove(device: &mut BlockDevice, fs: &mut Option<FileSystem>, arg1: Option<&str>) {
    let (Some(fs), Some(arg1)) = (fs, arg1) else {
        println!("Usage: remove <inode>");
        return;
    };
    let Ok(inode_number) = arg1.parse::<u32>() else {
        println!("remove failed!");
        return;
    };
    match fs::remove(fs, device, inode_number) {
        Ok(true) => println!("removed inode {inode_number}."),
        _ => println!("remove failed!"),
    }
}

fn do_stat(device: &mut BlockDevice, fs: &Option<FileSystem>, arg1: Option<&str>) {
    let (Some(fs), Some(arg1)) = (fs, arg1) else {
        println!("Usage: stat <inode>");
        return;
    };
    let Ok(inode_number) = arg1.parse::<u32>() else {
        println!("stat failed!");
        return;
    };
    match fs::stat(fs, device, inode_number) {
        Ok(bytes) if bytes >= 0 => println!("inode {inode_number} has size {bytes} bytes."),
        _ => println!("stat failed!"),
    }
}

/// Streams `inode_number`'s contents into `path`; shared by `copyout` and
/// `cat`, which only differ in the destination.
fn copyout(device: &mut BlockDevice, fs: &mut FileSystem, inode_number: u32, path: &str) -> bool {
    let Ok(mut out) = File::create(path) else {
        return false;
    };
    let mut offset = 0u64;
    let mut buf = vec![0u8; 4 * 1024];
    loop {
        let result = fs::read(fs, device, inode_number, &mut buf, offset).unwrap_or(-1);
        if result <= 0 {
            break;
        }
        let _ = out.write_all(&buf[..result as usize]);
        offset += result as u64;
    }
    println!("{offset} bytes copied");
    true
}

fn do_cat(device: &mut BlockDevice, fs: &mut Option<FileSystem>, arg1: Option<&str>) {
    let (Some(fs), Some(arg1)) = (fs, arg1) else {
        println!("Usage: cat <inode>");
        return;
    };
    let Ok(inode_number) = arg1.parse::<u32>() else {
        println!("cat failed!");
        return;
    };
    // Streams through stdout the same way `copyout` streams to a file.
    let mut offset = 0u64;
    let mut buf = vec![0u8; 4 * 1024];
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    loop {
        let result = fs::read(fs, device, inode_number, &mut buf, offset).unwrap_or(-1);
        if result <= 0 {
            break;
        }
        let _ = out.write_all(&buf[..result as usize]);
        offset += result as u64;
    }
}

fn do_copyout(
    device: &mut BlockDevice,
    fs: &mut Option<FileSystem>,
    arg1: Option<&str>,
    arg2: Option<&str>,
) {
    let (Some(fs), Some(arg1), Some(arg2)) = (fs, arg1, arg2) else {
        println!("Usage: copyout <inode> <file>");
        return;
    };
    let Ok(inode_number) = arg1.parse::<u32>() else {
        println!("copyout failed!");
        return;
    };
    if !copyout(device, fs, inode_number, arg2) {
        println!("copyout failed!");
    }
}

fn do_copyin(
    device: &mut BlockDevice,
    fs: &mut Option<FileSystem>,
    arg1: Option<&str>,
    arg2: Option<&str>,
) {
    let (Some(fs), Some(arg1), Some(arg2)) = (fs, arg1, arg2) else {
        println!("Usage: copyin <file> <inode>");
        return;
    };
    let Ok(inode_number) = arg2.parse::<u32>() else {
        println!("copyin failed!");
        return;
    };
    let Ok(mut input) = File::open(arg1) else {
        println!("copyin failed!");
        return;
    };
    let mut buffer = vec![0u8; 4 * 1024];
    let mut offset = 0u64;
    while let Ok(result) = input.read(&mut buffer) {
        if result == 0 {
            break;
        }
        let actual = fs::write(fs, device, inode_number, &buffer[..result], offset).unwrap_or(-1);
        if actual < 0 {
            break;
        }
        offset += actual as u64;
        if actual as usize != result {
            break;
        }
    }
    println!("{offset} bytes copied");
}

fn do_help() {
    println!("Commands are:");
    println!("    format");
    println!("    mount");
    println!("    debug");
    println!("    create");
    println!("    remove  <inode>");
    println!("    cat     <inode>");
    println!("    stat    <inode>");
    println!("    copyin  <file> <inode>");
    println!("    copyout <inode> <file>");
    println!("    help");
    println!("    quit");
    println!("    exit");
}
