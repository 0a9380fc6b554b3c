//! Sizing of transfer sources and destinations
//!
//! A transfer source is either a regular file, whose length comes from
//! `fstat`, or a block device, whose capacity comes from the `BLKGETSIZE64`
//! ioctl. Character devices, pipes, sockets and directories have no fixed
//! size and are rejected. Regular-file destinations are resized with
//! [`set_len`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use compio_fs_extended::device::{source_size, SourceKind};
//! use std::os::unix::io::AsRawFd;
//!
//! # fn example() -> compio_fs_extended::Result<()> {
//! let file = std::fs::File::open("/dev/nvme0n1")?;
//! let (kind, size) = source_size(file.as_raw_fd())?;
//! assert_eq!(kind, SourceKind::BlockDevice);
//! println!("{size} bytes");
//! # Ok(())
//! # }
//! ```

use crate::error::{
    invalid_parameters_error, unsupported_file_type_error, ExtendedError, Result,
};
use std::os::fd::{AsRawFd, BorrowedFd};
use std::os::unix::io::RawFd;

// BLKGETSIZE64 = _IOR(0x12, 114, size_t)
nix::ioctl_read!(blk_get_size64, 0x12, 114, u64);

/// Kind of descriptor a transfer can read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Regular file sized by its length
    RegularFile,
    /// Block special device sized by its capacity
    BlockDevice,
}

/// `fstat` the descriptor
///
/// # Errors
///
/// Returns `Io` if `fstat` fails.
pub fn fstat(fd: RawFd) -> Result<libc::stat> {
    let mut stat = std::mem::MaybeUninit::<libc::stat>::zeroed();
    // SAFETY: stat points to writable memory of the right size
    let ret = unsafe { libc::fstat(fd, stat.as_mut_ptr()) };
    if ret < 0 {
        return Err(ExtendedError::Io(std::io::Error::last_os_error()));
    }
    // SAFETY: fstat succeeded and filled the struct
    Ok(unsafe { stat.assume_init() })
}

/// Capacity in bytes of the block device behind `fd`
///
/// # Errors
///
/// Returns `SystemCall` if the ioctl fails (e.g. `fd` is not a block device).
pub fn block_device_size(fd: RawFd) -> Result<u64> {
    let mut size: u64 = 0;
    // SAFETY: size is a valid u64 the kernel writes into
    unsafe { blk_get_size64(fd, &mut size) }
        .map_err(|e| ExtendedError::SystemCall(format!("BLKGETSIZE64: {}", e)))?;
    Ok(size)
}

/// Determine how many bytes a transfer from `fd` must move
///
/// # Errors
///
/// Returns `Io` if `fstat` fails, `SystemCall` if the block device size query
/// fails, and `UnsupportedFileType` for any other descriptor type.
pub fn source_size(fd: RawFd) -> Result<(SourceKind, u64)> {
    let stat = fstat(fd)?;

    match stat.st_mode & libc::S_IFMT {
        libc::S_IFREG => Ok((SourceKind::RegularFile, stat.st_size as u64)),
        libc::S_IFBLK => Ok((SourceKind::BlockDevice, block_device_size(fd)?)),
        other => Err(unsupported_file_type_error(&format!(
            "mode {:o} is neither a regular file nor a block device",
            other
        ))),
    }
}

/// Whether both descriptors refer to the same inode
///
/// # Errors
///
/// Returns `Io` if either `fstat` fails.
pub fn same_inode(a: RawFd, b: RawFd) -> Result<bool> {
    let (a, b) = (fstat(a)?, fstat(b)?);
    Ok(a.st_dev == b.st_dev && a.st_ino == b.st_ino)
}

/// Truncate or extend the file behind `fd` to exactly `len` bytes
///
/// Runs `ftruncate` on the blocking pool against a duplicate of `fd`.
///
/// # Errors
///
/// Returns `Io` if the descriptor cannot be duplicated or `ftruncate` fails,
/// and `SystemCall` if the blocking task panicked.
pub async fn set_len(fd: BorrowedFd<'_>, len: u64) -> Result<()> {
    let owned = fd.try_clone_to_owned()?;
    let len = libc::off_t::try_from(len)
        .map_err(|_| invalid_parameters_error(&format!("length {len}")))?;

    compio::runtime::spawn_blocking(move || {
        // SAFETY: owned is a valid descriptor for the whole call
        let ret = unsafe { libc::ftruncate(owned.as_raw_fd(), len) };
        if ret < 0 {
            return Err(ExtendedError::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    })
    .await
    .map_err(|e| ExtendedError::SystemCall(format!("ftruncate task failed: {:?}", e)))?
}
