//! Positional reads and writes through aligned buffers
//!
//! These are the only entry points that touch file data. Every call goes
//! through a freshly allocated [`AlignedBuf`] submitted to compio's io_uring
//! positional operations, and never leaves a partial transfer unreported:
//!
//! - [`read_at`] stops early only at end-of-file
//! - [`read_exact_at`] turns an early end-of-file into `ShortRead`
//! - [`write_at`] loops until every byte is on the descriptor
//!
//! Reads always request the buffer's full, block-rounded capacity, so a tail
//! read at an aligned offset stays valid on an `O_DIRECT` descriptor.

use crate::aligned::{is_aligned, AlignedBuf};
use crate::error::{ExtendedError, Result};
use compio::buf::{BufResult, IntoInner, IoBuf};
use compio::fs::File;
use compio::io::{AsyncReadAt, AsyncWriteAtExt};
use std::io;
use std::os::fd::{BorrowedFd, FromRawFd, IntoRawFd};

/// Open a compio [`File`] on a duplicate of `fd`
///
/// The duplicate shares the file offset and status flags (including
/// `O_DIRECT`) with `fd` and is closed when the last clone of the returned
/// file is dropped.
///
/// # Errors
///
/// Returns `Io` if the descriptor cannot be duplicated.
pub fn attach(fd: BorrowedFd<'_>) -> Result<File> {
    let owned = fd.try_clone_to_owned()?;
    // SAFETY: the duplicate is exclusively owned and handed over to the file
    Ok(unsafe { File::from_raw_fd(owned.into_raw_fd()) })
}

/// Read up to `count` bytes at `offset` into a new aligned buffer
///
/// The returned buffer is shorter than `count` only if end-of-file was
/// reached first.
///
/// # Errors
///
/// Returns `Io` for any read failure other than `EINTR`.
pub async fn read_at(file: &File, count: usize, offset: u64) -> Result<AlignedBuf> {
    debug_assert!(is_aligned(offset), "unaligned read offset {offset}");

    let mut buf = AlignedBuf::with_capacity(count)?;
    let mut filled = 0usize;

    while filled < count {
        let BufResult(result, slice) = file
            .read_at(buf.slice(filled..), offset + filled as u64)
            .await;
        buf = slice.into_inner();

        match result {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ExtendedError::Io(e)),
        }
    }

    // The last read may have run past `count` up to the rounded capacity
    buf.truncate(count);
    Ok(buf)
}

/// Read exactly `count` bytes at `offset`
///
/// # Errors
///
/// Returns `ShortRead` if end-of-file is reached before `count` bytes, or
/// `Io` if the read fails.
pub async fn read_exact_at(file: &File, count: usize, offset: u64) -> Result<AlignedBuf> {
    let buf = read_at(file, count, offset).await?;
    if buf.len() != count {
        return Err(ExtendedError::ShortRead {
            offset,
            expected: count,
            actual: buf.len(),
        });
    }
    Ok(buf)
}

/// Write all of `buf` at `offset`
///
/// The buffer is consumed; it is dropped once the write finished.
///
/// # Errors
///
/// Returns `Io` for any write failure other than `EINTR`, or a `WriteZero`
/// I/O error if the kernel stops accepting bytes.
pub async fn write_at(file: &File, buf: AlignedBuf, offset: u64) -> Result<()> {
    debug_assert!(is_aligned(offset), "unaligned write offset {offset}");

    let mut file = file;
    let BufResult(result, _) = file.write_all_at(buf, offset).await;
    result.map_err(ExtendedError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::os::unix::fs::FileExt;
    use tempfile::NamedTempFile;

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[compio::test]
    async fn test_read_stops_at_eof() {
        let temp = file_with(&[7u8; 777]);
        let file = attach(temp.as_file().as_fd()).unwrap();

        let buf = read_at(&file, 4096, 0).await.unwrap();
        assert_eq!(buf.len(), 777);
        assert!(buf.iter().all(|&b| b == 7));
    }

    #[compio::test]
    async fn test_unaligned_tail_read_is_capped_at_count() {
        // The kernel is asked for a whole block but only `count` bytes are kept
        let temp = file_with(&[9u8; 4096]);
        let file = attach(temp.as_file().as_fd()).unwrap();

        let buf = read_exact_at(&file, 777, 0).await.unwrap();
        assert_eq!(buf.len(), 777);
        assert_eq!(buf.capacity(), 4096);
        assert!(buf.iter().all(|&b| b == 9));
    }

    #[compio::test]
    async fn test_read_exact_reports_short_read() {
        let temp = file_with(&[1u8; 5000]);
        let file = attach(temp.as_file().as_fd()).unwrap();

        let err = read_exact_at(&file, 4096, 4096).await.unwrap_err();
        match err {
            ExtendedError::ShortRead {
                offset,
                expected,
                actual,
            } => {
                assert_eq!(offset, 4096);
                assert_eq!(expected, 4096);
                assert_eq!(actual, 5000 - 4096);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[compio::test]
    async fn test_write_then_read_at_offset() {
        let temp = NamedTempFile::new().unwrap();
        let file = attach(temp.as_file().as_fd()).unwrap();
        let payload: Vec<u8> = (0..6000u32).map(|i| (i % 253) as u8).collect();

        let buf = AlignedBuf::copy_from_slice(&payload).unwrap();
        write_at(&file, buf, 8192).await.unwrap();

        let mut back = vec![0u8; payload.len()];
        temp.as_file().read_exact_at(&mut back, 8192).unwrap();
        assert_eq!(back, payload);

        // The gap before the write reads as zero
        let head = read_exact_at(&file, 8192, 0).await.unwrap();
        assert!(head.is_zeroed());
    }

    #[compio::test]
    async fn test_attached_file_outlives_original_descriptor() {
        let temp = file_with(&[0xAB; 4096]);
        let file = attach(temp.as_file().as_fd()).unwrap();
        drop(temp);

        let back = read_exact_at(&file, 4096, 0).await.unwrap();
        assert!(back.iter().all(|&b| b == 0xAB));
    }
}
