//! Path-level copy built on the transfer engine
//!
//! Opens the source and destination, refuses to copy a file onto itself,
//! prepares the destination so that skipped all-zero chunks read back as
//! zero, runs the transfer and flushes the result to stable storage.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dxfer::copy::{copy_file, CopySettings};
//! use std::path::Path;
//!
//! # async fn example() -> dxfer::Result<()> {
//! let settings = CopySettings {
//!     direct: true,
//!     ..CopySettings::default()
//! };
//! let stats = copy_file(Path::new("/dev/sdb"), Path::new("disk.img"), &settings).await?;
//! println!("{} bytes skipped", stats.bytes_skipped());
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, TransferError};
use crate::progress::ProgressTracker;
use crate::transfer::{self, TransferOptions, TransferStats, MAX_CHUNK_SIZE, MAX_PRODUCERS};
use compio::fs::OpenOptions;
use compio_fs_extended::device;
use std::os::fd::{AsFd, AsRawFd};
use std::path::Path;
use tracing::{debug, info};

/// How [`copy_file`] opens files and drives the transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopySettings {
    /// Bytes per chunk
    pub chunk_size: usize,
    /// Maximum reader/writer pairs
    pub max_parallelism: usize,
    /// Open both files with `O_DIRECT`
    pub direct: bool,
    /// Draw a progress bar
    pub progress: bool,
}

impl Default for CopySettings {
    fn default() -> Self {
        Self {
            chunk_size: MAX_CHUNK_SIZE,
            max_parallelism: MAX_PRODUCERS,
            direct: false,
            progress: false,
        }
    }
}

impl CopySettings {
    fn open_flags(&self) -> i32 {
        if self.direct {
            libc::O_DIRECT
        } else {
            0
        }
    }
}

/// Copy `src` to `dst`
///
/// A regular-file destination is created if missing, truncated and then sized
/// to the source length so that every skipped all-zero chunk reads back as
/// zero. A block-device destination is written in place.
///
/// # Errors
///
/// Returns [`TransferError::FileSystem`] if either file cannot be opened,
/// sized or synced, or if both paths name the same file (directly, through a
/// hard link or through a symlink), and otherwise whatever the transfer
/// returns.
pub async fn copy_file(src: &Path, dst: &Path, settings: &CopySettings) -> Result<TransferStats> {
    let options = TransferOptions::new(settings.chunk_size)
        .with_max_parallelism(settings.max_parallelism);
    options.validate()?;

    let src_file = OpenOptions::new()
        .read(true)
        .custom_flags(settings.open_flags())
        .open(src)
        .await
        .map_err(|e| {
            TransferError::FileSystem(format!(
                "Failed to open source file {}: {}",
                src.display(),
                e
            ))
        })?;

    let (kind, total_size) = compio_fs_extended::source_size(src_file.as_raw_fd())
        .map_err(TransferError::source_size)?;
    debug!("source {} is a {:?} of {} bytes", src.display(), kind, total_size);

    let dst_file = OpenOptions::new()
        .write(true)
        .create(true)
        .custom_flags(settings.open_flags())
        .open(dst)
        .await
        .map_err(|e| {
            TransferError::FileSystem(format!(
                "Failed to open destination file {}: {}",
                dst.display(),
                e
            ))
        })?;

    // Nothing may be truncated before this check
    let same = device::same_inode(src_file.as_raw_fd(), dst_file.as_raw_fd()).map_err(|e| {
        TransferError::FileSystem(format!("Failed to stat {}: {}", dst.display(), e))
    })?;
    if same {
        return Err(TransferError::FileSystem(format!(
            "Source and destination are the same file: {} and {}",
            src.display(),
            dst.display()
        )));
    }

    let dst_metadata = dst_file.metadata().await.map_err(|e| {
        TransferError::FileSystem(format!("Failed to stat {}: {}", dst.display(), e))
    })?;
    if dst_metadata.is_file() {
        // Truncate first so no stale bytes survive under skipped chunks
        for len in [0, total_size] {
            device::set_len(dst_file.as_fd(), len).await.map_err(|e| {
                TransferError::FileSystem(format!(
                    "Failed to resize {} to {} bytes: {}",
                    dst.display(),
                    len,
                    e
                ))
            })?;
        }
    }

    let progress = settings.progress.then(|| ProgressTracker::new(total_size));
    let options = match &progress {
        Some(tracker) => options.with_progress(tracker.clone()),
        None => options,
    };

    let result = transfer::copy_with(&src_file, &dst_file, &options).await;
    if let Some(tracker) = &progress {
        match &result {
            Ok(_) => tracker.finish(),
            Err(_) => tracker.abandon(),
        }
    }
    let stats = result?;

    dst_file.sync_all().await.map_err(|e| {
        TransferError::FileSystem(format!("Failed to sync {}: {}", dst.display(), e))
    })?;

    info!(
        "copied {} to {}: {} bytes written, {} bytes skipped",
        src.display(),
        dst.display(),
        stats.bytes_written,
        stats.bytes_skipped()
    );
    Ok(stats)
}
