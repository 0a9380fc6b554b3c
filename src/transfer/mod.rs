//! Parallel direct-I/O transfer engine
//!
//! A transfer moves `total_size` bytes into a destination descriptor at the
//! same offsets they had in the source. The byte range is split into up to
//! [`MAX_PRODUCERS`] contiguous ranges; each range gets a producer task that
//! reads it chunk by chunk and a worker task that writes chunks out. Producers
//! and workers share one bounded queue, so a slow destination throttles every
//! producer.
//!
//! The first failure of any task wins: it is stored, every other task is
//! cancelled, queued chunks are drained and the call returns that error once
//! no task is left running.
//!
//! # Sparse destinations
//!
//! Chunks that are entirely zero are never written. The destination must
//! therefore already read as zero wherever the source is zero, e.g. a freshly
//! created, truncated or sparse file. Writing into a destination that holds
//! other data leaves that data in place under every all-zero source chunk.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dxfer::transfer::{copy, write_buffer};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source = std::fs::File::open("disk.img")?;
//! let destination = std::fs::File::create("disk.copy")?;
//! destination.set_len(source.metadata()?.len())?;
//! let stats = copy(&source, &destination, 4 * 1024 * 1024).await?;
//! println!("wrote {} bytes", stats.bytes_written);
//!
//! let out = std::fs::File::create("buffer.bin")?;
//! write_buffer(&out, Arc::from(vec![0xAB; 8192]), 8192, 4096).await?;
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod fault;
mod options;
mod plan;
mod producer;
mod slot;
mod stats;
mod worker;

pub use fault::FaultInjection;
pub use options::{
    validate_chunk_size, TransferOptions, ALIGNMENT, MAX_CHUNK_SIZE, MAX_PRODUCERS,
};
pub use plan::{chunk_count, plan_ranges, TransferRange};
pub use stats::TransferStats;

use crate::error::{Result, TransferError};
use compio::fs::File;
use compio_fs_extended::direct;
use coordinator::TaskTracker;
use producer::ChunkSource;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::sync::Arc;
use tracing::debug;

/// Share `fd` with the transfer's tasks
fn attach(fd: BorrowedFd<'_>) -> Result<File> {
    direct::attach(fd).map_err(|e| {
        TransferError::FileSystem(format!(
            "Failed to attach descriptor {}: {}",
            fd.as_raw_fd(),
            e
        ))
    })
}

/// Copy a regular file or block device into `destination`
///
/// Uses the default parallelism; see [`copy_with`].
///
/// # Errors
///
/// See [`copy_with`].
pub async fn copy(
    source: &impl AsFd,
    destination: &impl AsFd,
    chunk_size: usize,
) -> Result<TransferStats> {
    copy_with(source, destination, &TransferOptions::new(chunk_size)).await
}

/// Copy the whole of `source` into `destination` at identical offsets
///
/// The size of `source` is its length for a regular file and its capacity for
/// a block device. All-zero chunks are skipped, so `destination` must read as
/// zero where `source` does.
///
/// # Errors
///
/// - [`TransferError::Config`] if `options` are invalid; nothing is read or
///   written
/// - [`TransferError::SourceSize`] if `source` is neither a regular file nor a
///   block device, or cannot be sized
/// - [`TransferError::FileSystem`] if a descriptor cannot be duplicated
/// - the first read, short read, write or injected error of the transfer
pub async fn copy_with(
    source: &impl AsFd,
    destination: &impl AsFd,
    options: &TransferOptions,
) -> Result<TransferStats> {
    options.validate()?;

    let source = source.as_fd();
    let (kind, total_size) = compio_fs_extended::source_size(source.as_raw_fd())
        .map_err(TransferError::source_size)?;
    debug!(?kind, total_size, "copy source sized");

    let tracker = Arc::new(TaskTracker::default());
    coordinator::run(
        ChunkSource::Descriptor(attach(source)?),
        total_size,
        attach(destination.as_fd())?,
        options,
        &tracker,
    )
    .await
}

/// Write the first `data_size` bytes of `data` into `destination`
///
/// Uses the default parallelism; see [`write_buffer_with`].
///
/// # Errors
///
/// See [`write_buffer_with`].
pub async fn write_buffer(
    destination: &impl AsFd,
    data: Arc<[u8]>,
    data_size: u64,
    chunk_size: usize,
) -> Result<TransferStats> {
    write_buffer_with(destination, data, data_size, &TransferOptions::new(chunk_size)).await
}

/// Write the first `data_size` bytes of `data` into `destination` at offset 0
///
/// Every chunk is copied into an aligned buffer before it is written, so
/// `data` itself needs no particular alignment. All-zero chunks are skipped.
///
/// `data` is shared with the producer tasks as is. Converting a `Vec<u8>`
/// with `Arc::from` copies it once, so callers that write the same bytes
/// repeatedly should keep the `Arc` around.
///
/// # Errors
///
/// - [`TransferError::Config`] if `options` are invalid or `data_size`
///   exceeds the length of `data`; nothing is written
/// - the first write or injected error of the transfer
pub async fn write_buffer_with(
    destination: &impl AsFd,
    data: Arc<[u8]>,
    data_size: u64,
    options: &TransferOptions,
) -> Result<TransferStats> {
    options.validate()?;

    if data_size > data.len() as u64 {
        return Err(TransferError::Config(format!(
            "data size {} exceeds buffer length {}",
            data_size,
            data.len()
        )));
    }

    let tracker = Arc::new(TaskTracker::default());
    coordinator::run(
        ChunkSource::Memory(data),
        data_size,
        attach(destination.as_fd())?,
        options,
        &tracker,
    )
    .await
}
