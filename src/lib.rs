//! dxfer: parallel cache-bypassing transfers using aligned direct I/O
//!
//! This library copies a regular file or block device into another descriptor,
//! or writes an in-memory buffer to one, by splitting the bytes into aligned
//! chunks that a fixed set of reader and writer tasks move through a bounded
//! queue. All-zero chunks are skipped and the first failure cancels the rest.

pub mod cli;
pub mod copy;
pub mod error;
pub mod progress;
pub mod transfer;

// Re-export commonly used types
pub use error::{Result, TransferError};
pub use progress::ProgressTracker;
pub use transfer::{
    copy, copy_with, write_buffer, write_buffer_with, FaultInjection, TransferOptions,
    TransferStats,
};
