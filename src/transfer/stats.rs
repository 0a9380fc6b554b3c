//! Transfer statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Outcome of a successful transfer
///
/// # Examples
///
/// ```rust
/// use dxfer::transfer::TransferStats;
/// use std::time::Duration;
///
/// let stats = TransferStats {
///     total_bytes: 8192,
///     bytes_written: 4096,
///     chunks_written: 1,
///     chunks_skipped: 1,
///     pairs: 2,
///     duration: Duration::from_millis(3),
/// };
/// assert_eq!(stats.bytes_skipped(), 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStats {
    /// Bytes covered by the transfer
    pub total_bytes: u64,

    /// Bytes written to the destination
    pub bytes_written: u64,

    /// Chunks written to the destination
    pub chunks_written: u64,

    /// All-zero chunks that were not written
    pub chunks_skipped: u64,

    /// Producer/worker pairs used
    pub pairs: usize,

    /// Wall-clock time of the transfer
    pub duration: Duration,
}

impl TransferStats {
    /// Bytes not written because their chunks were all zero
    #[must_use]
    pub fn bytes_skipped(&self) -> u64 {
        self.total_bytes - self.bytes_written
    }

    /// Write throughput in bytes per second over the whole transfer
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_bytes as f64 / secs
        }
    }
}

/// Counters shared by the tasks of one transfer
#[derive(Debug, Default)]
pub(crate) struct Counters {
    bytes_written: AtomicU64,
    chunks_written: AtomicU64,
    chunks_skipped: AtomicU64,
}

impl Counters {
    pub(crate) fn record_written(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        self.chunks_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.chunks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, total_bytes: u64, pairs: usize, duration: Duration) -> TransferStats {
        TransferStats {
            total_bytes,
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            chunks_written: self.chunks_written.load(Ordering::Relaxed),
            chunks_skipped: self.chunks_skipped.load(Ordering::Relaxed),
            pairs,
            duration,
        }
    }
}
