//! Transfer configuration and its validation

use super::fault::FaultInjection;
use crate::error::{Result, TransferError};
use crate::progress::ProgressTracker;

/// Alignment boundary every chunk size must be a multiple of
pub const ALIGNMENT: usize = compio_fs_extended::ALIGNMENT;

/// Largest accepted chunk size (4 MiB)
pub const MAX_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Upper bound on producer/worker pairs per transfer
pub const MAX_PRODUCERS: usize = 8;

/// Check that `chunk_size` is a positive multiple of [`ALIGNMENT`] no larger
/// than [`MAX_CHUNK_SIZE`]
///
/// # Errors
///
/// Returns [`TransferError::Config`] describing the violated rule.
pub fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(TransferError::Config(
            "chunk size must be greater than zero".to_string(),
        ));
    }
    if chunk_size > MAX_CHUNK_SIZE {
        return Err(TransferError::Config(format!(
            "chunk size is too large, max chunk size is {MAX_CHUNK_SIZE}"
        )));
    }
    if chunk_size % ALIGNMENT != 0 {
        return Err(TransferError::Config(format!(
            "chunk size must be a multiple of {ALIGNMENT}"
        )));
    }
    Ok(())
}

/// Options for one transfer
///
/// # Examples
///
/// ```rust
/// use dxfer::transfer::{FaultInjection, TransferOptions};
///
/// let options = TransferOptions::new(1024 * 1024)
///     .with_max_parallelism(4)
///     .with_fault(FaultInjection::Disabled);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Bytes per chunk; multiple of [`ALIGNMENT`], at most [`MAX_CHUNK_SIZE`]
    pub chunk_size: usize,

    /// Maximum producer/worker pairs, between 1 and [`MAX_PRODUCERS`]
    pub max_parallelism: usize,

    /// Test-only failure hook; leave [`FaultInjection::Disabled`] in production
    pub fault: FaultInjection,

    /// Receives the size of every chunk written
    pub progress: Option<ProgressTracker>,
}

impl TransferOptions {
    /// Options with the given chunk size and default parallelism
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            max_parallelism: MAX_PRODUCERS,
            fault: FaultInjection::Disabled,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism;
        self
    }

    #[must_use]
    pub fn with_fault(mut self, fault: FaultInjection) -> Self {
        self.fault = fault;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Validate the options before any I/O is attempted
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Config`] for an invalid chunk size or a
    /// parallelism outside `1..=MAX_PRODUCERS`.
    pub fn validate(&self) -> Result<()> {
        validate_chunk_size(self.chunk_size)?;
        if self.max_parallelism == 0 || self.max_parallelism > MAX_PRODUCERS {
            return Err(TransferError::Config(format!(
                "max parallelism must be between 1 and {MAX_PRODUCERS}, got {}",
                self.max_parallelism
            )));
        }
        Ok(())
    }
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self::new(MAX_CHUNK_SIZE)
    }
}
