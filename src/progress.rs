//! Progress tracking and reporting

use indicatif::{ProgressBar, ProgressStyle};

/// Byte-level progress shared by the workers of a transfer
///
/// Cloning is cheap; every clone drives the same bar.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    progress_bar: ProgressBar,
}

impl ProgressTracker {
    /// Visible progress bar for `total_bytes`
    #[must_use]
    pub fn new(total_bytes: u64) -> Self {
        let pb = ProgressBar::new(total_bytes);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        Self { progress_bar: pb }
    }

    /// Tracker that counts without drawing anything
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
        }
    }

    /// Account `bytes` more bytes
    pub fn add(&self, bytes: u64) {
        self.progress_bar.inc(bytes);
    }

    /// Bytes accounted so far
    #[must_use]
    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    /// Mark the transfer complete
    ///
    /// Skipped all-zero chunks never reach a worker, so the bar is moved to
    /// its full length first.
    pub fn finish(&self) {
        if let Some(total) = self.progress_bar.length() {
            self.progress_bar.set_position(total);
        }
        self.progress_bar.finish_with_message("Transfer completed");
    }

    /// Leave the bar where it is after a failed transfer
    pub fn abandon(&self) {
        self.progress_bar.abandon_with_message("Transfer failed");
    }
}
