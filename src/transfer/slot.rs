//! First-error-wins error slot

use crate::error::TransferError;
use compio_sync::CancellationToken;
use std::sync::Mutex;
use tracing::warn;

/// Single-assignment cell for the first error of a transfer
///
/// The first successful [`report`](Self::report) stores the error and
/// activates the transfer's cancellation token. Later reports are dropped.
pub(crate) struct ErrorSlot {
    first: Mutex<Option<TransferError>>,
    cancel: CancellationToken,
}

impl ErrorSlot {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        Self {
            first: Mutex::new(None),
            cancel,
        }
    }

    /// Store `err` if no error was stored yet, then cancel the transfer
    ///
    /// Returns `true` if `err` became the transfer's error.
    pub(crate) fn report(&self, err: TransferError) -> bool {
        {
            let mut first = match self.first.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if first.is_some() {
                return false;
            }
            warn!("transfer failed: {}", err);
            *first = Some(err);
        }
        self.cancel.cancel();
        true
    }

    pub(crate) fn take(&self) -> Option<TransferError> {
        match self.first.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}
