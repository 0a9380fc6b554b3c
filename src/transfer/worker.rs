//! Workers: drain the queue into the destination

use super::fault::FaultInjection;
use super::producer::Chunk;
use super::slot::ErrorSlot;
use super::stats::Counters;
use crate::error::{IoOp, TransferError};
use crate::progress::ProgressTracker;
use compio::fs::File;
use compio_fs_extended::direct;
use compio_sync::{CancellationToken, Receiver, WaitGroup};
use futures::future::{self, Either};
use std::sync::Arc;
use tracing::trace;

/// State of one worker task
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) destination: File,
    pub(crate) queue: Receiver<Chunk>,
    pub(crate) pending: WaitGroup,
    pub(crate) cancel: CancellationToken,
    pub(crate) errors: Arc<ErrorSlot>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) fault: FaultInjection,
    pub(crate) progress: Option<ProgressTracker>,
}

impl Worker {
    /// Write chunks until the queue is closed, the transfer is cancelled, or
    /// this worker fails
    ///
    /// Chunks still queued after a failure are left for the coordinator's
    /// drain.
    pub(crate) async fn run(self) {
        loop {
            if self.cancel.is_cancelled() {
                trace!(worker = self.id, "cancelled");
                return;
            }

            let chunk = match future::select(self.queue.recv(), self.cancel.cancelled()).await {
                Either::Left((Some(chunk), _)) => chunk,
                Either::Left((None, _)) => {
                    trace!(worker = self.id, "queue closed");
                    return;
                }
                Either::Right(_) => {
                    trace!(worker = self.id, "cancelled while idle");
                    return;
                }
            };

            let Chunk { offset, data } = chunk;
            let len = data.len();
            let result = if self.fault.skips_write() {
                Ok(())
            } else {
                direct::write_at(&self.destination, data, offset)
                    .await
                    .map_err(|e| TransferError::from_extended(e, IoOp::Write, offset))
            };
            self.pending.done();

            if let Err(err) = result {
                self.errors.report(err);
                return;
            }
            if self.fault.fails_worker() {
                self.errors.report(TransferError::InjectedFault);
                return;
            }

            self.counters.record_written(len);
            if let Some(progress) = &self.progress {
                progress.add(len as u64);
            }
            trace!(worker = self.id, offset, len, "written");
        }
    }
}
