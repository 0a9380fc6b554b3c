//! Producers: turn a byte range into queued chunks

use super::fault::FaultInjection;
use super::plan::TransferRange;
use super::slot::ErrorSlot;
use super::stats::Counters;
use crate::error::{IoOp, Result, TransferError};
use compio::fs::File;
use compio_fs_extended::{direct, is_all_zero, AlignedBuf};
use compio_sync::{CancellationToken, Sender, WaitGroup};
use futures::future::{self, Either};
use std::pin::pin;
use std::sync::Arc;
use tracing::trace;

/// One unit of work: bytes destined for `offset` in the destination
#[derive(Debug)]
pub(crate) struct Chunk {
    pub(crate) offset: u64,
    pub(crate) data: AlignedBuf,
}

/// Where producers get their bytes from
#[derive(Clone)]
pub(crate) enum ChunkSource {
    /// Exact aligned reads from a file or block device
    Descriptor(File),
    /// Slices of a caller-provided buffer
    Memory(Arc<[u8]>),
}

/// State of one producer task
pub(crate) struct Producer {
    pub(crate) id: usize,
    pub(crate) range: TransferRange,
    pub(crate) chunk_size: usize,
    pub(crate) source: ChunkSource,
    pub(crate) queue: Sender<Chunk>,
    pub(crate) pending: WaitGroup,
    pub(crate) cancel: CancellationToken,
    pub(crate) errors: Arc<ErrorSlot>,
    pub(crate) counters: Arc<Counters>,
    pub(crate) fault: FaultInjection,
}

impl Producer {
    /// Walk the range chunk by chunk until it is exhausted, the transfer is
    /// cancelled, or this producer fails
    pub(crate) async fn run(self) {
        for (offset, len) in self.range.chunks(self.chunk_size) {
            if self.cancel.is_cancelled() {
                trace!(producer = self.id, offset, "cancelled");
                return;
            }

            let data = match self.load(offset, len).await {
                Ok(data) => data,
                Err(err) => {
                    self.errors.report(err);
                    return;
                }
            };
            if self.fault.fails_producer() {
                self.errors.report(TransferError::InjectedFault);
                return;
            }

            let Some(data) = data else {
                self.counters.record_skipped();
                continue;
            };

            self.pending.add(1);
            let send = pin!(self.queue.send(Chunk { offset, data }));
            match future::select(send, self.cancel.cancelled()).await {
                Either::Left((Ok(()), _)) => {
                    trace!(producer = self.id, offset, len, "queued");
                }
                Either::Left((Err(_), _)) | Either::Right(_) => {
                    // The chunk never reached a worker
                    self.pending.done();
                    return;
                }
            }
        }
        trace!(producer = self.id, "range exhausted");
    }

    /// Bytes of the chunk at `offset`, or `None` if they are all zero
    async fn load(&self, offset: u64, len: usize) -> Result<Option<AlignedBuf>> {
        match &self.source {
            ChunkSource::Descriptor(file) => {
                let buf = direct::read_exact_at(file, len, offset)
                    .await
                    .map_err(|e| TransferError::from_extended(e, IoOp::Read, offset))?;
                Ok((!buf.is_zeroed()).then_some(buf))
            }
            ChunkSource::Memory(data) => {
                let start = offset as usize;
                let bytes = &data[start..start + len];
                if is_all_zero(bytes) {
                    return Ok(None);
                }
                AlignedBuf::copy_from_slice(bytes)
                    .map(Some)
                    .map_err(|e| TransferError::from_extended(e, IoOp::Read, offset))
            }
        }
    }
}
