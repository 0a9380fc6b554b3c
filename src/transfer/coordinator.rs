//! Coordinator: launches the pipeline and decides its outcome
//!
//! ```text
//!            ┌──────────┐  all producers done and    ┌───────────┐
//!  spawn ──▶ │ Running  │ ─ no chunk outstanding ──▶ │ Completed │ ─▶ Ok(stats)
//!            └──────────┘                            └───────────┘
//!                 │ first error (token cancelled)
//!                 ▼
//!        ┌───────────────┐      ┌──────────┐      ┌────────┐
//!        │ ErrorDetected │ ───▶ │ Draining │ ───▶ │ Failed │ ─▶ Err(first error)
//!        └───────────────┘      └──────────┘      └────────┘
//! ```
//!
//! The coordinator only returns after every task it spawned has finished.

use super::options::TransferOptions;
use super::plan::plan_ranges;
use super::producer::{Chunk, ChunkSource, Producer};
use super::slot::ErrorSlot;
use super::stats::{Counters, TransferStats};
use super::worker::Worker;
use crate::error::{Result, TransferError};
use compio::fs::File;
use compio_sync::{channel, CancellationToken, Receiver, WaitGroup};
use futures::future::{self, Either};
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Live and cumulative task counts of the transfers it is handed to
#[derive(Debug, Default)]
pub(crate) struct TaskTracker {
    live: AtomicUsize,
    peak: AtomicUsize,
    spawned: AtomicUsize,
    queue_capacity: AtomicUsize,
}

impl TaskTracker {
    fn enter(self: &Arc<Self>) -> TaskGuard {
        self.spawned.fetch_add(1, Ordering::Relaxed);
        let live = self.live.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(live, Ordering::AcqRel);
        TaskGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Tasks currently running
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Highest number of tasks running at once
    #[cfg(test)]
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Tasks spawned in total
    #[cfg(test)]
    pub(crate) fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Acquire)
    }

    /// Capacity of the chunk queue of the last transfer
    #[cfg(test)]
    pub(crate) fn queue_capacity(&self) -> usize {
        self.queue_capacity.load(Ordering::Acquire)
    }
}

/// Marks a task as finished when dropped, even if it panicked
struct TaskGuard {
    tracker: Arc<TaskTracker>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.tracker.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Calls [`WaitGroup::done`] when dropped
struct DoneGuard(WaitGroup);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Run one transfer of `total_size` bytes from `source` to `destination`
///
/// `options` must already be validated.
pub(crate) async fn run(
    source: ChunkSource,
    total_size: u64,
    destination: File,
    options: &TransferOptions,
    tracker: &Arc<TaskTracker>,
) -> Result<TransferStats> {
    let started = Instant::now();
    let ranges = plan_ranges(total_size, options.chunk_size, options.max_parallelism)?;
    let pairs = ranges.len();
    let counters = Arc::new(Counters::default());

    if pairs == 0 {
        debug!("empty transfer, nothing to do");
        return Ok(counters.snapshot(0, 0, Duration::ZERO));
    }
    debug!(
        total_size,
        chunk_size = options.chunk_size,
        pairs,
        "starting transfer"
    );

    let (queue_tx, queue_rx) = channel::bounded::<Chunk>(pairs * 2);
    tracker
        .queue_capacity
        .store(queue_tx.capacity(), Ordering::Release);
    let cancel = CancellationToken::new();
    let errors = Arc::new(ErrorSlot::new(cancel.clone()));
    let pending = WaitGroup::new();
    let producers_running = WaitGroup::new();
    producers_running.add(pairs);

    let mut tasks = Vec::with_capacity(pairs * 2 + 1);

    for (id, range) in ranges.into_iter().enumerate() {
        let producer = Producer {
            id,
            range,
            chunk_size: options.chunk_size,
            source: source.clone(),
            queue: queue_tx.clone(),
            pending: pending.clone(),
            cancel: cancel.clone(),
            errors: Arc::clone(&errors),
            counters: Arc::clone(&counters),
            fault: options.fault,
        };
        let guard = tracker.enter();
        let done = DoneGuard(producers_running.clone());
        tasks.push(compio::runtime::spawn(async move {
            let _guard = guard;
            let _done = done;
            producer.run().await;
        }));
    }
    drop(queue_tx);

    for id in 0..pairs {
        let worker = Worker {
            id,
            destination: destination.clone(),
            queue: queue_rx.clone(),
            pending: pending.clone(),
            cancel: cancel.clone(),
            errors: Arc::clone(&errors),
            counters: Arc::clone(&counters),
            fault: options.fault,
            progress: options.progress.clone(),
        };
        let guard = tracker.enter();
        tasks.push(compio::runtime::spawn(async move {
            let _guard = guard;
            worker.run().await;
        }));
    }

    // Running: natural completion races the first error
    let completed = pin!(async {
        producers_running.wait().await;
        pending.wait().await;
    });
    match future::select(completed, cancel.cancelled()).await {
        Either::Left(_) => {
            debug!("all chunks handed off, shutting down workers");
            queue_rx.close();
            cancel.cancel();
        }
        Either::Right(_) => {
            debug!("first error observed, draining queue");
            let guard = tracker.enter();
            let drain_rx = queue_rx.clone();
            let drain_pending = pending.clone();
            tasks.push(compio::runtime::spawn(async move {
                let _guard = guard;
                drain(drain_rx, drain_pending).await;
            }));

            // Producers are woken by the cancellation; once they are gone
            // nothing else can be queued and the drain may finish
            producers_running.wait().await;
            queue_rx.close();
        }
    }

    let mut panicked = false;
    for task in tasks {
        if task.await.is_err() {
            panicked = true;
        }
    }
    trace!(live = tracker.live(), "all tasks joined");

    if let Some(err) = errors.take() {
        return Err(err);
    }
    if panicked {
        return Err(TransferError::Internal(
            "a transfer task panicked".to_string(),
        ));
    }

    let stats = counters.snapshot(total_size, pairs, started.elapsed());
    debug!(
        bytes_written = stats.bytes_written,
        chunks_written = stats.chunks_written,
        chunks_skipped = stats.chunks_skipped,
        "transfer completed in {:?}",
        stats.duration
    );
    Ok(stats)
}

/// Discard queued chunks until the queue is closed and empty
async fn drain(queue: Receiver<Chunk>, pending: WaitGroup) {
    let mut discarded = 0usize;
    while let Some(chunk) = queue.recv().await {
        drop(chunk);
        pending.done();
        discarded += 1;
    }
    trace!(discarded, "drain finished");
}
