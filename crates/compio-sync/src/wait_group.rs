//! Awaitable counter of outstanding work

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// Counter of outstanding work items that can be awaited until it reaches zero
///
/// Callers [`add`](Self::add) before handing work off and call
/// [`done`](Self::done) once per item when it is finished. [`wait`](Self::wait)
/// resolves whenever the counter is observed at zero, so it is only
/// meaningful once no further `add` can happen.
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<WaitGroupInner>,
}

#[derive(Default)]
struct WaitGroupInner {
    count: AtomicUsize,
    waiters: Mutex<Vec<Waker>>,
}

impl WaitGroup {
    /// Create a wait group with a zero count
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` outstanding items
    pub fn add(&self, n: usize) {
        self.inner.count.fetch_add(n, Ordering::AcqRel);
    }

    /// Mark one item finished, waking waiters when the count reaches zero
    ///
    /// # Panics
    ///
    /// Panics if called more often than items were added.
    pub fn done(&self) {
        let previous = self.inner.count.fetch_sub(1, Ordering::AcqRel);
        assert!(previous > 0, "WaitGroup::done called with zero count");

        if previous == 1 {
            let waiters = match self.inner.waiters.lock() {
                Ok(mut waiters) => std::mem::take(&mut *waiters),
                Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
            };
            for waker in waiters {
                waker.wake();
            }
        }
    }

    /// Current count
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Future that resolves once the count is zero
    pub fn wait(&self) -> impl Future<Output = ()> + Unpin {
        WaitFuture {
            group: self.clone(),
        }
    }
}

impl std::fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

struct WaitFuture {
    group: WaitGroup,
}

impl Future for WaitFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.group.count() == 0 {
            return Poll::Ready(());
        }

        if let Ok(mut waiters) = self.group.inner.waiters.lock() {
            if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                waiters.push(cx.waker().clone());
            }
        }

        if self.group.count() == 0 {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
