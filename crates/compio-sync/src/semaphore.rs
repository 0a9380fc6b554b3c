//! Async semaphore for compio runtime
//!
//! Counts free slots of a bounded resource. The bounded channel uses one permit
//! per queued item: senders wait here when the queue is full, receivers hand
//! the slot back with [`Semaphore::add_permits`] once they take an item.
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_sync::Semaphore;
//!
//! # async fn example() {
//! let slots = Semaphore::new(2);
//!
//! // Occupy a slot until someone explicitly gives it back
//! slots.acquire().await.forget();
//! assert_eq!(slots.available_permits(), 1);
//!
//! slots.add_permits(1);
//! assert_eq!(slots.available_permits(), 2);
//! # }
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// A compio-compatible async semaphore
///
/// # Design
///
/// - **Lock-free fast path**: permits are taken with a CAS loop on an atomic
/// - **FIFO waiters**: blocked tasks are woken in arrival order
/// - **RAII permits**: a [`SemaphorePermit`] releases on drop unless forgotten
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemaphoreInner>,
}

struct SemaphoreInner {
    /// Available permits
    permits: AtomicUsize,
    /// Configured number of permits
    max_permits: usize,
    /// Tasks waiting for a permit
    waiters: Mutex<VecDeque<Waker>>,
}

impl Semaphore {
    /// Create a new semaphore with the given number of permits
    ///
    /// # Panics
    ///
    /// Panics if `permits` is 0 (semaphore must have at least one permit)
    #[must_use]
    pub fn new(permits: usize) -> Self {
        assert!(permits > 0, "Semaphore must have at least one permit");
        Self {
            inner: Arc::new(SemaphoreInner {
                permits: AtomicUsize::new(permits),
                max_permits: permits,
                waiters: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// Acquire a permit, waiting asynchronously if none are available
    ///
    /// The returned future may be dropped at any time (for example when it
    /// loses a `select` against a cancellation signal); no permit is lost.
    pub async fn acquire(&self) -> SemaphorePermit {
        AcquireFuture {
            semaphore: self.clone(),
        }
        .await
    }

    /// Try to acquire a permit without waiting
    #[must_use]
    pub fn try_acquire(&self) -> Option<SemaphorePermit> {
        let mut current = self.inner.permits.load(Ordering::Acquire);

        loop {
            if current == 0 {
                return None;
            }

            match self.inner.permits.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(SemaphorePermit {
                        semaphore: Some(self.clone()),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Number of permits currently available
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.permits.load(Ordering::Acquire)
    }

    /// Configured number of permits
    #[must_use]
    pub fn max_permits(&self) -> usize {
        self.inner.max_permits
    }

    /// Return `count` permits to the pool and wake up to `count` waiters
    ///
    /// Used to hand back permits that were taken out of circulation with
    /// [`SemaphorePermit::forget`].
    pub fn add_permits(&self, count: usize) {
        self.inner.permits.fetch_add(count, Ordering::Release);

        if let Ok(mut waiters) = self.inner.waiters.lock() {
            for _ in 0..count {
                match waiters.pop_front() {
                    Some(waker) => waker.wake(),
                    None => break,
                }
            }
        }
    }

    fn add_waiter(&self, waker: Waker) {
        if let Ok(mut waiters) = self.inner.waiters.lock() {
            waiters.push_back(waker);
        }
    }
}

/// RAII guard for one semaphore permit
///
/// Dropping the guard releases the permit; [`SemaphorePermit::forget`] keeps
/// it out of circulation until [`Semaphore::add_permits`] is called.
pub struct SemaphorePermit {
    semaphore: Option<Semaphore>,
}

impl SemaphorePermit {
    /// Consume the permit without releasing it
    pub fn forget(mut self) {
        self.semaphore = None;
    }
}

impl Drop for SemaphorePermit {
    fn drop(&mut self) {
        if let Some(semaphore) = self.semaphore.take() {
            semaphore.add_permits(1);
        }
    }
}

struct AcquireFuture {
    semaphore: Semaphore,
}

impl Future for AcquireFuture {
    type Output = SemaphorePermit;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(permit) = self.semaphore.try_acquire() {
            return Poll::Ready(permit);
        }

        self.semaphore.add_waiter(cx.waker().clone());

        // A permit may have been released between the first attempt and the
        // waker registration
        if let Some(permit) = self.semaphore.try_acquire() {
            return Poll::Ready(permit);
        }

        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semaphore_new() {
        let sem = Semaphore::new(8);
        assert_eq!(sem.available_permits(), 8);
        assert_eq!(sem.max_permits(), 8);
    }

    #[test]
    fn test_try_acquire_exhausts() {
        let sem = Semaphore::new(2);
        let a = sem.try_acquire();
        let b = sem.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert!(sem.try_acquire().is_none());

        drop(a);
        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    fn test_forget_keeps_permit_out() {
        let sem = Semaphore::new(1);
        sem.try_acquire().unwrap().forget();
        assert_eq!(sem.available_permits(), 0);

        sem.add_permits(1);
        assert_eq!(sem.available_permits(), 1);
    }

    #[compio::test]
    async fn test_blocked_acquire_wakes_on_add_permits() {
        let sem = Semaphore::new(1);
        sem.acquire().await.forget();

        let sem2 = sem.clone();
        let handle = compio::runtime::spawn(async move {
            let _permit = sem2.acquire().await;
            7
        });

        sem.add_permits(1);
        assert_eq!(handle.await.unwrap(), 7);
        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    #[should_panic(expected = "Semaphore must have at least one permit")]
    fn test_zero_permits_panics() {
        let _sem = Semaphore::new(0);
    }
}
