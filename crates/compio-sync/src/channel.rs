//! Bounded multi-producer multi-consumer channel
//!
//! Capacity is enforced with a [`Semaphore`]: every queued item holds one
//! forgotten permit, which the receiver returns when it takes the item. A full
//! queue therefore parks senders (backpressure) until a receiver makes room.
//!
//! Closing is explicit and shared: after [`Sender::close`] or
//! [`Receiver::close`] no new item is accepted, receivers drain what is left
//! and then observe `None`. Senders already parked on a full queue are not
//! woken by `close`; pair their `send` with a cancellation signal.
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_sync::channel;
//!
//! # async fn example() {
//! let (tx, rx) = channel::bounded(2);
//! tx.send("a").await.unwrap();
//! tx.send("b").await.unwrap();
//! tx.close();
//!
//! assert_eq!(rx.recv().await, Some("a"));
//! assert_eq!(rx.recv().await, Some("b"));
//! assert_eq!(rx.recv().await, None);
//! # }
//! ```

use crate::semaphore::Semaphore;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// Create a bounded channel holding at most `capacity` items
///
/// # Panics
///
/// Panics if `capacity` is 0.
#[must_use]
pub fn bounded<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        slots: Semaphore::new(capacity),
        receivers: Mutex::new(Vec::new()),
        closed: AtomicBool::new(false),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

/// Error returned by [`Sender::send`] when the channel is closed
///
/// Carries back the item that could not be delivered.
#[derive(Debug, PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("sending on a closed channel")
    }
}

impl<T: std::fmt::Debug> std::error::Error for SendError<T> {}

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    slots: Semaphore,
    receivers: Mutex<Vec<Waker>>,
    closed: AtomicBool,
}

impl<T> Shared<T> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.wake_receivers();
        }
    }

    fn wake_receivers(&self) {
        let waiters = match self.receivers.lock() {
            Ok(mut waiters) => std::mem::take(&mut *waiters),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for waker in waiters {
            waker.wake();
        }
    }

    fn pop(&self) -> Option<T> {
        let item = match self.queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        if item.is_some() {
            self.slots.add_permits(1);
        }
        item
    }

    fn len(&self) -> usize {
        match self.queue.lock() {
            Ok(queue) => queue.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

/// Sending half of a bounded channel
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Sender<T> {
    /// Enqueue `item`, waiting for a free slot if the channel is full
    ///
    /// # Errors
    ///
    /// Returns the item inside [`SendError`] if the channel is closed.
    pub async fn send(&self, item: T) -> Result<(), SendError<T>> {
        if self.shared.is_closed() {
            return Err(SendError(item));
        }

        let permit = self.shared.slots.acquire().await;
        if self.shared.is_closed() {
            return Err(SendError(item));
        }
        permit.forget();

        match self.shared.queue.lock() {
            Ok(mut queue) => queue.push_back(item),
            Err(poisoned) => poisoned.into_inner().push_back(item),
        }
        self.shared.wake_receivers();
        Ok(())
    }

    /// Close the channel for every sender and receiver
    pub fn close(&self) {
        self.shared.close();
    }

    /// Whether the channel has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of queued items
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the queue is currently empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued items
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.slots.max_permits()
    }
}

/// Receiving half of a bounded channel
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Receiver<T> {
    /// Take the next item, waiting while the channel is empty and open
    ///
    /// Resolves to `None` once the channel is closed and fully drained.
    pub fn recv(&self) -> Recv<'_, T> {
        Recv { receiver: self }
    }

    /// Take the next item if one is queued
    #[must_use]
    pub fn try_recv(&self) -> Option<T> {
        self.shared.pop()
    }

    /// Close the channel for every sender and receiver
    pub fn close(&self) {
        self.shared.close();
    }

    /// Whether the channel has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of queued items
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the queue is currently empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Future returned by [`Receiver::recv`]
#[must_use = "futures do nothing unless polled"]
pub struct Recv<'a, T> {
    receiver: &'a Receiver<T>,
}

impl<T> Future for Recv<'_, T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let shared = &self.receiver.shared;
        if let Some(item) = shared.pop() {
            return Poll::Ready(Some(item));
        }
        if shared.is_closed() {
            return Poll::Ready(shared.pop());
        }

        if let Ok(mut waiters) = shared.receivers.lock() {
            if !waiters.iter().any(|w| w.will_wake(cx.waker())) {
                waiters.push(cx.waker().clone());
            }
        }

        // Re-check after registering so a concurrent push or close is not missed
        if let Some(item) = shared.pop() {
            return Poll::Ready(Some(item));
        }
        if shared.is_closed() {
            return Poll::Ready(shared.pop());
        }
        Poll::Pending
    }
}
