//! Async synchronization primitives for compio runtime
//!
//! This crate provides async synchronization primitives that are compatible
//! with the [compio](https://github.com/compio-rs/compio) async runtime.
//!
//! # Primitives
//!
//! - [`Semaphore`] - Async semaphore for bounding concurrency
//! - [`channel::bounded`] - Bounded multi-producer multi-consumer queue with backpressure
//! - [`CancellationToken`] - One-shot, broadcast cancellation signal
//! - [`WaitGroup`] - Counter that can be awaited until it drops to zero
//!
//! # Example
//!
//! ```rust,no_run
//! use compio_sync::{channel, CancellationToken};
//!
//! #[compio::main]
//! async fn main() {
//!     let (tx, rx) = channel::bounded::<u64>(4);
//!     let token = CancellationToken::new();
//!
//!     let consumer = compio::runtime::spawn(async move {
//!         let mut sum = 0;
//!         while let Some(v) = rx.recv().await {
//!             sum += v;
//!         }
//!         sum
//!     });
//!
//!     for i in 0..100 {
//!         if token.is_cancelled() || tx.send(i).await.is_err() {
//!             break;
//!         }
//!     }
//!     tx.close();
//!     let _ = consumer.await;
//! }
//! ```

mod cancel;
pub mod channel;
mod semaphore;
mod wait_group;

pub use cancel::{CancellationToken, Cancelled};
pub use channel::{Receiver, SendError, Sender};
pub use semaphore::{Semaphore, SemaphorePermit};
pub use wait_group::WaitGroup;
