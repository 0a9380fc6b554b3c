//! # compio-fs-extended
//!
//! Low-level file operations for direct (cache-bypassing) I/O under compio:
//! - [`AlignedBuf`], a page-aligned owned buffer usable with `O_DIRECT`
//! - exact positional reads and complete positional writes submitted through
//!   compio's io_uring driver, always into aligned memory
//! - sizing of transfer sources (regular files and block devices) and
//!   resizing of destination files
//!
//! ## Example
//!
//! ```rust,no_run
//! use compio_fs_extended::direct;
//! use std::os::fd::AsFd;
//!
//! # async fn example() -> compio_fs_extended::Result<()> {
//! let src = direct::attach(std::fs::File::open("source.img")?.as_fd())?;
//! let dst = direct::attach(std::fs::File::create("copy.img")?.as_fd())?;
//!
//! let chunk = direct::read_exact_at(&src, 4096, 0).await?;
//! direct::write_at(&dst, chunk, 0).await?;
//! # Ok(())
//! # }
//! ```

pub mod aligned;
pub mod device;
pub mod direct;
pub mod error;

// Re-export main types
pub use aligned::{is_all_zero, AlignedBuf, ALIGNMENT};
pub use device::{same_inode, set_len, source_size, SourceKind};
pub use direct::{attach, read_at, read_exact_at, write_at};
pub use error::{ExtendedError, Result};
