//! Error handling and types

use compio_fs_extended::ExtendedError;
use std::fmt;
use thiserror::Error;

/// Direction of a failed data transfer syscall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    /// Reading a chunk from the source
    Read,
    /// Writing a chunk to the destination
    Write,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoOp::Read => f.write_str("read"),
            IoOp::Write => f.write_str("write"),
        }
    }
}

/// Transfer errors
///
/// A failed transfer reports exactly one of these: the first error raised by
/// any producer or worker, or the validation error that stopped it before any
/// I/O started.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Invalid chunk size, parallelism or buffer length
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Source could not be sized or is of an unsupported type
    #[error("Cannot determine source size: {0}")]
    SourceSize(String),

    /// An exact read hit end-of-file before the chunk was complete
    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Offset of the chunk
        offset: u64,
        /// Chunk length
        expected: usize,
        /// Bytes read before end-of-file
        actual: usize,
    },

    /// A read or write syscall failed
    #[error("{op} failed at offset {offset}: {source}")]
    Io {
        /// Which side of the transfer failed
        op: IoOp,
        /// Offset of the chunk being transferred
        offset: u64,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// Opening, sizing or syncing a file around the transfer failed
    #[error("File system error: {0}")]
    FileSystem(String),

    /// Synthetic failure raised by [`FaultInjection`](crate::transfer::FaultInjection)
    #[error("fault injection")]
    InjectedFault,

    /// Internal application error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransferError {
    /// Attach transfer context to an error from the I/O layer
    pub(crate) fn from_extended(err: ExtendedError, op: IoOp, offset: u64) -> Self {
        match err {
            ExtendedError::Io(source) => TransferError::Io { op, offset, source },
            ExtendedError::ShortRead {
                offset,
                expected,
                actual,
            } => TransferError::ShortRead {
                offset,
                expected,
                actual,
            },
            other => TransferError::Internal(format!("{op} at offset {offset}: {other}")),
        }
    }

    /// Wrap a failure to size the source
    pub(crate) fn source_size(err: ExtendedError) -> Self {
        TransferError::SourceSize(err.to_string())
    }

    /// Check if error was rejected during validation
    pub fn is_config(&self) -> bool {
        matches!(self, TransferError::Config(_))
    }

    /// Check if error is the injected test fault
    pub fn is_injected_fault(&self) -> bool {
        matches!(self, TransferError::InjectedFault)
    }

    /// Offset of the chunk that failed, if the error belongs to one
    pub fn offset(&self) -> Option<u64> {
        match self {
            TransferError::ShortRead { offset, .. } | TransferError::Io { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
