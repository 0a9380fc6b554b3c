//! Error types for compio-fs-extended operations

use thiserror::Error;

/// Result type for compio-fs-extended operations
pub type Result<T> = std::result::Result<T, ExtendedError>;

/// Extended error types for direct I/O and descriptor probing
#[derive(Error, Debug)]
pub enum ExtendedError {
    /// Standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An exact read reached end-of-file early
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Offset the read started at
        offset: u64,
        /// Bytes requested
        expected: usize,
        /// Bytes actually read before end-of-file
        actual: usize,
    },

    /// Descriptor type cannot be sized (neither regular file nor block device)
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// System call error
    #[error("system call failed: {0}")]
    SystemCall(String),
}

impl ExtendedError {
    /// Check if error is a short read
    pub fn is_short_read(&self) -> bool {
        matches!(self, ExtendedError::ShortRead { .. })
    }

    /// Check if error is due to system call failure
    pub fn is_system_call_error(&self) -> bool {
        matches!(self, ExtendedError::SystemCall(_))
    }
}

/// Helper for creating invalid parameters errors
pub fn invalid_parameters_error(msg: &str) -> ExtendedError {
    ExtendedError::InvalidParameters(msg.to_string())
}

/// Helper for creating unsupported file type errors
pub fn unsupported_file_type_error(msg: &str) -> ExtendedError {
    ExtendedError::UnsupportedFileType(msg.to_string())
}
