//! Fault injection for exercising the failure path
//!
//! The hook is a per-call value carried in
//! [`TransferOptions`](super::TransferOptions), so concurrently running tests
//! never see each other's faults.

/// Where, if anywhere, a synthetic [`TransferError::InjectedFault`] is raised
///
/// [`TransferError::InjectedFault`]: crate::error::TransferError::InjectedFault
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultInjection {
    /// No synthetic failures
    #[default]
    Disabled,
    /// A worker fails right after writing its first chunk
    WorkerAfterWrite,
    /// A worker fails on its first chunk without writing it
    WorkerSkipWrite,
    /// A producer fails right after reading its first chunk
    ProducerRead,
}

impl FaultInjection {
    /// Whether workers report the fault once a chunk is handled
    #[must_use]
    pub const fn fails_worker(self) -> bool {
        matches!(
            self,
            FaultInjection::WorkerAfterWrite | FaultInjection::WorkerSkipWrite
        )
    }

    /// Whether workers skip the write before reporting
    #[must_use]
    pub const fn skips_write(self) -> bool {
        matches!(self, FaultInjection::WorkerSkipWrite)
    }

    /// Whether producers report the fault after obtaining a chunk
    #[must_use]
    pub const fn fails_producer(self) -> bool {
        matches!(self, FaultInjection::ProducerRead)
    }
}
