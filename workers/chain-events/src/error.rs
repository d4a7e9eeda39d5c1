//! Defines the error type emitted by the chain events worker

use thiserror::Error;

/// The error type emitted by the chain events worker
///
/// A failed poll is logged and retried on the next tick; only failures of
/// the event loop itself surface through this type
#[derive(Clone, Debug, Error)]
pub enum ChainEventsError {
    /// The coordinator cancelled the worker
    #[error("chain events worker cancelled: {0}")]
    Cancelled(String),
    /// The job queue was closed by its senders
    #[error("job queue closed: {0}")]
    JobQueueClosed(String),
    /// An error querying the ledger's event log
    #[error("ledger error: {0}")]
    Ledger(String),
    /// An error setting up the worker
    #[error("setup error: {0}")]
    Setup(String),
}
