//! Defines the error type emitted by the proof manager

use thiserror::Error;

/// The error type emitted by the proof manager
///
/// Statement evaluation failures are not represented here; they travel back
/// to the requester on the job's response channel as the backend reason
#[derive(Clone, Debug, Error)]
pub enum ProofManagerError {
    /// The coordinator cancelled the worker
    #[error("proof manager cancelled: {0}")]
    Cancelled(String),
    /// The job queue was closed by its senders
    #[error("job queue closed: {0}")]
    JobQueueClosed(String),
    /// An error receiving from the cancel channel
    #[error("recv error: {0}")]
    RecvError(String),
    /// An error setting up the worker
    #[error("setup error: {0}")]
    Setup(String),
}
