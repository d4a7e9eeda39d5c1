//! Defines the error type emitted by the match orchestrator

use thiserror::Error;

/// The error type emitted by the match orchestrator
///
/// Task failures are not represented here; a failed task records its reason
/// on the match record and announces it on the bus. These errors cover the
/// orchestrator's own event loop
#[derive(Clone, Debug, Error)]
pub enum MatchOrchestratorError {
    /// The coordinator cancelled the worker
    #[error("match orchestrator cancelled: {0}")]
    Cancelled(String),
    /// The job queue was closed by its senders
    #[error("job queue closed: {0}")]
    JobQueueClosed(String),
    /// An error setting up the worker
    #[error("setup error: {0}")]
    Setup(String),
    /// An error reading or writing a match record
    #[error("match state error: {0}")]
    State(String),
}
