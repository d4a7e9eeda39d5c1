//! Defines the error type emitted by the matching engine

use thiserror::Error;

/// The error type emitted by the matching engine
///
/// Order rejections are not represented here; they travel back to the
/// requester on the job's response channel. These errors cover the engine's
/// own failures, which drop the response channel instead of answering
#[derive(Clone, Debug, Error)]
pub enum MatchingEngineError {
    /// The coordinator cancelled the worker
    #[error("matching engine cancelled: {0}")]
    Cancelled(String),
    /// The job queue was closed by its senders
    #[error("job queue closed: {0}")]
    JobQueueClosed(String),
    /// An error submitting a transaction to the ledger
    #[error("ledger error: {0}")]
    Ledger(String),
    /// An error generating a proof for a reveal
    #[error("proof generation failed: {0}")]
    ProofGeneration(String),
    /// An error sending a message to another local worker
    #[error("error sending message to worker: {0}")]
    SendMessage(String),
    /// An error setting up the worker
    #[error("setup error: {0}")]
    Setup(String),
    /// The book and the vault disagree about an order
    #[error("state error: {0}")]
    State(String),
}
