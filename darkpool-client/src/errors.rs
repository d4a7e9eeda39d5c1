//! Possible errors thrown by the darkpool client

use darkpool::DarkpoolError;

/// The error type returned by the darkpool client interface
#[derive(Clone, Debug, thiserror::Error)]
pub enum DarkpoolClientError {
    /// The ledger rejected the transaction
    #[error("transaction rejected: {0}")]
    Rejected(#[from] DarkpoolError),
    /// Error thrown when encoding or decoding an entrypoint call
    #[error("calldata error: {0}")]
    Calldata(String),
    /// An error interacting with the lower level rpc client
    #[error("RPC error: {0}")]
    Rpc(String),
}

impl DarkpoolClientError {
    /// Create a new calldata error
    #[allow(clippy::needless_pass_by_value)]
    pub fn calldata<T: ToString>(msg: T) -> Self {
        Self::Calldata(msg.to_string())
    }

    /// Create a new RPC error
    #[allow(clippy::needless_pass_by_value)]
    pub fn rpc<T: ToString>(msg: T) -> Self {
        Self::Rpc(msg.to_string())
    }

    /// Whether the error is a rejection the caller may surface verbatim
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
