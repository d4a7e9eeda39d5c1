//! The proof manager: generates proofs for the node's circuits on a local
//! thread pool
//!
//! The shipped backend natively evaluates each statement against its witness
//! and attests to the public signals only if evaluation succeeds, so a proof
//! is never issued for a false statement. Evaluation failures are returned
//! to the requester with the backend's reason verbatim

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod error;
pub mod mock;
pub mod proof_manager;
pub mod worker;

pub use error::ProofManagerError;
pub use proof_manager::ProofManager;
pub use worker::{ProofManagerConfig, ProofManagerWorker};
