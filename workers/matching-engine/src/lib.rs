//! The matching engine: the single owner of the resting order book and the
//! vault of revealed order terms
//!
//! Every reveal, cancellation, and matching cycle flows through one executor
//! loop, so a cycle observes a stable book and never races a mutation.
//! Crossing pairs leave the engine as `PendingProof` records in the shared
//! match index; the orchestrator drives them to settlement from there

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod error;
pub mod executor;
pub mod worker;

pub use error::MatchingEngineError;
pub use executor::MatchingEngineExecutor;
pub use worker::{MatchingEngine, MatchingEngineConfig};
