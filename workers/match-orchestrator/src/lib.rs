//! The match orchestrator: the single writer of match records after their
//! creation
//!
//! The orchestrator consumes the matching engine's discoveries and the
//! counterparties' settlement payloads, and drives each match through its
//! lifecycle by spawning per-match tasks on the task driver. At most one
//! task runs per match; the record's status field is the lock

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod error;
pub mod executor;
pub mod worker;

pub use error::MatchOrchestratorError;
pub use executor::MatchOrchestratorExecutor;
pub use worker::{MatchOrchestrator, MatchOrchestratorConfig};
