//! The client interface to the duskpool ledger
//!
//! Callers speak to the ledger through the [`DarkpoolClient`] trait; the
//! embedded implementation encodes each call into the ledger's calldata
//! shape, executes it against the in-process state machine, and synthesizes
//! receipts of the form an external chain client would return

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod calldata;
pub mod embedded;
pub mod errors;
pub mod traits;

pub use embedded::EmbeddedDarkpool;
pub use errors::DarkpoolClientError;
pub use traits::{DarkpoolClient, DepositReceipt, MatchSubmission};
