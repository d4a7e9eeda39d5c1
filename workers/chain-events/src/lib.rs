//! The chain events worker: a periodic poller over the ledger's sequenced
//! event log
//!
//! The poller keeps a cursor past the last observed log index and republishes
//! every new event on the system bus. It only observes and forwards; match
//! records and the book are owned elsewhere

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod error;
pub mod listener;
pub mod worker;

pub use error::ChainEventsError;
pub use listener::{ChainEventsConfig, ChainEventsExecutor, ChainEventsListener};
