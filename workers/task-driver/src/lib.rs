//! Groups together the long-running settlement tasks spawned by the match
//! orchestrator
//!
//! A task advances one match through a contiguous span of its lifecycle:
//! `SubmitMatchTask` carries a fresh match through proving and ledger
//! submission, `SettleMatchTask` carries a confirmed match through
//! settlement. The driver runs each task exactly once; a failed task runs
//! its cleanup step and any retry is an operator action

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod driver;
pub mod settle_match;
pub mod submit_match;
