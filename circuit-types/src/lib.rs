//! Defines the types that move through the proof pipeline: order and
//! settlement terms, their commitments, accumulator openings, and the
//! statement/witness pairs of each circuit
//!
//! The statement evaluation functions in this crate are the single source of
//! truth for the protocol's arithmetic. The matching engine pre-validates
//! with them, the local prover refuses to attest to statements they reject,
//! and the embedded ledger re-derives its acceptance conditions from the same
//! code paths

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod deposit;
pub mod deposit_claim;
pub mod errors;
pub mod match_validity;
pub mod merkle;
pub mod order;
pub mod order_validity;
pub mod proof;
pub mod settlement;

pub use duskpool_crypto::Scalar;

/// The integer type backing order amounts
pub type Amount = u128;

/// The integer type backing order prices
pub type Price = u128;
