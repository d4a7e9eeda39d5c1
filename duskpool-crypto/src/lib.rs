//! Cryptographic primitives shared by the matcher, the proof pipeline, and
//! the embedded ledger
//!
//! All protocol hashing goes through the Poseidon sponge defined here; the
//! matching engine's pre-validation, the prover's statement evaluation, and
//! the ledger's record keeping must agree on this arithmetic bit-for-bit

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod fields;
pub mod hash;
pub mod scalar;

pub use scalar::Scalar;
