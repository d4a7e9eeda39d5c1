//! The calldata encoding for ledger entrypoint calls
//!
//! Submissions cross the client boundary as an encoded envelope naming the
//! entrypoint and carrying its arguments, the shape the ledger's verifier
//! decodes. The orchestrator's submit task encodes a match submission ahead
//! of sending it so the encoded artifact is recorded on the match

use circuit_types::{Scalar, proof::ProofBundle};
use common::types::r#match::{Calldata, TransferPayload};
use serde::{Deserialize, Serialize};

use crate::errors::DarkpoolClientError;

/// A ledger entrypoint call ahead of encoding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entrypoint", rename_all = "kebab-case")]
pub enum LedgerCall {
    /// Register an order commitment as active
    SubmitOrder {
        /// The order validity proof bundle
        bundle: ProofBundle,
        /// The key authorized to cancel the order
        owner_key: Scalar,
    },
    /// Record a match between two active commitments
    SubmitMatch {
        /// The match validity proof bundle
        bundle: ProofBundle,
    },
    /// Execute a recorded match's bilateral transfers
    SubmitSettlement {
        /// The ledger id of the match
        match_id: u64,
        /// The buyer's transfer payload
        buyer_payload: TransferPayload,
        /// The seller's transfer payload
        seller_payload: TransferPayload,
    },
    /// Cancel an active order
    CancelOrder {
        /// The commitment to cancel
        commitment: Scalar,
        /// The key of the calling owner
        caller_key: Scalar,
    },
    /// Append a deposit leaf to the accumulator
    Deposit {
        /// The leaf to append
        leaf: Scalar,
    },
    /// Claim a deposit, spending its nullifier
    Claim {
        /// The deposit claim proof bundle
        bundle: ProofBundle,
    },
}

impl LedgerCall {
    /// The name of the entrypoint the call targets
    pub fn entrypoint(&self) -> &'static str {
        match self {
            LedgerCall::SubmitOrder { .. } => "submit-order",
            LedgerCall::SubmitMatch { .. } => "submit-match",
            LedgerCall::SubmitSettlement { .. } => "submit-settlement",
            LedgerCall::CancelOrder { .. } => "cancel-order",
            LedgerCall::Deposit { .. } => "deposit",
            LedgerCall::Claim { .. } => "claim",
        }
    }
}

/// Encode an entrypoint call into submission calldata
pub fn encode_call(call: &LedgerCall) -> Result<Calldata, DarkpoolClientError> {
    let bytes = serde_json::to_vec(call).map_err(DarkpoolClientError::calldata)?;
    Ok(Calldata(bytes))
}

/// Decode submission calldata back into the entrypoint call it encodes
pub fn decode_call(calldata: &Calldata) -> Result<LedgerCall, DarkpoolClientError> {
    serde_json::from_slice(calldata.as_bytes()).map_err(DarkpoolClientError::calldata)
}
