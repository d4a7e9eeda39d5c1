//! Defines the `DarkpoolClient` trait, the interface workers use to submit
//! transactions to and query the duskpool ledger

use async_trait::async_trait;
use circuit_types::{Scalar, deposit::Nullifier, merkle::MerkleRoot, proof::ProofBundle};
use common::types::{
    ledger::{OrderStatus, SequencedEvent, TxReceipt},
    r#match::TransferPayload,
};
use darkpool::records::MatchRecord;

use crate::errors::DarkpoolClientError;

// -----------------------
// | Submission Outcomes |
// -----------------------

/// The outcome of an accepted match submission
#[derive(Clone, Debug)]
pub struct MatchSubmission {
    /// The identifier the ledger assigned to the match
    pub ledger_match_id: u64,
    /// The receipt of the accepted transaction
    pub receipt: TxReceipt,
}

/// The outcome of an accepted deposit
#[derive(Clone, Debug)]
pub struct DepositReceipt {
    /// The index the leaf was appended at
    pub index: u64,
    /// The accumulator root after the insertion
    pub new_root: MerkleRoot,
    /// The receipt of the accepted transaction
    pub receipt: TxReceipt,
}

// ----------------
// | Client Trait |
// ----------------

/// The async interface to the ledger
///
/// A returned receipt means the transaction was sequenced; rejections
/// surface as [`DarkpoolClientError::Rejected`] with the ledger's reason
/// intact so callers may record it verbatim
#[async_trait]
pub trait DarkpoolClient: Clone + Send + Sync + 'static {
    // ----------------
    // | Transactions |
    // ----------------

    /// Register an order commitment as active on the ledger
    async fn submit_order(
        &self,
        bundle: &ProofBundle,
        owner_key: Scalar,
    ) -> Result<TxReceipt, DarkpoolClientError>;

    /// Record a match between two active commitments
    async fn submit_match(
        &self,
        bundle: &ProofBundle,
    ) -> Result<MatchSubmission, DarkpoolClientError>;

    /// Execute a recorded match's bilateral transfers
    async fn submit_settlement(
        &self,
        ledger_match_id: u64,
        buyer_payload: &TransferPayload,
        seller_payload: &TransferPayload,
    ) -> Result<TxReceipt, DarkpoolClientError>;

    /// Cancel an active order, authorized by its owner key
    async fn cancel_order(
        &self,
        commitment: Scalar,
        caller_key: Scalar,
    ) -> Result<TxReceipt, DarkpoolClientError>;

    /// Append a deposit leaf to the ledger's accumulator
    async fn deposit(&self, leaf: Scalar) -> Result<DepositReceipt, DarkpoolClientError>;

    /// Claim a deposit, spending its nullifier
    async fn claim(&self, bundle: &ProofBundle) -> Result<TxReceipt, DarkpoolClientError>;

    // -----------
    // | Queries |
    // -----------

    /// Fetch the current accumulator root
    async fn get_root(&self) -> Result<MerkleRoot, DarkpoolClientError>;

    /// Fetch the number of leaves appended to the accumulator
    async fn get_leaf_count(&self) -> Result<u64, DarkpoolClientError>;

    /// Whether the given nullifier has been spent
    async fn is_nullifier_spent(&self, nullifier: Nullifier) -> Result<bool, DarkpoolClientError>;

    /// Fetch the ledger status of an order commitment
    async fn get_order_status(
        &self,
        commitment: Scalar,
    ) -> Result<OrderStatus, DarkpoolClientError>;

    /// Fetch a recorded match by its ledger id
    async fn get_match_record(
        &self,
        ledger_match_id: u64,
    ) -> Result<Option<MatchRecord>, DarkpoolClientError>;

    /// Fetch the current block number
    async fn get_block_number(&self) -> Result<u64, DarkpoolClientError>;

    /// Fetch all sequenced events at or after the given log index
    async fn events_since(&self, index: u64) -> Result<Vec<SequencedEvent>, DarkpoolClientError>;
}
