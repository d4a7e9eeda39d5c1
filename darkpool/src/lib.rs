//! The embedded darkpool ledger: an in-process state machine owning the
//! authoritative order and match records, the deposit accumulator, the
//! nullifier set, and a sequenced event log
//!
//! Entrypoints verify a proof bundle for the expected circuit and then
//! re-check every state-dependent condition themselves: commitment
//! registration, order statuses, root currency, the denomination set, and
//! nullifier freshness. Proof verification trusts locally attested bundles;
//! the local prover refuses to attest to statements that fail native
//! evaluation, so the attestation check plus the re-checks reproduce the
//! acceptance conditions a real verifier would enforce.
//!
//! Each accepted transaction advances the block counter by one; callers
//! serialize submissions through the client's lock, which gives the machine
//! single-writer-per-transaction semantics

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod accumulator;
pub mod records;

use std::collections::{HashMap, HashSet};

use circuit_types::{
    Scalar,
    deposit::Nullifier,
    deposit_claim::DepositClaimStatement,
    errors::SignalsError,
    match_validity::MatchValidityStatement,
    merkle::MerkleRoot,
    order_validity::OrderValidityStatement,
    proof::{CircuitId, ProofBundle},
};
use common::types::{
    ledger::{LedgerEvent, OrderStatus, SequencedEvent},
    r#match::TransferPayload,
};
use constants::ALLOWED_DENOMINATIONS;
use thiserror::Error;

use crate::{
    accumulator::{AccumulatorError, DepositAccumulator},
    records::{MatchRecord, OrderRecord},
};

// ----------
// | Errors |
// ----------

/// The reasons the ledger rejects a transaction
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DarkpoolError {
    /// A bundle was submitted for the wrong circuit
    #[error("expected a proof for the {expected} circuit, got {actual}")]
    WrongCircuit {
        /// The circuit the entrypoint verifies
        expected: CircuitId,
        /// The circuit the bundle claims
        actual: CircuitId,
    },
    /// A proof failed verification against its public signals
    #[error("proof verification failed for the {0} circuit")]
    InvalidProof(CircuitId),
    /// A bundle's public signals do not decode to the circuit's statement
    #[error("malformed public signals: {0}")]
    MalformedSignals(String),
    /// The submitted commitment is already registered
    #[error("commitment is already registered")]
    DuplicateCommitment,
    /// No order is registered under the commitment
    #[error("no order with the given commitment")]
    UnknownOrder,
    /// An order is not in the status the transition requires
    #[error("order is {actual}; the transition requires {expected}")]
    WrongOrderStatus {
        /// The status the transition requires
        expected: OrderStatus,
        /// The status the order is in
        actual: OrderStatus,
    },
    /// A match referenced the same commitment on both legs
    #[error("a match may not reference the same commitment twice")]
    SelfMatch,
    /// No match record carries the id
    #[error("no match with id {0}")]
    UnknownMatch(u64),
    /// The match has already executed its settlement
    #[error("match {0} has already settled")]
    AlreadySettled(u64),
    /// A settlement was submitted with an empty transfer payload
    #[error("transfer payloads must not be empty")]
    EmptyPayload,
    /// The caller is not the order's registered owner
    #[error("caller is not the order's owner")]
    NotOwner,
    /// A claim was stated against a root other than the current one
    #[error("claim root does not match the current accumulator root")]
    StaleRoot,
    /// A claim named a denomination outside the allowed set
    #[error("denomination is not one of the allowed deposit amounts")]
    InvalidDenomination,
    /// A claim attempted to respend a nullifier
    #[error("nullifier has already been spent")]
    NullifierSpent,
    /// The deposit accumulator refused an insertion
    #[error(transparent)]
    Accumulator(#[from] AccumulatorError),
}

impl From<SignalsError> for DarkpoolError {
    fn from(err: SignalsError) -> Self {
        DarkpoolError::MalformedSignals(err.to_string())
    }
}

// ------------
// | Outcomes |
// ------------

/// The outcome of an accepted match submission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchAccepted {
    /// The sequential id the ledger assigned to the match
    pub match_id: u64,
    /// The block the transaction was sequenced into
    pub block_number: u64,
}

/// The outcome of an accepted deposit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositAccepted {
    /// The index the leaf was appended at
    pub index: u64,
    /// The accumulator root after insertion
    pub new_root: MerkleRoot,
    /// The block the transaction was sequenced into
    pub block_number: u64,
}

// -----------------
// | State Machine |
// -----------------

/// The embedded darkpool ledger
#[derive(Clone, Debug, Default)]
pub struct Darkpool {
    /// The order records keyed by commitment
    orders: HashMap<Scalar, OrderRecord>,
    /// The match records keyed by their sequential id
    matches: HashMap<u64, MatchRecord>,
    /// The id the next match record will take
    next_match_id: u64,
    /// The deposit accumulator
    accumulator: DepositAccumulator,
    /// The spent nullifiers
    nullifiers: HashSet<Nullifier>,
    /// The sequenced event log
    events: Vec<SequencedEvent>,
    /// The block counter; each accepted transaction advances one block
    block_number: u64,
}

impl Darkpool {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------
    // | Entrypoints |
    // ---------------

    /// Register an order commitment as active
    ///
    /// The bundle must prove the order validity statement for the
    /// commitment; the owner key authorizes later cancellation. Returns the
    /// block the transaction was sequenced into
    pub fn submit_order(
        &mut self,
        bundle: &ProofBundle,
        owner_key: Scalar,
    ) -> Result<u64, DarkpoolError> {
        self.verify_bundle(CircuitId::OrderValidity, bundle)?;
        let statement = OrderValidityStatement::from_public_signals(&bundle.public_signals)?;

        let commitment = statement.commitment;
        if self.orders.contains_key(&commitment) {
            return Err(DarkpoolError::DuplicateCommitment);
        }

        let block = self.next_block();
        self.orders.insert(commitment, OrderRecord::new_active(commitment, owner_key));
        self.record_event(LedgerEvent::OrderSubmitted { commitment });
        Ok(block)
    }

    /// Record a match between two active commitments
    ///
    /// The bundle must prove the match validity statement. Both referenced
    /// orders move `Active -> Matched` and an immutable match record is
    /// created with its `settled` flag clear
    pub fn submit_match(&mut self, bundle: &ProofBundle) -> Result<MatchAccepted, DarkpoolError> {
        self.verify_bundle(CircuitId::MatchValidity, bundle)?;
        let statement = MatchValidityStatement::from_public_signals(&bundle.public_signals)?;

        if statement.buy_commitment == statement.sell_commitment {
            return Err(DarkpoolError::SelfMatch);
        }
        self.check_order_status(&statement.buy_commitment, OrderStatus::Active)?;
        self.check_order_status(&statement.sell_commitment, OrderStatus::Active)?;

        let block = self.next_block();
        self.set_order_status(&statement.buy_commitment, OrderStatus::Matched);
        self.set_order_status(&statement.sell_commitment, OrderStatus::Matched);

        let match_id = self.next_match_id;
        self.next_match_id += 1;
        self.matches.insert(
            match_id,
            MatchRecord {
                id: match_id,
                buy_commitment: statement.buy_commitment,
                sell_commitment: statement.sell_commitment,
                settlement_commitment: statement.settlement_commitment,
                settled: false,
            },
        );

        self.record_event(LedgerEvent::MatchSubmitted {
            ledger_match_id: match_id,
            buy_commitment: statement.buy_commitment,
            sell_commitment: statement.sell_commitment,
            settlement_commitment: statement.settlement_commitment,
        });
        Ok(MatchAccepted { match_id, block_number: block })
    }

    /// Execute a recorded match's bilateral transfers, exactly once
    ///
    /// Both legs move `Matched -> Settled` and the record's `settled` flag
    /// is raised; a second submission fails on that flag. Returns the block
    /// the transaction was sequenced into
    pub fn submit_settlement(
        &mut self,
        match_id: u64,
        buyer_payload: &TransferPayload,
        seller_payload: &TransferPayload,
    ) -> Result<u64, DarkpoolError> {
        if buyer_payload.is_empty() || seller_payload.is_empty() {
            return Err(DarkpoolError::EmptyPayload);
        }

        let record = self.matches.get(&match_id).ok_or(DarkpoolError::UnknownMatch(match_id))?;
        if record.settled {
            return Err(DarkpoolError::AlreadySettled(match_id));
        }

        let buy_commitment = record.buy_commitment;
        let sell_commitment = record.sell_commitment;
        self.check_order_status(&buy_commitment, OrderStatus::Matched)?;
        self.check_order_status(&sell_commitment, OrderStatus::Matched)?;

        let block = self.next_block();
        self.set_order_status(&buy_commitment, OrderStatus::Settled);
        self.set_order_status(&sell_commitment, OrderStatus::Settled);
        if let Some(record) = self.matches.get_mut(&match_id) {
            record.settled = true;
        }

        self.record_event(LedgerEvent::SettlementExecuted { ledger_match_id: match_id });
        Ok(block)
    }

    /// Cancel an active order, authorized by its registered owner
    pub fn cancel_order(
        &mut self,
        commitment: Scalar,
        caller_key: Scalar,
    ) -> Result<u64, DarkpoolError> {
        let record = self.orders.get(&commitment).ok_or(DarkpoolError::UnknownOrder)?;
        if record.owner_key != caller_key {
            return Err(DarkpoolError::NotOwner);
        }
        if record.status != OrderStatus::Active {
            return Err(DarkpoolError::WrongOrderStatus {
                expected: OrderStatus::Active,
                actual: record.status,
            });
        }

        let block = self.next_block();
        self.set_order_status(&commitment, OrderStatus::Cancelled);
        self.record_event(LedgerEvent::OrderCancelled { commitment });
        Ok(block)
    }

    /// Append a deposit leaf to the accumulator
    pub fn deposit(&mut self, leaf: Scalar) -> Result<DepositAccepted, DarkpoolError> {
        let index = self.accumulator.leaf_count();
        let new_root = self.accumulator.insert(leaf)?;

        let block = self.next_block();
        self.record_event(LedgerEvent::DepositInserted { leaf, index, new_root });
        Ok(DepositAccepted { index, new_root, block_number: block })
    }

    /// Claim a deposit, spending its nullifier
    ///
    /// The bundle must prove the deposit claim statement. The ledger
    /// re-checks that the stated root is the current one (no historical
    /// roots), that the denomination is allowed, and that the nullifier is
    /// fresh; success marks the nullifier spent and authorizes a one-time
    /// transfer of the denomination
    pub fn claim(&mut self, bundle: &ProofBundle) -> Result<u64, DarkpoolError> {
        self.verify_bundle(CircuitId::DepositClaim, bundle)?;
        let statement = DepositClaimStatement::from_public_signals(&bundle.public_signals)?;

        if statement.root != self.accumulator.root() {
            return Err(DarkpoolError::StaleRoot);
        }
        if !ALLOWED_DENOMINATIONS.contains(&statement.denomination) {
            return Err(DarkpoolError::InvalidDenomination);
        }
        if self.nullifiers.contains(&statement.nullifier) {
            return Err(DarkpoolError::NullifierSpent);
        }

        let block = self.next_block();
        self.nullifiers.insert(statement.nullifier);
        self.record_event(LedgerEvent::ClaimExecuted {
            nullifier: statement.nullifier,
            denomination: statement.denomination,
        });
        Ok(block)
    }

    // -----------
    // | Queries |
    // -----------

    /// The status of a commitment; unregistered commitments are `Inactive`
    pub fn order_status(&self, commitment: &Scalar) -> OrderStatus {
        self.orders.get(commitment).map(|record| record.status).unwrap_or_default()
    }

    /// The match record with the given id
    pub fn match_record(&self, match_id: u64) -> Option<MatchRecord> {
        self.matches.get(&match_id).cloned()
    }

    /// The current accumulator root
    pub fn root(&self) -> MerkleRoot {
        self.accumulator.root()
    }

    /// The number of leaves inserted into the accumulator
    pub fn leaf_count(&self) -> u64 {
        self.accumulator.leaf_count()
    }

    /// Whether a nullifier has been spent
    pub fn nullifier_spent(&self, nullifier: &Nullifier) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// The current block number
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// The number of events in the sequenced log
    pub fn event_count(&self) -> u64 {
        self.events.len() as u64
    }

    /// The events at and after the given log index
    pub fn events_since(&self, index: u64) -> Vec<SequencedEvent> {
        self.events.iter().skip(index as usize).cloned().collect()
    }

    // -----------
    // | Helpers |
    // -----------

    /// Verify a proof bundle for the circuit an entrypoint expects
    fn verify_bundle(
        &self,
        expected: CircuitId,
        bundle: &ProofBundle,
    ) -> Result<(), DarkpoolError> {
        if bundle.circuit != expected {
            return Err(DarkpoolError::WrongCircuit { expected, actual: bundle.circuit });
        }
        if !bundle.proof.check_attestation(bundle.circuit, &bundle.public_signals) {
            return Err(DarkpoolError::InvalidProof(bundle.circuit));
        }

        Ok(())
    }

    /// Require that an order exists and sits in the given status
    fn check_order_status(
        &self,
        commitment: &Scalar,
        expected: OrderStatus,
    ) -> Result<(), DarkpoolError> {
        let record = self.orders.get(commitment).ok_or(DarkpoolError::UnknownOrder)?;
        if record.status != expected {
            return Err(DarkpoolError::WrongOrderStatus { expected, actual: record.status });
        }

        Ok(())
    }

    /// Set the status of a registered order
    fn set_order_status(&mut self, commitment: &Scalar, status: OrderStatus) {
        if let Some(record) = self.orders.get_mut(commitment) {
            record.status = status;
        }
    }

    /// Advance the block counter for an accepted transaction
    fn next_block(&mut self) -> u64 {
        self.block_number += 1;
        self.block_number
    }

    /// Append an event to the sequenced log at the current block
    fn record_event(&mut self, event: LedgerEvent) {
        let index = self.events.len() as u64;
        self.events.push(SequencedEvent { index, block_number: self.block_number, event });
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        deposit::{compute_claim_nullifier, compute_deposit_leaf, compute_deposit_salt},
        deposit_claim::DepositClaimStatement,
        match_validity::MatchValidityStatement,
        order::{OrderSide, OrderTerms},
        order_validity::OrderValidityStatement,
        proof::{CircuitId, Proof, ProofBundle},
        settlement::SettlementTerms,
    };
    use common::types::{ledger::{LedgerEvent, OrderStatus}, r#match::TransferPayload};
    use constants::ALLOWED_DENOMINATIONS;
    use rand::thread_rng;

    use crate::accumulator::build_opening;

    use super::{Darkpool, DarkpoolError};

    /// Attest a statement's public signals into a bundle
    fn bundle(circuit: CircuitId, signals: Vec<Scalar>) -> ProofBundle {
        ProofBundle { circuit, proof: Proof::attest(circuit, &signals), public_signals: signals }
    }

    /// Build order terms with a random nonce
    fn terms(side: OrderSide, price: u128, amount: u128) -> OrderTerms {
        let mut rng = thread_rng();
        OrderTerms { side, price, amount, nonce: Scalar::random(&mut rng) }
    }

    /// Submit an order for the given terms, returning its commitment
    fn submit(pool: &mut Darkpool, terms: &OrderTerms, owner_key: Scalar) -> Scalar {
        let statement = OrderValidityStatement { commitment: terms.compute_commitment() };
        let b = bundle(CircuitId::OrderValidity, statement.to_public_signals());
        pool.submit_order(&b, owner_key).unwrap();
        statement.commitment
    }

    /// Submit a match over the given legs, returning the ledger match id
    fn submit_match(pool: &mut Darkpool, buy: &OrderTerms, sell: &OrderTerms) -> u64 {
        let settlement = SettlementTerms::derive(buy, sell).unwrap();
        let statement = MatchValidityStatement {
            buy_commitment: buy.compute_commitment(),
            sell_commitment: sell.compute_commitment(),
            settlement_commitment: settlement.compute_commitment(),
        };
        let b = bundle(CircuitId::MatchValidity, statement.to_public_signals());
        pool.submit_match(&b).unwrap().match_id
    }

    /// A non-empty transfer payload
    fn payload() -> TransferPayload {
        TransferPayload::new(vec![Scalar::from(5u8)])
    }

    /// Tests order submission, the status query, and duplicate rejection
    #[test]
    fn test_submit_order() {
        let mut pool = Darkpool::new();
        let order = terms(OrderSide::Buy, 1000, 500);
        let commitment = order.compute_commitment();
        assert_eq!(pool.order_status(&commitment), OrderStatus::Inactive);

        let statement = OrderValidityStatement { commitment };
        let b = bundle(CircuitId::OrderValidity, statement.to_public_signals());
        let block = pool.submit_order(&b, Scalar::from(1u8)).unwrap();
        assert_eq!(block, 1);
        assert_eq!(pool.order_status(&commitment), OrderStatus::Active);

        let res = pool.submit_order(&b, Scalar::from(1u8));
        assert_eq!(res, Err(DarkpoolError::DuplicateCommitment));

        let events = pool.events_since(0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 0);
        assert_eq!(events[0].block_number, 1);
        assert_eq!(events[0].event, LedgerEvent::OrderSubmitted { commitment });
    }

    /// Tests that tampered or mis-circuited bundles are rejected
    #[test]
    fn test_proof_rejections() {
        let mut pool = Darkpool::new();
        let order = terms(OrderSide::Buy, 1000, 500);
        let statement = OrderValidityStatement { commitment: order.compute_commitment() };

        let mut tampered = bundle(CircuitId::OrderValidity, statement.to_public_signals());
        tampered.public_signals[0] = tampered.public_signals[0] + Scalar::one();
        assert_eq!(
            pool.submit_order(&tampered, Scalar::from(1u8)),
            Err(DarkpoolError::InvalidProof(CircuitId::OrderValidity)),
        );

        let wrong_circuit = bundle(CircuitId::MatchValidity, statement.to_public_signals());
        assert_eq!(
            pool.submit_order(&wrong_circuit, Scalar::from(1u8)),
            Err(DarkpoolError::WrongCircuit {
                expected: CircuitId::OrderValidity,
                actual: CircuitId::MatchValidity,
            }),
        );
    }

    /// Tests the full match and settlement flow with its status transitions
    #[test]
    fn test_match_and_settle() {
        let mut pool = Darkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let sell = terms(OrderSide::Sell, 900, 600);
        let buy_commitment = submit(&mut pool, &buy, Scalar::from(1u8));
        let sell_commitment = submit(&mut pool, &sell, Scalar::from(2u8));

        let match_id = submit_match(&mut pool, &buy, &sell);
        assert_eq!(pool.order_status(&buy_commitment), OrderStatus::Matched);
        assert_eq!(pool.order_status(&sell_commitment), OrderStatus::Matched);

        let record = pool.match_record(match_id).unwrap();
        assert!(!record.settled);
        assert_eq!(record.buy_commitment, buy_commitment);

        pool.submit_settlement(match_id, &payload(), &payload()).unwrap();
        assert_eq!(pool.order_status(&buy_commitment), OrderStatus::Settled);
        assert_eq!(pool.order_status(&sell_commitment), OrderStatus::Settled);
        assert!(pool.match_record(match_id).unwrap().settled);

        // The settled flag guards re-execution
        assert_eq!(
            pool.submit_settlement(match_id, &payload(), &payload()),
            Err(DarkpoolError::AlreadySettled(match_id)),
        );
    }

    /// Tests the match submission re-checks: active legs and distinct legs
    #[test]
    fn test_match_requires_active_legs() {
        let mut pool = Darkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let sell = terms(OrderSide::Sell, 900, 600);
        submit(&mut pool, &buy, Scalar::from(1u8));

        // The sell leg was never submitted
        let settlement = SettlementTerms::derive(&buy, &sell).unwrap();
        let statement = MatchValidityStatement {
            buy_commitment: buy.compute_commitment(),
            sell_commitment: sell.compute_commitment(),
            settlement_commitment: settlement.compute_commitment(),
        };
        let b = bundle(CircuitId::MatchValidity, statement.to_public_signals());
        assert_eq!(pool.submit_match(&b), Err(DarkpoolError::UnknownOrder));

        // Cancel the buy leg and resubmit over two registered orders
        pool.cancel_order(buy.compute_commitment(), Scalar::from(1u8)).unwrap();
        submit(&mut pool, &sell, Scalar::from(2u8));
        assert_eq!(
            pool.submit_match(&b),
            Err(DarkpoolError::WrongOrderStatus {
                expected: OrderStatus::Active,
                actual: OrderStatus::Cancelled,
            }),
        );
    }

    /// Tests that a match referencing one commitment twice is rejected
    #[test]
    fn test_self_match_rejected() {
        let mut pool = Darkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let commitment = submit(&mut pool, &buy, Scalar::from(1u8));

        let statement = MatchValidityStatement {
            buy_commitment: commitment,
            sell_commitment: commitment,
            settlement_commitment: Scalar::from(3u8),
        };
        let b = bundle(CircuitId::MatchValidity, statement.to_public_signals());
        assert_eq!(pool.submit_match(&b), Err(DarkpoolError::SelfMatch));
    }

    /// Tests cancellation authorization and status gating
    #[test]
    fn test_cancel_order() {
        let mut pool = Darkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let owner = Scalar::from(1u8);
        let commitment = submit(&mut pool, &buy, owner);

        assert_eq!(
            pool.cancel_order(commitment, Scalar::from(9u8)),
            Err(DarkpoolError::NotOwner),
        );

        pool.cancel_order(commitment, owner).unwrap();
        assert_eq!(pool.order_status(&commitment), OrderStatus::Cancelled);

        // A cancelled order may not be cancelled again
        assert_eq!(
            pool.cancel_order(commitment, owner),
            Err(DarkpoolError::WrongOrderStatus {
                expected: OrderStatus::Active,
                actual: OrderStatus::Cancelled,
            }),
        );
    }

    /// Tests that cancelling a matched order is rejected
    #[test]
    fn test_cancel_matched_rejected() {
        let mut pool = Darkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let sell = terms(OrderSide::Sell, 900, 600);
        let owner = Scalar::from(1u8);
        let commitment = submit(&mut pool, &buy, owner);
        submit(&mut pool, &sell, Scalar::from(2u8));
        submit_match(&mut pool, &buy, &sell);

        assert_eq!(
            pool.cancel_order(commitment, owner),
            Err(DarkpoolError::WrongOrderStatus {
                expected: OrderStatus::Active,
                actual: OrderStatus::Matched,
            }),
        );
    }

    /// Tests the deposit and claim flow, including the nullifier guard
    #[test]
    fn test_deposit_and_claim() {
        let mut rng = thread_rng();
        let mut pool = Darkpool::new();

        let owner_key = Scalar::random(&mut rng);
        let secret = Scalar::random(&mut rng);
        let deposit_address = Scalar::random(&mut rng);
        let denomination = ALLOWED_DENOMINATIONS[0];
        let timestamp = 1_700_000_000u64;

        let salt = compute_deposit_salt(owner_key, secret);
        let leaf = compute_deposit_leaf(salt, deposit_address, denomination, timestamp);
        let accepted = pool.deposit(leaf).unwrap();
        assert_eq!(accepted.index, 0);
        assert_eq!(pool.leaf_count(), 1);
        assert_eq!(pool.root(), accepted.new_root);

        let nullifier = compute_claim_nullifier(owner_key, secret);
        let statement = DepositClaimStatement { root: pool.root(), denomination, nullifier };
        let b = bundle(CircuitId::DepositClaim, statement.to_public_signals());

        assert!(!pool.nullifier_spent(&nullifier));
        pool.claim(&b).unwrap();
        assert!(pool.nullifier_spent(&nullifier));

        // Respend fails regardless of the proof being valid
        assert_eq!(pool.claim(&b), Err(DarkpoolError::NullifierSpent));
    }

    /// Tests that claims against a superseded root are rejected
    #[test]
    fn test_claim_stale_root() {
        let mut rng = thread_rng();
        let mut pool = Darkpool::new();

        let leaf = Scalar::random(&mut rng);
        pool.deposit(leaf).unwrap();
        let old_root = pool.root();

        // A later deposit moves the root
        pool.deposit(Scalar::random(&mut rng)).unwrap();

        let statement = DepositClaimStatement {
            root: old_root,
            denomination: ALLOWED_DENOMINATIONS[0],
            nullifier: Scalar::random(&mut rng),
        };
        let b = bundle(CircuitId::DepositClaim, statement.to_public_signals());
        assert_eq!(pool.claim(&b), Err(DarkpoolError::StaleRoot));
    }

    /// Tests that the ledger re-checks the denomination set itself
    #[test]
    fn test_claim_invalid_denomination() {
        let mut rng = thread_rng();
        let mut pool = Darkpool::new();

        let statement = DepositClaimStatement {
            root: pool.root(),
            denomination: ALLOWED_DENOMINATIONS[0] + 1,
            nullifier: Scalar::random(&mut rng),
        };
        let b = bundle(CircuitId::DepositClaim, statement.to_public_signals());
        assert_eq!(pool.claim(&b), Err(DarkpoolError::InvalidDenomination));
    }

    /// Tests that a claim built from an opening over the ledger's leaves
    /// satisfies the claim statement against the live root
    #[test]
    fn test_opening_against_live_root() {
        let mut rng = thread_rng();
        let mut pool = Darkpool::new();

        let owner_key = Scalar::random(&mut rng);
        let secret = Scalar::random(&mut rng);
        let salt = compute_deposit_salt(owner_key, secret);
        let leaf =
            compute_deposit_leaf(salt, Scalar::from(7u8), ALLOWED_DENOMINATIONS[2], 1_700_000_000);

        let mut leaves = vec![Scalar::random(&mut rng), Scalar::random(&mut rng)];
        for l in leaves.iter() {
            pool.deposit(*l).unwrap();
        }
        pool.deposit(leaf).unwrap();
        leaves.push(leaf);

        let opening = build_opening(&leaves, 2).unwrap();
        assert_eq!(opening.compute_root(leaf), pool.root());
    }

    /// Tests that empty transfer payloads are rejected at settlement
    #[test]
    fn test_settlement_empty_payload() {
        let mut pool = Darkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let sell = terms(OrderSide::Sell, 900, 600);
        submit(&mut pool, &buy, Scalar::from(1u8));
        submit(&mut pool, &sell, Scalar::from(2u8));
        let match_id = submit_match(&mut pool, &buy, &sell);

        let empty = TransferPayload::new(Vec::new());
        assert_eq!(
            pool.submit_settlement(match_id, &empty, &payload()),
            Err(DarkpoolError::EmptyPayload),
        );

        // The failed settlement left the match unsettled and retryable
        assert!(!pool.match_record(match_id).unwrap().settled);
        pool.submit_settlement(match_id, &payload(), &payload()).unwrap();
    }

    /// Tests the event log's sequencing across a full flow
    #[test]
    fn test_event_log_sequencing() {
        let mut pool = Darkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let sell = terms(OrderSide::Sell, 900, 600);
        submit(&mut pool, &buy, Scalar::from(1u8));
        submit(&mut pool, &sell, Scalar::from(2u8));
        let match_id = submit_match(&mut pool, &buy, &sell);
        pool.submit_settlement(match_id, &payload(), &payload()).unwrap();

        let events = pool.events_since(0);
        assert_eq!(events.len(), 4);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.index, i as u64);
            assert_eq!(event.block_number, i as u64 + 1);
        }
        assert!(matches!(events[2].event, LedgerEvent::MatchSubmitted { .. }));
        assert!(matches!(
            events[3].event,
            LedgerEvent::SettlementExecuted { ledger_match_id } if ledger_match_id == match_id
        ));

        // A cursor past the end yields nothing
        assert!(pool.events_since(4).is_empty());
        assert_eq!(pool.event_count(), 4);
        assert_eq!(pool.block_number(), 4);
    }
}
