//! Types for match records and the settlement state machine they advance
//! through

use std::fmt::{self, Display};
use std::str::FromStr;

use circuit_types::{Scalar, proof::ProofBundle, settlement::SettlementTerms};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::get_current_time_millis;
use uuid::Uuid;

use super::{MatchIdentifier, order::RevealedOrder};

// -------------------
// | Status Machine  |
// -------------------

/// The status of a match as it advances from discovery to settlement
///
/// The status field doubles as the pipeline lock: a record in `Proving`,
/// `Submitting`, or `Settling` has a task in flight and must not be picked up
/// again until that task lands the record in a resting state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    /// The match has been recorded but no proof job has been dispatched
    PendingProof,
    /// A match validity proof is being generated
    Proving,
    /// The match submission transaction is in flight to the ledger
    Submitting,
    /// The match is recorded on the ledger; awaiting both transfer payloads
    Confirmed,
    /// The settlement transaction is in flight to the ledger
    Settling,
    /// The settlement transaction landed; the record is terminal
    Settled,
    /// Proving or submission failed; the record is terminal and any retry is
    /// an operator action
    Failed {
        /// The error surfaced by the prover or the ledger, verbatim
        reason: String,
    },
}

impl MatchStatus {
    /// Whether the machine may move from `self` to `next`
    ///
    /// `Settling -> Confirmed` is the settlement failure revert; all other
    /// backward edges are rejected
    pub fn can_transition_to(&self, next: &MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::PendingProof, MatchStatus::Proving)
                | (MatchStatus::Proving, MatchStatus::Submitting)
                | (MatchStatus::Proving, MatchStatus::Failed { .. })
                | (MatchStatus::Submitting, MatchStatus::Confirmed)
                | (MatchStatus::Submitting, MatchStatus::Failed { .. })
                | (MatchStatus::Confirmed, MatchStatus::Settling)
                | (MatchStatus::Settling, MatchStatus::Settled)
                | (MatchStatus::Settling, MatchStatus::Confirmed)
        )
    }

    /// Whether the status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Settled | MatchStatus::Failed { .. })
    }
}

impl Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::PendingProof => write!(f, "pending-proof"),
            MatchStatus::Proving => write!(f, "proving"),
            MatchStatus::Submitting => write!(f, "submitting"),
            MatchStatus::Confirmed => write!(f, "confirmed"),
            MatchStatus::Settling => write!(f, "settling"),
            MatchStatus::Settled => write!(f, "settled"),
            MatchStatus::Failed { reason } => write!(f, "failed({reason})"),
        }
    }
}

/// The error emitted when a status transition violates the machine
#[derive(Clone, Debug, Error)]
#[error("invalid match status transition from {from} to {to}")]
pub struct InvalidTransition {
    /// The status the record was in
    pub from: MatchStatus,
    /// The status the transition attempted to reach
    pub to: MatchStatus,
}

// ----------------------
// | Settlement Payload |
// ----------------------

/// The role a counterparty plays in settling a match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementRole {
    /// The owner of the buy side leg
    Buyer,
    /// The owner of the sell side leg
    Seller,
}

impl Display for SettlementRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementRole::Buyer => write!(f, "buyer"),
            SettlementRole::Seller => write!(f, "seller"),
        }
    }
}

impl FromStr for SettlementRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buyer" => Ok(SettlementRole::Buyer),
            "seller" => Ok(SettlementRole::Seller),
            _ => Err(format!("invalid settlement role: {s}")),
        }
    }
}

/// An opaque bilateral transfer payload supplied by a counterparty
///
/// The matcher forwards the payload to the settlement entrypoint without
/// interpreting its elements
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPayload(Vec<Scalar>);

impl TransferPayload {
    /// Wrap a sequence of field elements as a transfer payload
    pub fn new(elems: Vec<Scalar>) -> Self {
        Self(elems)
    }

    /// The payload's field elements
    pub fn elements(&self) -> &[Scalar] {
        &self.0
    }

    /// The number of field elements in the payload
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload carries no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The encoded form of a ledger entrypoint call, produced by the client's
/// encoder ahead of submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calldata(pub Vec<u8>);

impl Calldata {
    /// The encoded bytes of the call
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// ----------------
// | Match Record |
// ----------------

/// The record of a crossing pair found by the matching engine
///
/// Created once by the matching engine, then mutated only by the
/// orchestrator's task pipeline as the status advances. Terminal records are
/// retained for audit
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchResult {
    /// The identifier of the match
    pub id: MatchIdentifier,
    /// The commitment of the buy side order
    pub buy_commitment: Scalar,
    /// The commitment of the sell side order
    pub sell_commitment: Scalar,
    /// The derived settlement terms; the cleared amount and midpoint price
    pub settlement: SettlementTerms,
    /// The commitment to the settlement terms recorded on the ledger
    pub settlement_commitment: Scalar,
    /// The status of the match in the settlement pipeline
    pub status: MatchStatus,
    /// The match validity proof, present once proving completes
    pub proof: Option<ProofBundle>,
    /// The encoded submission calldata, present once the proof is encoded
    pub calldata: Option<Calldata>,
    /// The hash of the accepted match submission transaction
    pub tx_hash: Option<String>,
    /// The identifier the ledger assigned to the match at submission
    pub ledger_match_id: Option<u64>,
    /// The buyer's bilateral transfer payload
    pub buyer_payload: Option<TransferPayload>,
    /// The seller's bilateral transfer payload
    pub seller_payload: Option<TransferPayload>,
    /// The unix timestamp in milliseconds at which the match was found
    pub created_at: u64,
}

impl MatchResult {
    /// Create a record for a crossing pair
    ///
    /// The caller has already derived and validated the settlement terms;
    /// this constructor only snapshots the public fields
    pub fn new(buy: &RevealedOrder, sell: &RevealedOrder, settlement: SettlementTerms) -> Self {
        Self {
            id: Uuid::new_v4(),
            buy_commitment: buy.commitment,
            sell_commitment: sell.commitment,
            settlement,
            settlement_commitment: settlement.compute_commitment(),
            status: MatchStatus::PendingProof,
            proof: None,
            calldata: None,
            tx_hash: None,
            ledger_match_id: None,
            buyer_payload: None,
            seller_payload: None,
            created_at: get_current_time_millis(),
        }
    }

    /// Advance the status, enforcing the transition machine
    pub fn transition(&mut self, next: MatchStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(&next) {
            return Err(InvalidTransition { from: self.status.clone(), to: next });
        }

        self.status = next;
        Ok(())
    }

    /// Record a counterparty's transfer payload
    ///
    /// Returns `false` if the role has already supplied a payload; the first
    /// payload for a role wins
    pub fn record_payload(&mut self, role: SettlementRole, payload: TransferPayload) -> bool {
        let slot = match role {
            SettlementRole::Buyer => &mut self.buyer_payload,
            SettlementRole::Seller => &mut self.seller_payload,
        };

        if slot.is_some() {
            return false;
        }

        *slot = Some(payload);
        true
    }

    /// Whether both counterparties have supplied their transfer payloads
    pub fn both_payloads_received(&self) -> bool {
        self.buyer_payload.is_some() && self.seller_payload.is_some()
    }

    /// Drop both recorded transfer payloads
    ///
    /// A failed settlement releases the payloads alongside the revert to
    /// `Confirmed` so the counterparties may resubmit corrected ones
    pub fn clear_payloads(&mut self) {
        self.buyer_payload = None;
        self.seller_payload = None;
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        order::{OrderSide, OrderTerms},
        settlement::SettlementTerms,
    };

    use super::{MatchResult, MatchStatus, SettlementRole, TransferPayload};
    use crate::types::order::RevealedOrder;

    /// Build a match record from a reference crossing pair
    fn reference_match() -> MatchResult {
        let buy_terms =
            OrderTerms { side: OrderSide::Buy, price: 1000, amount: 500, nonce: Scalar::from(1u8) };
        let sell_terms =
            OrderTerms { side: OrderSide::Sell, price: 900, amount: 600, nonce: Scalar::from(2u8) };

        let buy = RevealedOrder::new(
            buy_terms,
            buy_terms.compute_commitment(),
            "buyer".to_string(),
            Scalar::from(10u8),
        );
        let sell = RevealedOrder::new(
            sell_terms,
            sell_terms.compute_commitment(),
            "seller".to_string(),
            Scalar::from(11u8),
        );

        let settlement = SettlementTerms::derive(&buy.terms, &sell.terms).unwrap();
        MatchResult::new(&buy, &sell, settlement)
    }

    /// Tests the happy path through the status machine
    #[test]
    fn test_lifecycle_happy_path() {
        let mut res = reference_match();
        assert_eq!(res.status, MatchStatus::PendingProof);

        res.transition(MatchStatus::Proving).unwrap();
        res.transition(MatchStatus::Submitting).unwrap();
        res.transition(MatchStatus::Confirmed).unwrap();
        res.transition(MatchStatus::Settling).unwrap();
        res.transition(MatchStatus::Settled).unwrap();

        assert!(res.status.is_terminal());
    }

    /// Tests that a settlement failure may revert to `Confirmed` and be
    /// retried
    #[test]
    fn test_settlement_revert() {
        let mut res = reference_match();
        res.transition(MatchStatus::Proving).unwrap();
        res.transition(MatchStatus::Submitting).unwrap();
        res.transition(MatchStatus::Confirmed).unwrap();
        res.transition(MatchStatus::Settling).unwrap();

        // Revert, then settle on the second attempt
        res.transition(MatchStatus::Confirmed).unwrap();
        res.transition(MatchStatus::Settling).unwrap();
        res.transition(MatchStatus::Settled).unwrap();
    }

    /// Tests that skipping states and resurrecting terminal records are
    /// rejected
    #[test]
    fn test_invalid_transitions() {
        let mut res = reference_match();
        assert!(res.transition(MatchStatus::Confirmed).is_err());
        assert!(res.transition(MatchStatus::Settled).is_err());

        // A failure from `PendingProof` is not lawful; the proof job must be
        // dispatched first
        let failed = MatchStatus::Failed { reason: "prover offline".to_string() };
        assert!(res.transition(failed.clone()).is_err());

        res.transition(MatchStatus::Proving).unwrap();
        res.transition(failed).unwrap();
        assert!(res.status.is_terminal());
        assert!(res.transition(MatchStatus::Proving).is_err());
    }

    /// Tests payload bookkeeping ahead of settlement
    #[test]
    fn test_payload_recording() {
        let mut res = reference_match();
        assert!(!res.both_payloads_received());

        let payload = TransferPayload::new(vec![Scalar::from(1u8), Scalar::from(2u8)]);
        assert!(res.record_payload(SettlementRole::Buyer, payload.clone()));
        assert!(!res.record_payload(SettlementRole::Buyer, payload.clone()));
        assert!(!res.both_payloads_received());

        assert!(res.record_payload(SettlementRole::Seller, payload));
        assert!(res.both_payloads_received());

        // Clearing releases both slots for resubmission
        res.clear_payloads();
        assert!(!res.both_payloads_received());
        let corrected = TransferPayload::new(vec![Scalar::from(3u8)]);
        assert!(res.record_payload(SettlementRole::Buyer, corrected));
    }
}
