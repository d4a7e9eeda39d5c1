//! The match validity circuit: two hidden orders cross and the settlement
//! terms are derived correctly
//!
//! Public signals: `[buyCommitment, sellCommitment, settlementCommitment]`
//!
//! This is the arithmetic the matching engine must agree on with the ledger
//! verifier; both call into this module rather than re-deriving the checks

use duskpool_crypto::Scalar;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{SignalsError, StatementError},
    order::OrderTerms,
    settlement::SettlementTerms,
};

/// The number of public signals the circuit publishes
pub const MATCH_VALIDITY_NUM_SIGNALS: usize = 3;

/// The public statement of the match validity circuit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchValidityStatement {
    /// The commitment of the buy leg
    pub buy_commitment: Scalar,
    /// The commitment of the sell leg
    pub sell_commitment: Scalar,
    /// The commitment of the derived settlement terms
    pub settlement_commitment: Scalar,
}

/// The private witness of the match validity circuit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchValidityWitness {
    /// The buy leg's terms
    pub buy: OrderTerms,
    /// The sell leg's terms
    pub sell: OrderTerms,
    /// The settlement terms the match proposes
    pub settlement: SettlementTerms,
}

impl MatchValidityStatement {
    /// Natively evaluate the circuit's constraints over a witness
    ///
    /// Checks, in order: leg positivity, both leg commitments, the crossing
    /// and midpoint arithmetic, and the settlement commitment. The error
    /// distinguishes each failure class so pre-validation can report a
    /// structured rejection
    pub fn evaluate(&self, witness: &MatchValidityWitness) -> Result<(), StatementError> {
        if !witness.buy.is_positive() || !witness.sell.is_positive() {
            return Err(StatementError::NonPositiveTerms);
        }

        if !witness.buy.verify_commitment(self.buy_commitment)
            || !witness.sell.verify_commitment(self.sell_commitment)
        {
            return Err(StatementError::CommitmentMismatch);
        }

        let derived = SettlementTerms::derive(&witness.buy, &witness.sell)?;
        if derived.amount != witness.settlement.amount {
            return Err(StatementError::AmountMismatch);
        }
        if derived.price != witness.settlement.price {
            return Err(StatementError::PriceMismatch);
        }

        if witness.settlement.compute_commitment() != self.settlement_commitment {
            return Err(StatementError::CommitmentMismatch);
        }

        Ok(())
    }

    /// Encode the statement as the circuit's public signal vector
    pub fn to_public_signals(&self) -> Vec<Scalar> {
        vec![self.buy_commitment, self.sell_commitment, self.settlement_commitment]
    }

    /// Decode a statement from a public signal vector
    pub fn from_public_signals(signals: &[Scalar]) -> Result<Self, SignalsError> {
        if signals.len() != MATCH_VALIDITY_NUM_SIGNALS {
            return Err(SignalsError::Length {
                expected: MATCH_VALIDITY_NUM_SIGNALS,
                actual: signals.len(),
            });
        }

        Ok(Self {
            buy_commitment: signals[0],
            sell_commitment: signals[1],
            settlement_commitment: signals[2],
        })
    }
}
