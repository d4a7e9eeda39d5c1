//! The order validity circuit: a revealed commitment is well-formed
//!
//! Public signals: `[commitment]`

use duskpool_crypto::Scalar;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{SignalsError, StatementError},
    order::OrderTerms,
};

/// The number of public signals the circuit publishes
pub const ORDER_VALIDITY_NUM_SIGNALS: usize = 1;

/// The public statement of the order validity circuit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderValidityStatement {
    /// The commitment the order terms must hash to
    pub commitment: Scalar,
}

/// The private witness of the order validity circuit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderValidityWitness {
    /// The revealed order terms
    pub terms: OrderTerms,
}

impl OrderValidityStatement {
    /// Natively evaluate the circuit's constraints over a witness
    pub fn evaluate(&self, witness: &OrderValidityWitness) -> Result<(), StatementError> {
        if !witness.terms.is_positive() {
            return Err(StatementError::NonPositiveTerms);
        }

        if !witness.terms.verify_commitment(self.commitment) {
            return Err(StatementError::CommitmentMismatch);
        }

        Ok(())
    }

    /// Encode the statement as the circuit's public signal vector
    pub fn to_public_signals(&self) -> Vec<Scalar> {
        vec![self.commitment]
    }

    /// Decode a statement from a public signal vector
    pub fn from_public_signals(signals: &[Scalar]) -> Result<Self, SignalsError> {
        if signals.len() != ORDER_VALIDITY_NUM_SIGNALS {
            return Err(SignalsError::Length {
                expected: ORDER_VALIDITY_NUM_SIGNALS,
                actual: signals.len(),
            });
        }

        Ok(Self { commitment: signals[0] })
    }
}

#[cfg(test)]
mod test {
    use duskpool_crypto::Scalar;
    use rand::thread_rng;

    use crate::order::{OrderSide, OrderTerms};

    use super::{OrderValidityStatement, OrderValidityWitness};

    /// Tests that a well-formed order satisfies the statement
    #[test]
    fn test_valid_order() {
        let mut rng = thread_rng();
        let terms = OrderTerms {
            side: OrderSide::Buy,
            price: 1000,
            amount: 500,
            nonce: Scalar::random(&mut rng),
        };
        let statement = OrderValidityStatement { commitment: terms.compute_commitment() };

        assert!(statement.evaluate(&OrderValidityWitness { terms }).is_ok());
    }

    /// Tests that a zero amount fails the positivity constraint
    #[test]
    fn test_zero_amount_rejected() {
        let mut rng = thread_rng();
        let terms = OrderTerms {
            side: OrderSide::Sell,
            price: 1000,
            amount: 0,
            nonce: Scalar::random(&mut rng),
        };
        let statement = OrderValidityStatement { commitment: terms.compute_commitment() };

        assert!(statement.evaluate(&OrderValidityWitness { terms }).is_err());
    }

    /// Tests that signals round trip through encode/decode
    #[test]
    fn test_signals_round_trip() {
        let mut rng = thread_rng();
        let statement = OrderValidityStatement { commitment: Scalar::random(&mut rng) };

        let signals = statement.to_public_signals();
        let decoded = OrderValidityStatement::from_public_signals(&signals).unwrap();
        assert_eq!(decoded, statement);

        assert!(OrderValidityStatement::from_public_signals(&[]).is_err());
    }
}
