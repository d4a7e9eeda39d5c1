//! The deposit claim circuit: a hidden leaf sits under the accumulator root
//! and its nullifier derives from the claimant's secret
//!
//! Public signals: `[root, denomination, nullifier]`

use constants::ALLOWED_DENOMINATIONS;
use duskpool_crypto::Scalar;
use serde::{Deserialize, Serialize};

use crate::{
    Amount,
    deposit::{Nullifier, compute_claim_nullifier, compute_deposit_leaf, compute_deposit_salt},
    errors::{SignalsError, StatementError},
    merkle::{MerkleOpening, MerkleRoot},
};

/// The number of public signals the circuit publishes
pub const DEPOSIT_CLAIM_NUM_SIGNALS: usize = 3;

/// The public statement of the deposit claim circuit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositClaimStatement {
    /// The accumulator root the membership proof is stated against
    pub root: MerkleRoot,
    /// The denomination being claimed
    pub denomination: Amount,
    /// The nullifier spent by this claim
    pub nullifier: Nullifier,
}

/// The private witness of the deposit claim circuit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositClaimWitness {
    /// The claimant's public key scalar
    pub owner_key: Scalar,
    /// The random secret the deposit was built with
    pub secret: Scalar,
    /// The address the deposit entered through
    pub deposit_address: Scalar,
    /// The deposit's timestamp
    pub timestamp: u64,
    /// The sibling path from the leaf to the root
    pub opening: MerkleOpening,
}

impl DepositClaimStatement {
    /// Natively evaluate the circuit's constraints over a witness
    pub fn evaluate(&self, witness: &DepositClaimWitness) -> Result<(), StatementError> {
        if !ALLOWED_DENOMINATIONS.contains(&self.denomination) {
            return Err(StatementError::InvalidDenomination);
        }

        if compute_claim_nullifier(witness.owner_key, witness.secret) != self.nullifier {
            return Err(StatementError::NullifierMismatch);
        }

        let salt = compute_deposit_salt(witness.owner_key, witness.secret);
        let leaf = compute_deposit_leaf(
            salt,
            witness.deposit_address,
            self.denomination,
            witness.timestamp,
        );
        if witness.opening.compute_root(leaf) != self.root {
            return Err(StatementError::RootMismatch);
        }

        Ok(())
    }

    /// Encode the statement as the circuit's public signal vector
    pub fn to_public_signals(&self) -> Vec<Scalar> {
        vec![self.root, Scalar::from(self.denomination), self.nullifier]
    }

    /// Decode a statement from a public signal vector
    pub fn from_public_signals(signals: &[Scalar]) -> Result<Self, SignalsError> {
        if signals.len() != DEPOSIT_CLAIM_NUM_SIGNALS {
            return Err(SignalsError::Length {
                expected: DEPOSIT_CLAIM_NUM_SIGNALS,
                actual: signals.len(),
            });
        }

        let denomination_biguint = signals[1].to_biguint();
        let denomination = Amount::try_from(&denomination_biguint)
            .map_err(|_| SignalsError::OutOfRange(format!("denomination {denomination_biguint}")))?;

        Ok(Self { root: signals[0], denomination, nullifier: signals[2] })
    }
}

#[cfg(test)]
mod test {
    use constants::{ALLOWED_DENOMINATIONS, MERKLE_HEIGHT};
    use duskpool_crypto::Scalar;
    use rand::thread_rng;

    use crate::{
        deposit::{compute_claim_nullifier, compute_deposit_leaf, compute_deposit_salt},
        errors::StatementError,
        merkle::MerkleOpening,
    };

    use super::{DepositClaimStatement, DepositClaimWitness};

    /// Build a single-leaf claim whose opening is an all-random path
    fn random_claim() -> (DepositClaimStatement, DepositClaimWitness) {
        let mut rng = thread_rng();
        let owner_key = Scalar::random(&mut rng);
        let secret = Scalar::random(&mut rng);
        let deposit_address = Scalar::random(&mut rng);
        let timestamp = 1_700_000_000;
        let denomination = ALLOWED_DENOMINATIONS[1];

        let salt = compute_deposit_salt(owner_key, secret);
        let leaf = compute_deposit_leaf(salt, deposit_address, denomination, timestamp);

        let opening = MerkleOpening {
            elems: core::array::from_fn::<_, MERKLE_HEIGHT, _>(|_| Scalar::random(&mut rng)),
            leaf_index: 5,
        };
        let root = opening.compute_root(leaf);

        let statement = DepositClaimStatement {
            root,
            denomination,
            nullifier: compute_claim_nullifier(owner_key, secret),
        };
        let witness =
            DepositClaimWitness { owner_key, secret, deposit_address, timestamp, opening };

        (statement, witness)
    }

    /// Tests that a consistent claim satisfies the statement
    #[test]
    fn test_valid_claim() {
        let (statement, witness) = random_claim();
        assert!(statement.evaluate(&witness).is_ok());
    }

    /// Tests that an off-list denomination is rejected
    #[test]
    fn test_invalid_denomination_rejected() {
        let (mut statement, witness) = random_claim();
        statement.denomination += 1;

        assert_eq!(statement.evaluate(&witness), Err(StatementError::InvalidDenomination));
    }

    /// Tests that a wrong secret fails the nullifier derivation
    #[test]
    fn test_wrong_secret_rejected() {
        let mut rng = thread_rng();
        let (statement, mut witness) = random_claim();
        witness.secret = Scalar::random(&mut rng);

        assert_eq!(statement.evaluate(&witness), Err(StatementError::NullifierMismatch));
    }

    /// Tests that a stale root fails the membership fold
    #[test]
    fn test_wrong_root_rejected() {
        let mut rng = thread_rng();
        let (mut statement, witness) = random_claim();
        statement.root = Scalar::random(&mut rng);

        assert_eq!(statement.evaluate(&witness), Err(StatementError::RootMismatch));
    }
}
