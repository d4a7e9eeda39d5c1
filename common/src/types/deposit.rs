//! Types for deposits into the funding accumulator and their later claims

use circuit_types::{
    Amount, Scalar,
    deposit::{Nullifier, compute_claim_nullifier, compute_deposit_leaf, compute_deposit_salt},
};
use constants::ALLOWED_DENOMINATIONS;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use util::get_current_time_seconds;

/// The private witness of a deposit, held by the depositor
///
/// The accumulator only ever sees the derived leaf; the note's fields are
/// revealed to no one and are sufficient to later derive the claim nullifier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositNote {
    /// The public key of the depositor
    pub owner_key: Scalar,
    /// The random secret blinding the deposit
    pub secret: Scalar,
    /// The address the deposit was funded from
    pub deposit_address: Scalar,
    /// The denominated amount of the deposit
    pub amount: Amount,
    /// The unix timestamp in seconds at which the deposit was created
    pub timestamp: u64,
}

impl DepositNote {
    /// Create a note with a freshly sampled blinding secret, stamped with the
    /// current time
    pub fn new<R: RngCore>(
        rng: &mut R,
        owner_key: Scalar,
        deposit_address: Scalar,
        amount: Amount,
    ) -> Self {
        Self {
            owner_key,
            secret: Scalar::random(rng),
            deposit_address,
            amount,
            timestamp: get_current_time_seconds(),
        }
    }

    /// Whether the note's amount is one of the allowed denominations
    pub fn is_allowed_denomination(&self) -> bool {
        ALLOWED_DENOMINATIONS.contains(&self.amount)
    }

    /// The salt hiding the depositor's identity in the leaf
    pub fn salt(&self) -> Scalar {
        compute_deposit_salt(self.owner_key, self.secret)
    }

    /// The accumulator leaf committed to by this note
    pub fn leaf(&self) -> Scalar {
        compute_deposit_leaf(self.salt(), self.deposit_address, self.amount, self.timestamp)
    }

    /// The nullifier spent when this note is claimed
    pub fn nullifier(&self) -> Nullifier {
        compute_claim_nullifier(self.owner_key, self.secret)
    }
}

#[cfg(test)]
mod test {
    use circuit_types::Scalar;
    use constants::ALLOWED_DENOMINATIONS;
    use rand::thread_rng;

    use super::DepositNote;

    /// Tests that note derivations are stable and secret-dependent
    #[test]
    fn test_note_derivations() {
        let mut rng = thread_rng();
        let owner_key = Scalar::random(&mut rng);
        let deposit_address = Scalar::random(&mut rng);
        let note = DepositNote::new(&mut rng, owner_key, deposit_address, ALLOWED_DENOMINATIONS[0]);
        assert!(note.is_allowed_denomination());

        // Derivations are deterministic in the note
        assert_eq!(note.leaf(), note.leaf());
        assert_eq!(note.nullifier(), note.nullifier());

        // A second note for the same owner derives a distinct leaf and
        // nullifier through its fresh secret
        let other = DepositNote::new(
            &mut rng,
            note.owner_key,
            note.deposit_address,
            note.amount,
        );
        assert_ne!(note.leaf(), other.leaf());
        assert_ne!(note.nullifier(), other.nullifier());
    }

    /// Tests the denomination allow list check
    #[test]
    fn test_denomination_check() {
        let mut rng = thread_rng();
        let owner_key = Scalar::random(&mut rng);
        let deposit_address = Scalar::random(&mut rng);
        let mut note =
            DepositNote::new(&mut rng, owner_key, deposit_address, ALLOWED_DENOMINATIONS[1]);
        assert!(note.is_allowed_denomination());

        note.amount += 1;
        assert!(!note.is_allowed_denomination());
    }
}
