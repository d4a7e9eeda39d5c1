//! Derivations for deposit leaves, salts, and claim nullifiers

use constants::NULLIFIER_DOMAIN_SEP;
use duskpool_crypto::{Scalar, hash::compute_poseidon_hash};

use crate::Amount;

/// A spent-class tag for claim nullifiers
pub type Nullifier = Scalar;

/// Derive the salt hiding a depositor's identity in the leaf
///
/// `salt = Hash(ownerPubKey, randomSecret)`
pub fn compute_deposit_salt(owner_key: Scalar, secret: Scalar) -> Scalar {
    compute_poseidon_hash(&[owner_key, secret])
}

/// Derive an accumulator leaf from its preimage
///
/// `leaf = Hash(salt, depositAddress, amount, timestamp)`
pub fn compute_deposit_leaf(
    salt: Scalar,
    deposit_address: Scalar,
    amount: Amount,
    timestamp: u64,
) -> Scalar {
    compute_poseidon_hash(&[salt, deposit_address, Scalar::from(amount), Scalar::from(timestamp)])
}

/// Derive the nullifier spent when a deposit is claimed
///
/// `nullifier = Hash(ownerPubKey, randomSecret, domainConst, 0)`; the domain
/// constant keeps the preimage disjoint from the salt derivation over the
/// same key and secret
pub fn compute_claim_nullifier(owner_key: Scalar, secret: Scalar) -> Nullifier {
    compute_poseidon_hash(&[
        owner_key,
        secret,
        Scalar::from(NULLIFIER_DOMAIN_SEP),
        Scalar::zero(),
    ])
}
