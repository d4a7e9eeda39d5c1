//! Implementation of the protocol's Poseidon hash
//!
//! Every commitment, accumulator node, and nullifier in the system is a
//! Poseidon sponge output over the scalar field. Parameters are generated
//! deterministically with the grain LFSR at first use and cached for the
//! process lifetime

use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::PrimeField;
use constants::{
    POSEIDON_ALPHA, POSEIDON_CAPACITY, POSEIDON_FULL_ROUNDS, POSEIDON_PARTIAL_ROUNDS,
    POSEIDON_RATE, ScalarField,
};
use lazy_static::lazy_static;

use crate::scalar::Scalar;

lazy_static! {
    /// The cached Poseidon parameterization
    static ref POSEIDON_CONFIG: PoseidonConfig<ScalarField> = default_poseidon_params();
}

/// Build the sponge parameterization used throughout the protocol
///
/// We use the Poseidon permutation with \alpha = 5, i.e. the s-box is
/// x^5 mod p; for the BN254 scalar field gcd(5, p - 1) = 1, making the s-box
/// invertible. Round numbers follow the conservative t = 3 instantiation
pub fn default_poseidon_params() -> PoseidonConfig<ScalarField> {
    let (ark, mds) = find_poseidon_ark_and_mds::<ScalarField>(
        ScalarField::MODULUS_BIT_SIZE as u64,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0, // skip_matrices
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
}

/// Compute the Poseidon sponge hash of the given input sequence
///
/// Arkworks sponges don't support resets, so each call pays a fresh sponge
/// initialization against the cached parameters
pub fn compute_poseidon_hash(vals: &[Scalar]) -> Scalar {
    let mut sponge = PoseidonSponge::new(&*POSEIDON_CONFIG);
    for val in vals.iter() {
        sponge.absorb(&val.inner());
    }

    Scalar::new(sponge.squeeze_field_elements(1 /* num_elements */)[0])
}
