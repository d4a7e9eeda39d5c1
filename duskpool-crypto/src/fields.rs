//! Helpers for manipulating values within the scalar field and translating
//! between field and integer representations

use ark_ff::PrimeField;
use constants::ScalarField;
use num_bigint::BigUint;

use crate::scalar::Scalar;

/// Return the modulus `p` of the scalar field as a `BigUint`
pub fn get_scalar_field_modulus() -> BigUint {
    ScalarField::MODULUS.into()
}

// ---------------------------
// | Conversions From Scalar |
// ---------------------------

/// Convert a scalar to a BigUint
pub fn scalar_to_biguint(a: &Scalar) -> BigUint {
    a.to_biguint()
}

/// Reduces the scalar to a u64, truncating anything above 2^64 - 1
pub fn scalar_to_u64(a: &Scalar) -> u64 {
    let digits = a.to_biguint().to_u64_digits();
    digits.first().copied().unwrap_or(0)
}

/// Reduces the scalar to a u128, truncating anything above 2^128 - 1
pub fn scalar_to_u128(a: &Scalar) -> u128 {
    let digits = a.to_biguint().to_u64_digits();
    let lo = digits.first().copied().unwrap_or(0) as u128;
    let hi = digits.get(1).copied().unwrap_or(0) as u128;
    (hi << 64) | lo
}

// ----------------------------
// | Conversions from Bigints |
// ----------------------------

/// Convert a BigUint to a scalar, reducing mod the field order
pub fn biguint_to_scalar(a: &BigUint) -> Scalar {
    Scalar::from_biguint(a)
}

// ---------
// | Tests |
// ---------
