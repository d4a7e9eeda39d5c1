//! A wrapper type for elements of the system's scalar field
//!
//! The wrapper fixes the field the protocol operates over and carries the
//! serialization, ordering, and conversion behavior the rest of the node
//! relies on. Ordering is the canonical integer ordering of the reduced
//! representative; this is what makes commitment based tie-breaks
//! deterministic across implementations

use std::{
    fmt::{self, Display, Formatter},
    iter::Sum,
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use ark_ff::{Field, PrimeField, UniformRand};
use constants::ScalarField;
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as DeError};
use util::hex::{biguint_from_hex_string, biguint_to_hex_string};

/// An element of the system's scalar field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scalar(ScalarField);

impl Scalar {
    /// Construct a scalar from the underlying field element
    pub fn new(inner: ScalarField) -> Self {
        Self(inner)
    }

    /// The additive identity of the field
    pub fn zero() -> Self {
        Self(ScalarField::ZERO)
    }

    /// The multiplicative identity of the field
    pub fn one() -> Self {
        Self(ScalarField::ONE)
    }

    /// Whether the scalar is the additive identity
    pub fn is_zero(&self) -> bool {
        self.0 == ScalarField::ZERO
    }

    /// Get the underlying field element
    pub fn inner(&self) -> ScalarField {
        self.0
    }

    /// Sample a uniformly random scalar
    pub fn random<R: rand::RngCore + ?Sized>(rng: &mut R) -> Self {
        Self(ScalarField::rand(rng))
    }

    /// Convert the scalar to its canonical big-integer representative
    pub fn to_biguint(&self) -> BigUint {
        self.0.into_bigint().into()
    }

    /// Build a scalar from a big integer, reducing mod the field order
    pub fn from_biguint(val: &BigUint) -> Self {
        Self(ScalarField::from(val.clone()))
    }

    /// The canonical big-endian byte encoding of the scalar
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.to_biguint().to_bytes_be()
    }

    /// Build a scalar from big-endian bytes, reducing mod the field order
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(ScalarField::from_be_bytes_mod_order(bytes))
    }

    /// The scalar as a lowercase hex string with a `0x` prefix
    pub fn to_hex_string(&self) -> String {
        biguint_to_hex_string(&self.to_biguint())
    }

    /// Parse a scalar from a hex string, with or without a `0x` prefix
    pub fn from_hex_string(hex: &str) -> Result<Self, String> {
        let biguint = biguint_from_hex_string(hex)?;
        Ok(Self::from_biguint(&biguint))
    }
}

// --------------
// | Arithmetic |
// --------------

impl Add for Scalar {
    type Output = Scalar;

    fn add(self, rhs: Scalar) -> Self::Output {
        Scalar(self.0 + rhs.0)
    }
}

impl AddAssign for Scalar {
    fn add_assign(&mut self, rhs: Scalar) {
        self.0 += rhs.0;
    }
}

impl Sub for Scalar {
    type Output = Scalar;

    fn sub(self, rhs: Scalar) -> Self::Output {
        Scalar(self.0 - rhs.0)
    }
}

impl SubAssign for Scalar {
    fn sub_assign(&mut self, rhs: Scalar) {
        self.0 -= rhs.0;
    }
}

impl Mul for Scalar {
    type Output = Scalar;

    fn mul(self, rhs: Scalar) -> Self::Output {
        Scalar(self.0 * rhs.0)
    }
}

impl MulAssign for Scalar {
    fn mul_assign(&mut self, rhs: Scalar) {
        self.0 *= rhs.0;
    }
}

impl Neg for Scalar {
    type Output = Scalar;

    fn neg(self) -> Self::Output {
        Scalar(-self.0)
    }
}

impl Sum for Scalar {
    fn sum<I: Iterator<Item = Scalar>>(iter: I) -> Self {
        iter.fold(Scalar::zero(), |acc, x| acc + x)
    }
}

// ---------------
// | Conversions |
// ---------------

/// Implement `From<$ty> for Scalar` by way of the underlying field element
macro_rules! impl_scalar_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(val: $ty) -> Self {
                    Self(ScalarField::from(val))
                }
            }
        )*
    };
}
impl_scalar_from!(bool, u8, u16, u32, u64, u128);

impl From<ScalarField> for Scalar {
    fn from(inner: ScalarField) -> Self {
        Self(inner)
    }
}

impl From<Scalar> for ScalarField {
    fn from(val: Scalar) -> Self {
        val.0
    }
}

// -----------------
// | Serialization |
// -----------------

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Scalar::from_hex_string(&hex).map_err(D::Error::custom)
    }
}
