//! The base order type and its commitment

use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use duskpool_crypto::{Scalar, hash::compute_poseidon_hash};
use serde::{Deserialize, Serialize};

use crate::{Amount, Price};

/// The side of the market a given order is on
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy side
    #[default]
    Buy = 0,
    /// Sell side
    Sell,
}

impl OrderSide {
    /// The wire encoding of the side; `Buy = 0`, `Sell = 1` on every surface
    pub fn to_u8(&self) -> u8 {
        match self {
            OrderSide::Buy => 0,
            OrderSide::Sell => 1,
        }
    }

    /// Parse a side from its wire encoding
    pub fn from_u8(val: u8) -> Result<Self, String> {
        match val {
            0 => Ok(OrderSide::Buy),
            1 => Ok(OrderSide::Sell),
            _ => Err(format!("invalid order side: {val}")),
        }
    }

    /// The side's encoding as a field element, used in the commitment
    /// preimage
    pub fn to_scalar(&self) -> Scalar {
        Scalar::from(self.to_u8())
    }

    /// Return whether the order is a sell side order
    pub fn is_sell(&self) -> bool {
        matches!(self, OrderSide::Sell)
    }

    /// Return whether the order is a buy side order
    pub fn is_buy(&self) -> bool {
        !self.is_sell()
    }

    /// Return the opposite direction to self
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl Display for OrderSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "Buy"),
            OrderSide::Sell => write!(f, "Sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(format!("invalid order side: {s}")),
        }
    }
}

/// The private terms of an order: everything the commitment hides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerms {
    /// The side this order is for
    pub side: OrderSide,
    /// The limit price of the order
    pub price: Price,
    /// The amount of the asset to buy or sell
    pub amount: Amount,
    /// The blinding nonce folded into the commitment
    pub nonce: Scalar,
}

impl OrderTerms {
    /// Compute the commitment binding these terms
    ///
    /// `commitment = Hash(side, price, amount, nonce)`
    pub fn compute_commitment(&self) -> Scalar {
        compute_poseidon_hash(&[
            self.side.to_scalar(),
            Scalar::from(self.price),
            Scalar::from(self.amount),
            self.nonce,
        ])
    }

    /// Check a commitment against these terms
    ///
    /// Returns false on mismatch; callers reject the order rather than throw
    pub fn verify_commitment(&self, commitment: Scalar) -> bool {
        self.compute_commitment() == commitment
    }

    /// Whether the terms satisfy the positivity invariant
    pub fn is_positive(&self) -> bool {
        self.price > 0 && self.amount > 0
    }
}
