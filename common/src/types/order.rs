//! Types for orders as the matcher tracks them once their terms have been
//! revealed

use circuit_types::{
    Scalar,
    order::{OrderSide, OrderTerms},
};
use serde::{Deserialize, Serialize};
use util::get_current_time_millis;

use super::TraderId;

/// An order whose private terms have been revealed to the matcher
///
/// The revealed terms never leave the node; only the commitment and the
/// non-sensitive envelope fields below are exposed through the external API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevealedOrder {
    /// The private terms of the order
    pub terms: OrderTerms,
    /// The trader's commitment to the terms
    pub commitment: Scalar,
    /// The trader-supplied identifier of the order's owner
    pub trader_id: TraderId,
    /// The public key of the order's owner
    pub owner_key: Scalar,
    /// The unix timestamp in milliseconds at which the matcher received the
    /// order
    pub received_at: u64,
}

impl RevealedOrder {
    /// Create a new revealed order stamped with the current time
    pub fn new(
        terms: OrderTerms,
        commitment: Scalar,
        trader_id: TraderId,
        owner_key: Scalar,
    ) -> Self {
        Self { terms, commitment, trader_id, owner_key, received_at: get_current_time_millis() }
    }

    /// Whether re-hashing the revealed terms reproduces the claimed commitment
    pub fn verify_commitment(&self) -> bool {
        self.terms.verify_commitment(self.commitment)
    }

    /// The side of the order
    pub fn side(&self) -> OrderSide {
        self.terms.side
    }

    /// The non-sensitive view of the order exposed in book listings
    ///
    /// The price, amount, and nonce stay hidden through this path
    pub fn metadata(&self) -> OrderMetadata {
        OrderMetadata {
            commitment: self.commitment,
            side: self.terms.side,
            trader_id: self.trader_id.clone(),
            received_at: self.received_at,
        }
    }
}

/// The non-sensitive fields of a revealed order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderMetadata {
    /// The commitment identifying the order
    pub commitment: Scalar,
    /// The side of the order
    pub side: OrderSide,
    /// The trader-supplied identifier of the order's owner
    pub trader_id: TraderId,
    /// The unix timestamp in milliseconds at which the matcher received the
    /// order
    pub received_at: u64,
}
