//! Wire representations of orders and matches for the external API
//!
//! Prices and amounts cross the wire as decimal strings; `u128` values
//! overflow the integer range many JSON clients can represent

use circuit_types::{Amount, Scalar, order::OrderSide};
use common::types::{
    MatchIdentifier, TraderId,
    r#match::{MatchResult, MatchStatus},
    order::OrderMetadata,
};
use serde::{Deserialize, Serialize};

/// Parse a decimal string into an amount or price
pub fn parse_decimal(value: &str) -> Result<Amount, String> {
    value.parse::<Amount>().map_err(|_| format!("invalid decimal string: {value}"))
}

// ----------------
// | Order Types  |
// ----------------

/// The non-sensitive view of a revealed order returned in book listings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiOrderMetadata {
    /// The commitment identifying the order
    pub commitment: Scalar,
    /// The side of the order
    pub direction: OrderSide,
    /// The trader-supplied identifier of the order's owner
    pub trader_id: TraderId,
    /// The unix timestamp in milliseconds at which the matcher received the
    /// order
    pub received_at: u64,
}

impl From<OrderMetadata> for ApiOrderMetadata {
    fn from(meta: OrderMetadata) -> Self {
        ApiOrderMetadata {
            commitment: meta.commitment,
            direction: meta.side,
            trader_id: meta.trader_id,
            received_at: meta.received_at,
        }
    }
}

/// The wire form of an order reveal: the commitment and the full preimage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiRevealedOrder {
    /// The side of the order
    pub direction: OrderSide,
    /// The limit price, as a decimal string
    pub price: String,
    /// The amount, as a decimal string
    pub amount: String,
    /// The blinding nonce folded into the commitment
    pub nonce: Scalar,
    /// The commitment to the order's terms
    pub commitment: Scalar,
    /// The trader-supplied identifier of the order's owner
    pub trader_id: TraderId,
    /// The public key of the order's owner
    pub owner_pub_key: Scalar,
}

// ----------------
// | Match Types  |
// ----------------

/// The public view of a match record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiMatch {
    /// The identifier of the match
    pub id: MatchIdentifier,
    /// The commitment of the buy side order
    pub buy_commitment: Scalar,
    /// The commitment of the sell side order
    pub sell_commitment: Scalar,
    /// The commitment to the settlement terms
    pub settlement_commitment: Scalar,
    /// The settled amount, as a decimal string
    pub amount: String,
    /// The settlement price, as a decimal string
    pub price: String,
    /// The status of the match in the settlement pipeline
    pub status: MatchStatus,
    /// The hash of the match submission transaction, if one has been accepted
    pub tx_hash: Option<String>,
    /// The unix timestamp in milliseconds at which the match was found
    pub created_at: u64,
}

impl From<&MatchResult> for ApiMatch {
    fn from(res: &MatchResult) -> Self {
        ApiMatch {
            id: res.id,
            buy_commitment: res.buy_commitment,
            sell_commitment: res.sell_commitment,
            settlement_commitment: res.settlement_commitment,
            amount: res.settlement.amount.to_string(),
            price: res.settlement.price.to_string(),
            status: res.status.clone(),
            tx_hash: res.tx_hash.clone(),
            created_at: res.created_at,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ApiRevealedOrder, parse_decimal};

    /// Tests decimal string parsing at the integer boundaries
    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("0").unwrap(), 0);
        assert_eq!(parse_decimal("340282366920938463463374607431768211455").unwrap(), u128::MAX);

        assert!(parse_decimal("").is_err());
        assert!(parse_decimal("-1").is_err());
        assert!(parse_decimal("1.5").is_err());
        assert!(parse_decimal("340282366920938463463374607431768211456").is_err());
    }

    /// Tests the wire shape of an order reveal: lowercase directions, decimal
    /// string amounts, and hex string scalars
    #[test]
    fn test_revealed_order_wire_shape() {
        let json = r#"{
            "direction": "sell",
            "price": "1000",
            "amount": "5",
            "nonce": "0x1",
            "commitment": "0x2a",
            "trader_id": "trader-1",
            "owner_pub_key": "0x3"
        }"#;

        let order: ApiRevealedOrder = serde_json::from_str(json).unwrap();
        assert!(order.direction.is_sell());
        assert_eq!(parse_decimal(&order.price).unwrap(), 1000);
        assert_eq!(parse_decimal(&order.amount).unwrap(), 5);
        assert_eq!(order.commitment.to_biguint(), 42u8.into());
    }
}
