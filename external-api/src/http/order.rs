//! Groups API types for order reveal, cancellation, and book queries

use circuit_types::Scalar;
use common::types::TraderId;
use serde::{Deserialize, Serialize};

use crate::types::{ApiOrderMetadata, ApiRevealedOrder};

// ---------------
// | HTTP Routes |
// ---------------

/// Reveal an order's terms to the matcher, entering it into the book
pub const REVEAL_ORDER_ROUTE: &str = "/v0/order";
/// Cancel a revealed order by its commitment
pub const CANCEL_ORDER_ROUTE: &str = "/v0/order/:commitment/cancel";
/// List the non-sensitive metadata of all active orders
pub const GET_ORDER_BOOK_ROUTE: &str = "/v0/book";

// -------------
// | API Types |
// -------------

/// The request type to reveal an order to the matcher
pub type RevealOrderRequest = ApiRevealedOrder;

/// The response type after an order reveal is accepted
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevealOrderResponse {
    /// The commitment of the accepted order
    pub commitment: Scalar,
    /// The unix timestamp in milliseconds at which the matcher received the
    /// order
    pub received_at: u64,
}

/// The request type to cancel a revealed order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    /// The trader identifier the order was revealed under; only the original
    /// submitter may cancel
    pub trader_id: TraderId,
}

/// The response type after an order cancellation is accepted
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelOrderResponse {
    /// The commitment of the cancelled order
    pub commitment: Scalar,
    /// The timestamp of the cancellation
    pub cancelled_at: u64,
}

/// The response type to fetch the active order book
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetOrderBookResponse {
    /// The non-sensitive metadata of every active order
    pub orders: Vec<ApiOrderMetadata>,
}
