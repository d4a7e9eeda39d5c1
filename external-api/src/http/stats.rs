//! Groups API types for pool statistics queries

use circuit_types::Scalar;
use serde::{Deserialize, Serialize};

// ---------------
// | HTTP Routes |
// ---------------

/// Fetch aggregate pool statistics
pub const GET_STATS_ROUTE: &str = "/v0/stats";

// -------------
// | API Types |
// -------------

/// The response type for aggregate pool statistics
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GetStatsResponse {
    /// The number of orders currently active in the book
    pub active_orders: u64,
    /// The number of active orders on the buy side
    pub active_buys: u64,
    /// The number of active orders on the sell side
    pub active_sells: u64,
    /// The number of orders revealed since the node started
    pub orders_revealed: u64,
    /// The number of orders cancelled since the node started
    pub orders_cancelled: u64,
    /// The number of orders dropped by the odd-price-sum policy
    pub orders_dropped: u64,
    /// The number of matches found since the node started
    pub matches_found: u64,
    /// The number of matches settled since the node started
    pub matches_settled: u64,
    /// The number of matches failed since the node started
    pub matches_failed: u64,
    /// The current root of the ledger's deposit accumulator
    pub ledger_root: Scalar,
    /// The number of leaves inserted into the deposit accumulator
    pub leaf_count: u64,
}
