//! The ledger's own order and match records
//!
//! These are the authoritative mirrors of the matcher's off-ledger state;
//! the ledger state machine exclusively owns them

use circuit_types::Scalar;
use common::types::ledger::OrderStatus;

/// An order as the ledger tracks it
///
/// The ledger never learns the order's terms; it holds only the commitment,
/// the key authorized to cancel, and the status
#[derive(Clone, Debug)]
pub struct OrderRecord {
    /// The order's commitment
    pub commitment: Scalar,
    /// The key authorized to cancel the order
    pub owner_key: Scalar,
    /// The order's status
    pub status: OrderStatus,
}

impl OrderRecord {
    /// Create an active record for a freshly submitted commitment
    pub fn new_active(commitment: Scalar, owner_key: Scalar) -> Self {
        Self { commitment, owner_key, status: OrderStatus::Active }
    }
}

/// A recorded match between two commitments
///
/// Immutable apart from the `settled` flag, which guards the
/// exactly-once settlement execution
#[derive(Clone, Debug)]
pub struct MatchRecord {
    /// The sequential identifier the ledger assigned at submission
    pub id: u64,
    /// The buy leg's commitment
    pub buy_commitment: Scalar,
    /// The sell leg's commitment
    pub sell_commitment: Scalar,
    /// The commitment to the settlement terms
    pub settlement_commitment: Scalar,
    /// Whether the bilateral settlement has executed
    pub settled: bool,
}
