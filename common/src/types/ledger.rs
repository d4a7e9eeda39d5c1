//! Types mirrored from the ledger: order statuses, event log entries, and
//! transaction receipts

use std::fmt::{self, Display};

use circuit_types::{Amount, Scalar, deposit::Nullifier};
use serde::{Deserialize, Serialize};

/// The status of an order as the ledger tracks it
///
/// The numeric discriminants are the values recorded on the ledger
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The commitment is not registered with the ledger
    #[default]
    Inactive = 0,
    /// The commitment is registered and eligible for matching
    Active = 1,
    /// The commitment is bound into a recorded match
    Matched = 2,
    /// The match containing the commitment has settled
    Settled = 3,
    /// The commitment was cancelled by its submitter
    Cancelled = 4,
}

impl OrderStatus {
    /// The ledger's numeric encoding of the status
    pub fn to_u8(&self) -> u8 {
        *self as u8
    }

    /// Decode a status from the ledger's numeric encoding
    pub fn from_u8(val: u8) -> Result<Self, String> {
        match val {
            0 => Ok(OrderStatus::Inactive),
            1 => Ok(OrderStatus::Active),
            2 => Ok(OrderStatus::Matched),
            3 => Ok(OrderStatus::Settled),
            4 => Ok(OrderStatus::Cancelled),
            _ => Err(format!("invalid order status: {val}")),
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Inactive => write!(f, "inactive"),
            OrderStatus::Active => write!(f, "active"),
            OrderStatus::Matched => write!(f, "matched"),
            OrderStatus::Settled => write!(f, "settled"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A receipt returned by the ledger for an accepted transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxReceipt {
    /// The hash of the accepted transaction
    pub tx_hash: String,
    /// The block number the transaction was sequenced into
    pub block_number: u64,
}

/// An event appended to the ledger's sequenced log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// An order commitment was registered as active
    OrderSubmitted {
        /// The registered commitment
        commitment: Scalar,
    },
    /// An order commitment was cancelled by its submitter
    OrderCancelled {
        /// The cancelled commitment
        commitment: Scalar,
    },
    /// A match between two active commitments was recorded
    MatchSubmitted {
        /// The identifier the ledger assigned to the match
        ledger_match_id: u64,
        /// The buy side commitment
        buy_commitment: Scalar,
        /// The sell side commitment
        sell_commitment: Scalar,
        /// The commitment to the settlement terms
        settlement_commitment: Scalar,
    },
    /// A recorded match settled its bilateral transfers
    SettlementExecuted {
        /// The identifier the ledger assigned to the match
        ledger_match_id: u64,
    },
    /// A deposit leaf was appended to the accumulator
    DepositInserted {
        /// The appended leaf
        leaf: Scalar,
        /// The index the leaf was appended at
        index: u64,
        /// The accumulator root after insertion
        new_root: Scalar,
    },
    /// A deposit was claimed, spending its nullifier
    ClaimExecuted {
        /// The nullifier spent by the claim
        nullifier: Nullifier,
        /// The claimed denomination
        denomination: Amount,
    },
}

/// A ledger event paired with its position in the sequenced log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// The index of the event in the log
    pub index: u64,
    /// The block number the event was sequenced into
    pub block_number: u64,
    /// The event itself
    pub event: LedgerEvent,
}
