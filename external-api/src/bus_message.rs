//! Defines types broadcast onto the system bus

use circuit_types::Scalar;
use common::types::{
    MatchIdentifier, TaskIdentifier,
    ledger::SequencedEvent,
    r#match::MatchStatus,
    order::OrderMetadata,
};
use serde::Serialize;

// ----------------------------
// | System Bus Message Types |
// ----------------------------

/// The system bus topic published to when an order enters or leaves the book
pub const ORDER_STATE_CHANGE_TOPIC: &str = "order-state-changes";
/// The system bus topic published to for every match lifecycle event
pub const MATCH_LIFECYCLE_TOPIC: &str = "match-lifecycle";
/// The system bus topic published to when the chain poller observes a new
/// ledger event
pub const LEDGER_EVENT_TOPIC: &str = "ledger-events";

/// Get the topic name for a given match
pub fn match_status_topic(match_id: &MatchIdentifier) -> String {
    format!("match-status-{match_id}")
}

/// Get the topic name for a given task
pub fn task_topic(task_id: &TaskIdentifier) -> String {
    format!("task-updates-{task_id}")
}

/// A message type for generic system bus messages, broadcast to all modules
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum SystemBusMessage {
    // -- Orders -- //
    /// An order was revealed to the matcher and entered the book
    OrderRevealed {
        /// The non-sensitive view of the order
        metadata: OrderMetadata,
    },
    /// An order was cancelled and left the book
    OrderCancelled {
        /// The commitment of the cancelled order
        commitment: Scalar,
        /// The timestamp of the event
        timestamp: u64,
    },
    /// An order was dropped by the odd-price-sum policy
    OrderDropped {
        /// The commitment of the dropped order
        commitment: Scalar,
        /// The commitment of the counterparty order left in the book
        surviving_commitment: Scalar,
        /// The timestamp of the event
        timestamp: u64,
    },

    // -- Matches -- //
    /// A crossing pair was found and a match record created
    MatchFound {
        /// The identifier of the match
        match_id: MatchIdentifier,
        /// The commitment of the buy side order
        buy_commitment: Scalar,
        /// The commitment of the sell side order
        sell_commitment: Scalar,
        /// The timestamp of the event
        timestamp: u64,
    },
    /// A match advanced in the settlement pipeline
    MatchStatusUpdated {
        /// The identifier of the match
        match_id: MatchIdentifier,
        /// The status the match moved to
        status: MatchStatus,
        /// The timestamp of the event
        timestamp: u64,
    },
    /// A match submission was accepted and observed on the ledger
    MatchConfirmed {
        /// The identifier of the match
        match_id: MatchIdentifier,
        /// The hash of the accepted transaction
        tx_hash: String,
        /// The timestamp of the event
        timestamp: u64,
    },
    /// A match settled its bilateral transfers
    MatchSettled {
        /// The identifier of the match
        match_id: MatchIdentifier,
        /// The timestamp of the event
        timestamp: u64,
    },
    /// A match failed in proving or submission
    MatchFailed {
        /// The identifier of the match
        match_id: MatchIdentifier,
        /// The error surfaced by the prover or the ledger
        reason: String,
        /// The timestamp of the event
        timestamp: u64,
    },

    // -- Ledger -- //
    /// The chain poller observed a new event in the ledger's log
    LedgerEvent {
        /// The observed event with its log position
        event: SequencedEvent,
    },

    // -- Tasks -- //
    /// A task driver status update
    TaskStatusUpdate {
        /// The identifier of the task
        task_id: TaskIdentifier,
        /// The state the task moved to
        state: String,
        /// The timestamp of the event
        timestamp: u64,
    },
}
