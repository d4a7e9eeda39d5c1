//! Defines common types that many crates can depend on

pub mod deposit;
pub mod ledger;
pub mod r#match;
pub mod order;

use tokio::sync::watch::{
    Receiver as WatchReceiver, Sender as WatchSender, channel as watch_channel,
};
use uuid::Uuid;

/// A type alias for an empty channel used to signal cancellation to workers
pub type CancelChannel = WatchReceiver<()>;

/// Create a new cancel channel, returning the sender and receiver ends
pub fn new_cancel_channel() -> (WatchSender<()>, CancelChannel) {
    watch_channel(())
}

/// An identifier for a match record, assigned when the crossing pair is found
pub type MatchIdentifier = Uuid;

/// An identifier for a task run on the task driver
pub type TaskIdentifier = Uuid;

/// An opaque, trader-supplied identifier carried on revealed orders
pub type TraderId = String;
