//! Node-local state primitives: the resting order book, the private vault of
//! revealed terms, and the shared index of match records
//!
//! The order book and vault are owned by the matching engine; mutations flow
//! through its job queue so a matching cycle sees a stable book. The match
//! index is a clone-able handle shared with the orchestrator and the API
//! server; the index republishes every record mutation on the system bus so
//! subscribers track lifecycles without polling

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod match_index;
pub mod orderbook;
pub mod vault;

pub use match_index::{MatchIndex, MatchIndexError, MatchStats};
pub use orderbook::{
    BookOrder, BookStats, CancelRejection, OrderBook, OrderRejection, SharedOrderBook,
};
pub use vault::OrderVault;
