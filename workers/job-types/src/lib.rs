//! Groups worker job types to expose them as a third party crate to the
//! workers

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod chain_events;
pub mod match_orchestrator;
pub mod matching_engine;
pub mod proof_manager;

use tokio::sync::oneshot::{
    Receiver as OneshotReceiver, Sender as OneshotSender, channel as oneshot_channel,
};

/// A response channel sender
pub type ResponseSender<T> = OneshotSender<T>;
/// A response channel receiver
pub type ResponseReceiver<T> = OneshotReceiver<T>;

/// Create a new response channel for a request
pub fn new_response_channel<T>() -> (ResponseSender<T>, ResponseReceiver<T>) {
    oneshot_channel()
}
