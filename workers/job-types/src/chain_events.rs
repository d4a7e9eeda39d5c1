//! Job types consumed by the chain events worker

use tokio::sync::mpsc::{
    UnboundedReceiver as TokioReceiver, UnboundedSender as TokioSender,
    unbounded_channel as tokio_unbounded_channel,
};

/// The queue sender type for the chain events worker
pub type ChainEventsQueue = TokioSender<ChainEventsJob>;
/// The queue receiver type for the chain events worker
pub type ChainEventsReceiver = TokioReceiver<ChainEventsJob>;

/// Create a new chain events queue and receiver
pub fn new_chain_events_queue() -> (ChainEventsQueue, ChainEventsReceiver) {
    tokio_unbounded_channel()
}

/// The job type for the chain events worker
#[derive(Debug)]
pub enum ChainEventsJob {
    /// Poll the ledger's event log from the worker's cursor; sent by the
    /// clock timer
    PollEvents,
}
