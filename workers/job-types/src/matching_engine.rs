//! Job types consumed by the matching engine worker

use circuit_types::Scalar;
use common::types::{TraderId, order::RevealedOrder};
use state::{BookOrder, CancelRejection, OrderRejection};
use tokio::sync::mpsc::{
    UnboundedReceiver as TokioReceiver, UnboundedSender as TokioSender,
    unbounded_channel as tokio_unbounded_channel,
};

use crate::{ResponseReceiver, ResponseSender, new_response_channel};

/// The queue sender type for the matching engine
pub type MatchingEngineQueue = TokioSender<MatchingEngineJob>;
/// The queue receiver type for the matching engine
pub type MatchingEngineReceiver = TokioReceiver<MatchingEngineJob>;

/// The response to a place order job; the admitted order's public view
///
/// An internal failure while registering the reveal drops the channel
/// instead of responding, so receivers must treat a closed channel as an
/// internal error
pub type PlaceOrderResponse = Result<BookOrder, OrderRejection>;
/// The response to a cancel order job; the cancellation timestamp
pub type CancelOrderResponse = Result<u64, CancelRejection>;

/// Create a new matching engine queue and receiver
pub fn new_matching_engine_queue() -> (MatchingEngineQueue, MatchingEngineReceiver) {
    tokio_unbounded_channel()
}

/// Create a place order job and the receiver for its response
pub fn new_place_order_job(
    order: RevealedOrder,
) -> (MatchingEngineJob, ResponseReceiver<PlaceOrderResponse>) {
    let (response, recv) = new_response_channel();
    (MatchingEngineJob::PlaceOrder { order, response }, recv)
}

/// Create a cancel order job and the receiver for its response
pub fn new_cancel_order_job(
    commitment: Scalar,
    trader_id: TraderId,
) -> (MatchingEngineJob, ResponseReceiver<CancelOrderResponse>) {
    let (response, recv) = new_response_channel();
    (MatchingEngineJob::CancelOrder { commitment, trader_id, response }, recv)
}

/// The job type for the matching engine
#[derive(Debug)]
pub enum MatchingEngineJob {
    /// Reveal an order to the matcher; registers the commitment on the
    /// ledger and admits the order to the book
    PlaceOrder {
        /// The revealed order
        order: RevealedOrder,
        /// The channel on which to respond
        response: ResponseSender<PlaceOrderResponse>,
    },
    /// Cancel a resting order on behalf of its owner
    CancelOrder {
        /// The commitment of the order to cancel
        commitment: Scalar,
        /// The trader id the cancellation must be authorized by
        trader_id: TraderId,
        /// The channel on which to respond
        response: ResponseSender<CancelOrderResponse>,
    },
    /// Run one matching cycle over the book; sent by the clock timer
    ExecuteMatchingCycle,
}
