//! Job types consumed by the match orchestrator worker

use common::types::{
    MatchIdentifier,
    order::RevealedOrder,
    r#match::{SettlementRole, TransferPayload},
};
use state::MatchIndexError;
use tokio::sync::mpsc::{
    UnboundedReceiver as TokioReceiver, UnboundedSender as TokioSender,
    unbounded_channel as tokio_unbounded_channel,
};

use crate::{ResponseReceiver, ResponseSender, new_response_channel};

/// The queue sender type for the match orchestrator
pub type OrchestratorQueue = TokioSender<OrchestratorJob>;
/// The queue receiver type for the match orchestrator
pub type OrchestratorReceiver = TokioReceiver<OrchestratorJob>;

/// The response to a payload submission; whether both roles have now
/// supplied their payloads
pub type PayloadResponse = Result<bool, MatchIndexError>;

/// Create a new match orchestrator queue and receiver
pub fn new_orchestrator_queue() -> (OrchestratorQueue, OrchestratorReceiver) {
    tokio_unbounded_channel()
}

/// Create a payload submission job and the receiver for its response
pub fn new_payload_job(
    match_id: MatchIdentifier,
    role: SettlementRole,
    payload: TransferPayload,
) -> (OrchestratorJob, ResponseReceiver<PayloadResponse>) {
    let (response, recv) = new_response_channel();
    (OrchestratorJob::PayloadReceived { match_id, role, payload, response }, recv)
}

/// The job type for the match orchestrator
///
/// The orchestrator owns all writes to match records after creation, so
/// payload submissions flow through its queue rather than being written at
/// the API boundary
#[derive(Debug)]
pub enum OrchestratorJob {
    /// The matching engine found a crossing pair; drive it to settlement
    ///
    /// Carries both legs' private terms. The orchestrator holds them only
    /// until the match settles or fails; they are never persisted beyond
    /// that
    MatchFound {
        /// The identifier of the match record
        match_id: MatchIdentifier,
        /// The buy side leg
        buy: RevealedOrder,
        /// The sell side leg
        sell: RevealedOrder,
    },
    /// A counterparty supplied a settlement payload for a match
    PayloadReceived {
        /// The identifier of the match record
        match_id: MatchIdentifier,
        /// The role the payload is submitted under
        role: SettlementRole,
        /// The opaque transfer payload
        payload: TransferPayload,
        /// The channel on which to respond
        response: ResponseSender<PayloadResponse>,
    },
}
