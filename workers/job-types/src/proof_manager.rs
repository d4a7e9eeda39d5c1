//! Defines job types that may be enqueued by other workers in the local node
//! for the proof generation module to process

use circuit_types::{
    deposit_claim::{DepositClaimStatement, DepositClaimWitness},
    match_validity::{MatchValidityStatement, MatchValidityWitness},
    order_validity::{OrderValidityStatement, OrderValidityWitness},
    proof::ProofBundle,
};
use crossbeam::channel::{Receiver as CrossbeamReceiver, Sender as CrossbeamSender};

use crate::{ResponseReceiver, ResponseSender, new_response_channel};

/// The queue type for the proof manager
pub type ProofManagerQueue = CrossbeamSender<ProofManagerJob>;
/// The receiver type for the proof manager
pub type ProofManagerReceiver = CrossbeamReceiver<ProofManagerJob>;
/// The response type of a proof job; errors carry the backend's reason
/// verbatim
pub type ProofResponse = Result<ProofBundle, String>;

/// Create a new proof manager queue and receiver
pub fn new_proof_manager_queue() -> (ProofManagerQueue, ProofManagerReceiver) {
    crossbeam::channel::unbounded()
}

/// Create a proof job and the receiver its response is delivered on
pub fn new_proof_job(type_: ProofJob) -> (ProofManagerJob, ResponseReceiver<ProofResponse>) {
    let (response_channel, recv) = new_response_channel();
    (ProofManagerJob { type_, response_channel }, recv)
}

// -------------
// | Job Types |
// -------------

/// Represents a job enqueued in the proof manager's work queue
#[derive(Debug)]
pub struct ProofManagerJob {
    /// The type of job being requested
    pub type_: ProofJob,
    /// The response channel to send the proof back along
    pub response_channel: ResponseSender<ProofResponse>,
}

/// The job type and parameterization
#[derive(Clone, Debug)]
pub enum ProofJob {
    /// A request to prove that a revealed order commitment is well formed
    OrderValidity {
        /// The statement (public values) to prove against
        statement: OrderValidityStatement,
        /// The witness to the statement
        witness: OrderValidityWitness,
    },
    /// A request to prove the crossing and settlement arithmetic of a match
    MatchValidity {
        /// The statement (public values) to prove against
        statement: MatchValidityStatement,
        /// The witness to the statement
        witness: MatchValidityWitness,
    },
    /// A request to prove membership and nullifier derivation for a deposit
    /// claim
    DepositClaim {
        /// The statement (public values) to prove against
        statement: DepositClaimStatement,
        /// The witness to the statement
        witness: DepositClaimWitness,
    },
}

impl ProofJob {
    /// The name of the circuit the job targets, for logging
    pub fn circuit_name(&self) -> &'static str {
        match self {
            ProofJob::OrderValidity { .. } => "order-validity",
            ProofJob::MatchValidity { .. } => "match-validity",
            ProofJob::DepositClaim { .. } => "deposit-claim",
        }
    }
}
