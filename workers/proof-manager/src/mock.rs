//! Defines a mock for the proof manager that skips statement evaluation,
//! either attesting to every job immediately or refusing every job with a
//! fixed reason

use circuit_types::proof::{CircuitId, ProofBundle};
use job_types::proof_manager::{ProofJob, ProofManagerReceiver};
use tokio::runtime::Handle;

use crate::proof_manager::attest_bundle;

/// The mock proof manager
pub struct MockProofManager;

impl MockProofManager {
    /// Start a mock that attests to every job without evaluating it
    pub fn start(job_queue: ProofManagerReceiver) {
        Self::start_with_failure_mode(job_queue, None);
    }

    /// Start a mock that refuses every job with the given reason
    ///
    /// Used to exercise the proving-failure path without constructing a
    /// false statement
    pub fn start_failing(job_queue: ProofManagerReceiver, reason: String) {
        Self::start_with_failure_mode(job_queue, Some(reason));
    }

    /// Spawn the mock's execution loop on a blocking runtime thread
    fn start_with_failure_mode(job_queue: ProofManagerReceiver, failure: Option<String>) {
        Handle::current().spawn_blocking(move || Self::execution_loop(job_queue, failure));
    }

    /// The execution loop for the mock; exits quietly when the queue closes
    fn execution_loop(job_queue: ProofManagerReceiver, failure: Option<String>) {
        while let Ok(job) = job_queue.recv() {
            let response = match &failure {
                Some(reason) => Err(reason.clone()),
                None => Ok(Self::attest_unchecked(job.type_)),
            };

            // The requester may have hung up; nothing to do if so
            let _ = job.response_channel.send(response);
        }
    }

    /// Attest to a job's statement without evaluating it
    ///
    /// The resulting bundle passes attestation checks even for false
    /// statements
    fn attest_unchecked(type_: ProofJob) -> ProofBundle {
        let (circuit, public_signals) = match type_ {
            ProofJob::OrderValidity { statement, .. } => {
                (CircuitId::OrderValidity, statement.to_public_signals())
            },
            ProofJob::MatchValidity { statement, .. } => {
                (CircuitId::MatchValidity, statement.to_public_signals())
            },
            ProofJob::DepositClaim { statement, .. } => {
                (CircuitId::DepositClaim, statement.to_public_signals())
            },
        };

        attest_bundle(circuit, public_signals)
    }
}
