//! The proof generation loop: dequeues jobs and schedules them onto the
//! local thread pool

use std::sync::Arc;

use circuit_types::{
    Scalar,
    proof::{CircuitId, Proof, ProofBundle},
};
use common::types::CancelChannel;
use job_types::proof_manager::{ProofJob, ProofManagerJob, ProofManagerReceiver};
use rayon::ThreadPool;
use tracing::{debug, error, info};

use crate::error::ProofManagerError;

/// Error message when sending a proof response fails
const ERR_SENDING_RESPONSE: &str = "error sending proof response, channel closed";

/// The proof manager provides a messaging interface and implementation for
/// proving statements about orders, matches, and deposit claims
pub struct ProofManager;

impl ProofManager {
    /// The execution loop blocks on the job queue then schedules proof
    /// generation jobs onto a thread pool
    #[allow(clippy::needless_pass_by_value)]
    pub(crate) fn execution_loop(
        job_queue: ProofManagerReceiver,
        thread_pool: Arc<ThreadPool>,
        cancel_channel: CancelChannel,
    ) -> Result<(), ProofManagerError> {
        loop {
            // Check the cancel channel before blocking on a job
            if cancel_channel
                .has_changed()
                .map_err(|err| ProofManagerError::RecvError(err.to_string()))?
            {
                info!("proof manager cancelled, shutting down...");
                return Err(ProofManagerError::Cancelled("received cancel signal".to_string()));
            }

            // Dequeue the next job and hand it to the thread pool
            let job = job_queue
                .recv()
                .map_err(|err| ProofManagerError::JobQueueClosed(err.to_string()))?;

            thread_pool.spawn_fifo(move || Self::handle_proof_job(job));
        }
    }

    /// The main job handler, run by a thread in the pool
    ///
    /// Evaluation failures travel back on the response channel; only a
    /// closed response channel is logged here
    fn handle_proof_job(job: ProofManagerJob) {
        let ProofManagerJob { type_, response_channel } = job;
        let circuit = type_.circuit_name();
        debug!("generating {circuit} proof");

        let result = Self::prove(type_);
        if let Err(reason) = &result {
            error!("failed to prove {circuit} statement: {reason}");
        }

        if response_channel.send(result).is_err() {
            error!("{ERR_SENDING_RESPONSE}");
        }
    }

    /// Evaluate and attest to the statement of a proof job
    ///
    /// The statement is natively evaluated against its witness first; the
    /// backend refuses to attest to a statement that fails evaluation and
    /// returns the evaluation error as the reason
    fn prove(job: ProofJob) -> Result<ProofBundle, String> {
        let (circuit, public_signals) = match job {
            ProofJob::OrderValidity { statement, witness } => {
                statement.evaluate(&witness).map_err(|err| err.to_string())?;
                (CircuitId::OrderValidity, statement.to_public_signals())
            },
            ProofJob::MatchValidity { statement, witness } => {
                statement.evaluate(&witness).map_err(|err| err.to_string())?;
                (CircuitId::MatchValidity, statement.to_public_signals())
            },
            ProofJob::DepositClaim { statement, witness } => {
                statement.evaluate(&witness).map_err(|err| err.to_string())?;
                (CircuitId::DepositClaim, statement.to_public_signals())
            },
        };

        Ok(attest_bundle(circuit, public_signals))
    }
}

/// Attest to a circuit's public signals, wrapping them as a proof bundle
pub(crate) fn attest_bundle(circuit: CircuitId, public_signals: Vec<Scalar>) -> ProofBundle {
    let proof = Proof::attest(circuit, &public_signals);
    ProofBundle { circuit, proof, public_signals }
}
