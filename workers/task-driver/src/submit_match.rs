//! Defines the task that carries a freshly found match from `PendingProof`
//! through proving and ledger submission to `Confirmed`
//!
//! Broadly this breaks down into the following steps:
//!     - Prove the match validity statement over the private leg terms
//!     - Encode the proof into the calldata shape the ledger verifier
//!       expects and attach both to the record
//!     - Submit the match transaction and record the ledger's receipt
//!
//! A step failure marks the match `Failed`; the reason recorded for a proof
//! backend failure is the backend's error string verbatim

use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use circuit_types::{
    match_validity::{MatchValidityStatement, MatchValidityWitness},
    order::OrderTerms,
    proof::ProofBundle,
};
use common::types::{MatchIdentifier, r#match::MatchStatus};
use darkpool_client::{
    DarkpoolClient,
    calldata::{LedgerCall, encode_call},
};
use job_types::proof_manager::{ProofJob, ProofManagerQueue, new_proof_job};
use serde::Serialize;
use state::MatchIndex;
use thiserror::Error;
use tracing::instrument;

use crate::driver::{StateWrapper, Task};

/// The error message emitted when the match record cannot be found
const ERR_MATCH_NOT_FOUND: &str = "match record not found in the index";
/// The error message emitted when the proof is missing at submission
const ERR_PROOF_MISSING: &str = "proof bundle missing at submission";

/// The displayable name for the submit match task
const SUBMIT_MATCH_TASK_NAME: &str = "submit-match";

// -------------------
// | Task Definition |
// -------------------

/// Describes the submit match task
pub struct SubmitMatchTask<C: DarkpoolClient> {
    /// The ID of the match record the task advances
    pub match_id: MatchIdentifier,
    /// The private terms of the buy leg, used as proof witness
    pub buy: OrderTerms,
    /// The private terms of the sell leg, used as proof witness
    pub sell: OrderTerms,
    /// The shared index of match records
    pub match_index: MatchIndex,
    /// The work queue to add proof generation jobs to
    pub proof_queue: ProofManagerQueue,
    /// The client to use for submitting transactions to the ledger
    pub darkpool_client: C,
    /// The proof produced for the match, held between proving and submission
    proof: Option<ProofBundle>,
    /// The reason a step failed, written to the record during cleanup
    failure: Option<String>,
    /// The state of the task
    task_state: SubmitMatchTaskState,
}

/// The state of the submit match task
#[derive(Clone, Debug, Serialize)]
pub enum SubmitMatchTaskState {
    /// The task is awaiting scheduling
    Pending,
    /// The task is generating a match validity proof
    Proving,
    /// The task is submitting the match transaction
    SubmittingMatch,
    /// The task has finished
    Completed,
}

impl From<SubmitMatchTaskState> for StateWrapper {
    fn from(state: SubmitMatchTaskState) -> Self {
        StateWrapper::SubmitMatch(state)
    }
}

impl Display for SubmitMatchTaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The error type that this task emits
#[derive(Clone, Debug, Error)]
pub enum SubmitMatchTaskError {
    /// Error generating the match validity proof
    #[error("proof generation failed: {0}")]
    ProofGeneration(String),
    /// Error encoding the proof into submission calldata
    #[error("calldata encoding failed: {0}")]
    Encoding(String),
    /// Error submitting the match transaction to the ledger
    #[error("ledger submission failed: {0}")]
    Ledger(String),
    /// Error sending a message to another local worker
    #[error("error sending message to worker: {0}")]
    SendMessage(String),
    /// Error reading or writing the match record
    #[error("match state error: {0}")]
    State(String),
}

impl SubmitMatchTaskError {
    /// The reason recorded on the match record when this error fails the
    /// task
    ///
    /// Proof backend errors pass through verbatim so both counterparties see
    /// the prover's reason rather than a generic message
    fn failure_reason(&self) -> String {
        match self {
            SubmitMatchTaskError::ProofGeneration(reason) => reason.clone(),
            err => err.to_string(),
        }
    }
}

#[async_trait]
impl<C: DarkpoolClient> Task for SubmitMatchTask<C> {
    type State = SubmitMatchTaskState;
    type Error = SubmitMatchTaskError;

    #[instrument(skip_all, err, fields(task = %self.name(), state = %self.state()))]
    async fn step(&mut self) -> Result<(), Self::Error> {
        let res = match self.state() {
            SubmitMatchTaskState::Pending => self.begin_proving().await,
            SubmitMatchTaskState::Proving => self.generate_proof().await,
            SubmitMatchTaskState::SubmittingMatch => self.submit_match().await,
            SubmitMatchTaskState::Completed => {
                unreachable!("step called on completed task")
            },
        };

        // Hold the reason so cleanup can mark the record failed
        if let Err(err) = &res {
            self.failure = Some(err.failure_reason());
        }
        res
    }

    /// Mark the match failed with the reason of the step that broke
    async fn cleanup(&mut self) -> Result<(), Self::Error> {
        if let Some(reason) = self.failure.take() {
            self.match_index
                .transition(&self.match_id, MatchStatus::Failed { reason })
                .await
                .map_err(|err| SubmitMatchTaskError::State(err.to_string()))?;
        }

        Ok(())
    }

    fn name(&self) -> String {
        SUBMIT_MATCH_TASK_NAME.to_string()
    }

    fn completed(&self) -> bool {
        matches!(self.task_state, SubmitMatchTaskState::Completed)
    }

    fn state(&self) -> SubmitMatchTaskState {
        self.task_state.clone()
    }
}

// -----------------------
// | Task Implementation |
// -----------------------

impl<C: DarkpoolClient> SubmitMatchTask<C> {
    /// Constructor
    pub fn new(
        match_id: MatchIdentifier,
        buy: OrderTerms,
        sell: OrderTerms,
        match_index: MatchIndex,
        proof_queue: ProofManagerQueue,
        darkpool_client: C,
    ) -> Self {
        Self {
            match_id,
            buy,
            sell,
            match_index,
            proof_queue,
            darkpool_client,
            proof: None,
            failure: None,
            task_state: SubmitMatchTaskState::Pending,
        }
    }

    // --------------
    // | Task Steps |
    // --------------

    /// Move the record into `Proving` before any proof work begins
    async fn begin_proving(&mut self) -> Result<(), SubmitMatchTaskError> {
        self.match_index
            .transition(&self.match_id, MatchStatus::Proving)
            .await
            .map_err(|err| SubmitMatchTaskError::State(err.to_string()))?;

        self.task_state = SubmitMatchTaskState::Proving;
        Ok(())
    }

    /// Generate the match validity proof, then attach the proof and its
    /// encoded calldata to the record
    async fn generate_proof(&mut self) -> Result<(), SubmitMatchTaskError> {
        let record = self
            .match_index
            .get(&self.match_id)
            .await
            .ok_or_else(|| SubmitMatchTaskError::State(ERR_MATCH_NOT_FOUND.to_string()))?;

        // The public statement snapshots the record; the witness is the
        // private leg terms the orchestrator held back from the record
        let statement = MatchValidityStatement {
            buy_commitment: record.buy_commitment,
            sell_commitment: record.sell_commitment,
            settlement_commitment: record.settlement_commitment,
        };
        let witness = MatchValidityWitness {
            buy: self.buy,
            sell: self.sell,
            settlement: record.settlement,
        };

        // Dispatch to the proof manager and await its response
        let (job, response) = new_proof_job(ProofJob::MatchValidity { statement, witness });
        self.proof_queue
            .send(job)
            .map_err(|err| SubmitMatchTaskError::SendMessage(err.to_string()))?;

        let bundle = response
            .await
            .map_err(|err| SubmitMatchTaskError::SendMessage(err.to_string()))?
            .map_err(SubmitMatchTaskError::ProofGeneration)?;

        // Re-encode the proof into the calldata the ledger verifier expects
        let call = LedgerCall::SubmitMatch { bundle: bundle.clone() };
        let calldata =
            encode_call(&call).map_err(|err| SubmitMatchTaskError::Encoding(err.to_string()))?;

        self.match_index
            .set_proof(&self.match_id, bundle.clone())
            .await
            .map_err(|err| SubmitMatchTaskError::State(err.to_string()))?;
        self.match_index
            .set_calldata(&self.match_id, calldata)
            .await
            .map_err(|err| SubmitMatchTaskError::State(err.to_string()))?;
        self.match_index
            .transition(&self.match_id, MatchStatus::Submitting)
            .await
            .map_err(|err| SubmitMatchTaskError::State(err.to_string()))?;

        self.proof = Some(bundle);
        self.task_state = SubmitMatchTaskState::SubmittingMatch;
        Ok(())
    }

    /// Submit the match transaction and record the ledger's receipt
    async fn submit_match(&mut self) -> Result<(), SubmitMatchTaskError> {
        let bundle = self
            .proof
            .as_ref()
            .ok_or_else(|| SubmitMatchTaskError::State(ERR_PROOF_MISSING.to_string()))?;

        let submission = self
            .darkpool_client
            .submit_match(bundle)
            .await
            .map_err(|err| SubmitMatchTaskError::Ledger(err.to_string()))?;

        self.match_index
            .set_submission_receipt(
                &self.match_id,
                submission.ledger_match_id,
                submission.receipt.tx_hash,
            )
            .await
            .map_err(|err| SubmitMatchTaskError::State(err.to_string()))?;
        self.match_index
            .transition(&self.match_id, MatchStatus::Confirmed)
            .await
            .map_err(|err| SubmitMatchTaskError::State(err.to_string()))?;

        self.task_state = SubmitMatchTaskState::Completed;
        Ok(())
    }
}
