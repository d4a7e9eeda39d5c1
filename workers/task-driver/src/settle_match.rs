//! Defines the task that carries a confirmed match through settlement
//!
//! The task submits both counterparties' transfer payloads to the ledger's
//! settlement entrypoint in one call. On success the match is terminal at
//! `Settled`; on failure the cleanup step reverts the record to `Confirmed`
//! and releases the payloads so corrected ones may be resubmitted

use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;
use common::types::{MatchIdentifier, r#match::MatchStatus};
use darkpool_client::DarkpoolClient;
use serde::Serialize;
use state::MatchIndex;
use thiserror::Error;
use tracing::instrument;

use crate::driver::{StateWrapper, Task};

/// The error message emitted when the match record cannot be found
const ERR_MATCH_NOT_FOUND: &str = "match record not found in the index";
/// The error message emitted when the record is missing its ledger id
const ERR_LEDGER_ID_MISSING: &str = "match record has no ledger match id";
/// The error message emitted when a transfer payload is missing
const ERR_PAYLOAD_MISSING: &str = "both transfer payloads must be present to settle";

/// The displayable name for the settle match task
const SETTLE_MATCH_TASK_NAME: &str = "settle-match";

// -------------------
// | Task Definition |
// -------------------

/// Describes the settle match task
pub struct SettleMatchTask<C: DarkpoolClient> {
    /// The ID of the match record the task settles
    pub match_id: MatchIdentifier,
    /// The shared index of match records
    pub match_index: MatchIndex,
    /// The client to use for submitting transactions to the ledger
    pub darkpool_client: C,
    /// The state of the task
    task_state: SettleMatchTaskState,
}

/// The state of the settle match task
#[derive(Clone, Debug, Serialize)]
pub enum SettleMatchTaskState {
    /// The task is awaiting scheduling
    Pending,
    /// The task is submitting the settlement transaction
    SubmittingSettlement,
    /// The task has finished
    Completed,
}

impl From<SettleMatchTaskState> for StateWrapper {
    fn from(state: SettleMatchTaskState) -> Self {
        StateWrapper::SettleMatch(state)
    }
}

impl Display for SettleMatchTaskState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The error type that this task emits
#[derive(Clone, Debug, Error)]
pub enum SettleMatchTaskError {
    /// Error submitting the settlement transaction to the ledger
    #[error("ledger settlement failed: {0}")]
    Ledger(String),
    /// Error reading or writing the match record
    #[error("match state error: {0}")]
    State(String),
}

#[async_trait]
impl<C: DarkpoolClient> Task for SettleMatchTask<C> {
    type State = SettleMatchTaskState;
    type Error = SettleMatchTaskError;

    #[instrument(skip_all, err, fields(task = %self.name(), state = %self.state()))]
    async fn step(&mut self) -> Result<(), Self::Error> {
        match self.state() {
            SettleMatchTaskState::Pending => self.begin_settling().await,
            SettleMatchTaskState::SubmittingSettlement => self.submit_settlement().await,
            SettleMatchTaskState::Completed => {
                unreachable!("step called on completed task")
            },
        }
    }

    /// Revert a failed settlement to `Confirmed`, releasing the payloads
    /// that backed the failed attempt so corrected ones may be recorded
    async fn cleanup(&mut self) -> Result<(), Self::Error> {
        let record = self
            .match_index
            .get(&self.match_id)
            .await
            .ok_or_else(|| SettleMatchTaskError::State(ERR_MATCH_NOT_FOUND.to_string()))?;

        // Nothing to revert if the failure predates the move into `Settling`
        if record.status != MatchStatus::Settling {
            return Ok(());
        }

        self.match_index
            .clear_payloads(&self.match_id)
            .await
            .map_err(|err| SettleMatchTaskError::State(err.to_string()))?;
        self.match_index
            .transition(&self.match_id, MatchStatus::Confirmed)
            .await
            .map_err(|err| SettleMatchTaskError::State(err.to_string()))?;

        Ok(())
    }

    fn name(&self) -> String {
        SETTLE_MATCH_TASK_NAME.to_string()
    }

    fn completed(&self) -> bool {
        matches!(self.task_state, SettleMatchTaskState::Completed)
    }

    fn state(&self) -> SettleMatchTaskState {
        self.task_state.clone()
    }
}

// -----------------------
// | Task Implementation |
// -----------------------

impl<C: DarkpoolClient> SettleMatchTask<C> {
    /// Constructor
    pub fn new(match_id: MatchIdentifier, match_index: MatchIndex, darkpool_client: C) -> Self {
        Self { match_id, match_index, darkpool_client, task_state: SettleMatchTaskState::Pending }
    }

    // --------------
    // | Task Steps |
    // --------------

    /// Move the record into `Settling` before the transaction is built
    async fn begin_settling(&mut self) -> Result<(), SettleMatchTaskError> {
        self.match_index
            .transition(&self.match_id, MatchStatus::Settling)
            .await
            .map_err(|err| SettleMatchTaskError::State(err.to_string()))?;

        self.task_state = SettleMatchTaskState::SubmittingSettlement;
        Ok(())
    }

    /// Submit both transfer payloads to the settlement entrypoint in one
    /// call
    async fn submit_settlement(&mut self) -> Result<(), SettleMatchTaskError> {
        let record = self
            .match_index
            .get(&self.match_id)
            .await
            .ok_or_else(|| SettleMatchTaskError::State(ERR_MATCH_NOT_FOUND.to_string()))?;

        let ledger_match_id = record
            .ledger_match_id
            .ok_or_else(|| SettleMatchTaskError::State(ERR_LEDGER_ID_MISSING.to_string()))?;
        let buyer_payload = record
            .buyer_payload
            .as_ref()
            .ok_or_else(|| SettleMatchTaskError::State(ERR_PAYLOAD_MISSING.to_string()))?;
        let seller_payload = record
            .seller_payload
            .as_ref()
            .ok_or_else(|| SettleMatchTaskError::State(ERR_PAYLOAD_MISSING.to_string()))?;

        self.darkpool_client
            .submit_settlement(ledger_match_id, buyer_payload, seller_payload)
            .await
            .map_err(|err| SettleMatchTaskError::Ledger(err.to_string()))?;

        self.match_index
            .transition(&self.match_id, MatchStatus::Settled)
            .await
            .map_err(|err| SettleMatchTaskError::State(err.to_string()))?;

        self.task_state = SettleMatchTaskState::Completed;
        Ok(())
    }
}
