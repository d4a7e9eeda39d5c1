//! The shared index of match records
//!
//! The matching engine creates a record when it finds a crossing pair; after
//! that, only the orchestrator's task pipeline writes to it. Every mutation
//! made through the index is republished on the system bus, both to the
//! global lifecycle topic and to the match's own status topic, so
//! subscribers track a settlement without polling. Terminal records are
//! retained for audit

use std::collections::HashMap;

use circuit_types::proof::ProofBundle;
use common::{
    AsyncShared, new_async_shared,
    types::{
        MatchIdentifier,
        r#match::{
            Calldata, InvalidTransition, MatchResult, MatchStatus, SettlementRole,
            TransferPayload,
        },
    },
};
use external_api::bus_message::{MATCH_LIFECYCLE_TOPIC, SystemBusMessage, match_status_topic};
use system_bus::SystemBus;
use thiserror::Error;
use tracing::info;
use util::get_current_time_millis;

/// The errors surfaced by index operations
#[derive(Clone, Debug, Error)]
pub enum MatchIndexError {
    /// No record carries the given identifier
    #[error("no match with id {0}")]
    UnknownMatch(MatchIdentifier),
    /// A status transition violated the settlement state machine
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// A role submitted a second transfer payload
    #[error("the {role} has already supplied a transfer payload")]
    DuplicatePayload {
        /// The role that resubmitted
        role: SettlementRole,
    },
    /// A payload arrived while the match was not awaiting payloads
    #[error("match {id} is not awaiting transfer payloads (status {status})")]
    NotAwaitingPayloads {
        /// The identifier of the match
        id: MatchIdentifier,
        /// The status the match was in
        status: MatchStatus,
    },
}

/// Counters summarizing match activity since the node started
#[derive(Clone, Copy, Debug, Default)]
pub struct MatchStats {
    /// The number of matches found
    pub matches_found: u64,
    /// The number of matches fully settled
    pub matches_settled: u64,
    /// The number of matches that failed in proving or submission
    pub matches_failed: u64,
}

/// A clone-able handle to the node's match records
#[derive(Clone)]
pub struct MatchIndex {
    /// The match records keyed by identifier
    ///
    /// Each record carries its own lock so the pipeline can advance one
    /// match without holding the whole index
    matches: AsyncShared<HashMap<MatchIdentifier, AsyncShared<MatchResult>>>,
    /// A handle to the system bus for lifecycle events
    bus: SystemBus<SystemBusMessage>,
}

impl MatchIndex {
    /// Create an empty index publishing lifecycle events on the given bus
    pub fn new(bus: SystemBus<SystemBusMessage>) -> Self {
        Self { matches: new_async_shared(HashMap::new()), bus }
    }

    // ------------------
    // | State Changes  |
    // ------------------

    /// Register a newly found match and announce it
    pub async fn insert(&self, record: MatchResult) {
        let id = record.id;
        let message = SystemBusMessage::MatchFound {
            match_id: id,
            buy_commitment: record.buy_commitment,
            sell_commitment: record.sell_commitment,
            timestamp: get_current_time_millis(),
        };

        self.matches.write().await.insert(id, new_async_shared(record));
        self.publish(id, message);
    }

    /// Advance a record's status, announcing the change
    ///
    /// A move into `Confirmed` off the submission path announces the
    /// accepted transaction; terminal moves announce settlement or failure.
    /// The settlement failure revert `Settling -> Confirmed` announces as a
    /// plain status update so subscribers can tell it from the first
    /// confirmation
    pub async fn transition(
        &self,
        id: &MatchIdentifier,
        next: MatchStatus,
    ) -> Result<(), MatchIndexError> {
        let record = self.find(id).await.ok_or(MatchIndexError::UnknownMatch(*id))?;
        let mut guard = record.write().await;

        let from = guard.status.clone();
        guard.transition(next)?;
        info!("match {id} advanced from {from} to {}", guard.status);

        let timestamp = get_current_time_millis();
        let message = match (&from, &guard.status) {
            (MatchStatus::Submitting, MatchStatus::Confirmed) => SystemBusMessage::MatchConfirmed {
                match_id: *id,
                tx_hash: guard.tx_hash.clone().unwrap_or_default(),
                timestamp,
            },
            (_, MatchStatus::Settled) => {
                SystemBusMessage::MatchSettled { match_id: *id, timestamp }
            },
            (_, MatchStatus::Failed { reason }) => SystemBusMessage::MatchFailed {
                match_id: *id,
                reason: reason.clone(),
                timestamp,
            },
            (_, status) => SystemBusMessage::MatchStatusUpdated {
                match_id: *id,
                status: status.clone(),
                timestamp,
            },
        };
        drop(guard);

        self.publish(*id, message);
        Ok(())
    }

    /// Attach the validity proof produced for the match
    pub async fn set_proof(
        &self,
        id: &MatchIdentifier,
        proof: ProofBundle,
    ) -> Result<(), MatchIndexError> {
        let record = self.find(id).await.ok_or(MatchIndexError::UnknownMatch(*id))?;
        record.write().await.proof = Some(proof);
        Ok(())
    }

    /// Attach the encoded submission calldata
    pub async fn set_calldata(
        &self,
        id: &MatchIdentifier,
        calldata: Calldata,
    ) -> Result<(), MatchIndexError> {
        let record = self.find(id).await.ok_or(MatchIndexError::UnknownMatch(*id))?;
        record.write().await.calldata = Some(calldata);
        Ok(())
    }

    /// Record the ledger's acceptance of the match submission
    pub async fn set_submission_receipt(
        &self,
        id: &MatchIdentifier,
        ledger_match_id: u64,
        tx_hash: String,
    ) -> Result<(), MatchIndexError> {
        let record = self.find(id).await.ok_or(MatchIndexError::UnknownMatch(*id))?;
        let mut guard = record.write().await;
        guard.ledger_match_id = Some(ledger_match_id);
        guard.tx_hash = Some(tx_hash);
        Ok(())
    }

    /// Record a counterparty's transfer payload
    ///
    /// Payloads are accepted only while the match is `Confirmed`; the first
    /// payload for a role wins. Returns whether both payloads are now held
    pub async fn record_payload(
        &self,
        id: &MatchIdentifier,
        role: SettlementRole,
        payload: TransferPayload,
    ) -> Result<bool, MatchIndexError> {
        let record = self.find(id).await.ok_or(MatchIndexError::UnknownMatch(*id))?;
        let mut guard = record.write().await;

        if guard.status != MatchStatus::Confirmed {
            return Err(MatchIndexError::NotAwaitingPayloads {
                id: *id,
                status: guard.status.clone(),
            });
        }
        if !guard.record_payload(role, payload) {
            return Err(MatchIndexError::DuplicatePayload { role });
        }

        Ok(guard.both_payloads_received())
    }

    /// Drop a record's transfer payloads
    ///
    /// Part of the settlement failure revert: the payloads that backed the
    /// failed attempt are released so corrected ones may be recorded
    pub async fn clear_payloads(&self, id: &MatchIdentifier) -> Result<(), MatchIndexError> {
        let record = self.find(id).await.ok_or(MatchIndexError::UnknownMatch(*id))?;
        record.write().await.clear_payloads();
        Ok(())
    }

    // -----------
    // | Getters |
    // -----------

    /// Snapshot a record by identifier
    pub async fn get(&self, id: &MatchIdentifier) -> Option<MatchResult> {
        let record = self.find(id).await?;
        let snapshot = record.read().await.clone();
        Some(snapshot)
    }

    /// Whether a record with the identifier exists
    pub async fn contains(&self, id: &MatchIdentifier) -> bool {
        self.matches.read().await.contains_key(id)
    }

    /// A snapshot of the index's activity counters
    ///
    /// Records are never removed, so the found count is the map size
    pub async fn stats(&self) -> MatchStats {
        let map = self.matches.read().await;
        let mut stats =
            MatchStats { matches_found: map.len() as u64, ..MatchStats::default() };

        for record in map.values() {
            match record.read().await.status {
                MatchStatus::Settled => stats.matches_settled += 1,
                MatchStatus::Failed { .. } => stats.matches_failed += 1,
                _ => {},
            }
        }

        stats
    }

    // -----------
    // | Helpers |
    // -----------

    /// Look up the shared handle of a record
    async fn find(&self, id: &MatchIdentifier) -> Option<AsyncShared<MatchResult>> {
        self.matches.read().await.get(id).cloned()
    }

    /// Publish a lifecycle message to the global and per-match topics
    fn publish(&self, id: MatchIdentifier, message: SystemBusMessage) {
        self.bus.publish(MATCH_LIFECYCLE_TOPIC.to_string(), message.clone());
        self.bus.publish(match_status_topic(&id), message);
    }
}
