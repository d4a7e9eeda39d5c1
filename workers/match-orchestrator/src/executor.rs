//! The match orchestrator executor
//!
//! The executor consumes two job shapes: `MatchFound` from the matching
//! engine, carrying the legs' private terms, and `PayloadReceived` from the
//! API layer. Each spawns at most one per-match task on the task driver;
//! the match record's status field decides whether a spawn is admissible

use common::{
    default_wrapper::{DefaultOption, default_option},
    types::{
        CancelChannel, MatchIdentifier,
        order::RevealedOrder,
        r#match::{MatchStatus, SettlementRole, TransferPayload},
    },
};
use darkpool_client::DarkpoolClient;
use job_types::{
    ResponseSender,
    match_orchestrator::{OrchestratorJob, OrchestratorReceiver, PayloadResponse},
    proof_manager::ProofManagerQueue,
};
use state::MatchIndex;
use task_driver::{driver::TaskDriver, settle_match::SettleMatchTask, submit_match::SubmitMatchTask};
use tracing::{error, info, instrument, warn};

use crate::error::MatchOrchestratorError;

// -------------
// | Constants |
// -------------

/// The error message emitted when the job queue has already been taken
const ERR_QUEUE_TAKEN: &str = "job queue already taken";
/// The error message emitted when the job queue closes
const ERR_QUEUE_CLOSED: &str = "job queue closed";
/// The error message emitted when a match record cannot be found
const ERR_MATCH_NOT_FOUND: &str = "match record not found in the index";
/// The failure reason recorded when a match arrives without usable private
/// terms for both legs
const ERR_TERMS_MISSING: &str = "private terms missing for the match legs";

// ------------
// | Executor |
// ------------

/// The match orchestrator executor
pub struct MatchOrchestratorExecutor<C: DarkpoolClient> {
    /// The job queue on which to receive orchestrator jobs
    job_queue: DefaultOption<OrchestratorReceiver>,
    /// The shared index of match records
    match_index: MatchIndex,
    /// The work queue of the proof manager, handed to submit tasks
    proof_queue: ProofManagerQueue,
    /// The client for ledger submissions, handed to tasks
    darkpool_client: C,
    /// The driver the per-match tasks run on
    task_driver: TaskDriver,
    /// The channel on which the coordinator signals shutdown
    cancel_channel: CancelChannel,
}

impl<C: DarkpoolClient> MatchOrchestratorExecutor<C> {
    /// Create a new executor
    pub fn new(
        job_queue: OrchestratorReceiver,
        match_index: MatchIndex,
        proof_queue: ProofManagerQueue,
        darkpool_client: C,
        task_driver: TaskDriver,
        cancel_channel: CancelChannel,
    ) -> Self {
        Self {
            job_queue: default_option(job_queue),
            match_index,
            proof_queue,
            darkpool_client,
            task_driver,
            cancel_channel,
        }
    }

    /// The main execution loop; runs until cancelled or the queue closes
    pub async fn execution_loop(mut self) -> MatchOrchestratorError {
        info!("starting match orchestrator executor loop");
        let mut job_queue = match self.job_queue.take() {
            Some(queue) => queue,
            None => return MatchOrchestratorError::Setup(ERR_QUEUE_TAKEN.to_string()),
        };

        loop {
            tokio::select! {
                job = job_queue.recv() => {
                    match job {
                        Some(job) => self.handle_job(job).await,
                        None => {
                            return MatchOrchestratorError::JobQueueClosed(
                                ERR_QUEUE_CLOSED.to_string(),
                            )
                        },
                    }
                },

                // Await cancellation by the coordinator
                _ = self.cancel_channel.changed() => {
                    info!("match orchestrator received cancel signal, shutting down...");
                    return MatchOrchestratorError::Cancelled("received cancel signal".to_string());
                }
            }
        }
    }
}

// ----------------
// | Job Handlers |
// ----------------

impl<C: DarkpoolClient> MatchOrchestratorExecutor<C> {
    /// Dispatch a job to its handler; job failures are logged, not fatal
    async fn handle_job(&self, job: OrchestratorJob) {
        let res = match job {
            OrchestratorJob::MatchFound { match_id, buy, sell } => {
                self.handle_match_found(match_id, buy, sell).await
            },
            OrchestratorJob::PayloadReceived { match_id, role, payload, response } => {
                self.handle_payload_received(match_id, role, payload, response).await
            },
        };

        if let Err(err) = res {
            error!("error handling match orchestrator job: {err}");
        }
    }

    /// Handle a match discovered by the matching engine
    ///
    /// Spawns a submit match task holding the legs' private terms as proof
    /// witness. The terms live only as long as the task; they are never
    /// written to the record
    #[instrument(skip_all, fields(match_id = %match_id))]
    async fn handle_match_found(
        &self,
        match_id: MatchIdentifier,
        buy: RevealedOrder,
        sell: RevealedOrder,
    ) -> Result<(), MatchOrchestratorError> {
        let record = self
            .match_index
            .get(&match_id)
            .await
            .ok_or_else(|| MatchOrchestratorError::State(ERR_MATCH_NOT_FOUND.to_string()))?;

        // The status field is the pipeline lock; a record that has already
        // advanced is not picked up a second time
        if record.status != MatchStatus::PendingProof {
            warn!("match {match_id} is already {}; ignoring rediscovery", record.status);
            return Ok(());
        }

        // Without both legs' terms bound to the record's commitments the
        // match can never prove, so it fails without a proof attempt
        let terms_usable = buy.commitment == record.buy_commitment
            && sell.commitment == record.sell_commitment
            && buy.verify_commitment()
            && sell.verify_commitment();
        if !terms_usable {
            warn!("match {match_id} has no usable private terms; marking failed");
            self.transition(&match_id, MatchStatus::Proving).await?;
            self.transition(&match_id, MatchStatus::Failed {
                reason: ERR_TERMS_MISSING.to_string(),
            })
            .await?;
            return Ok(());
        }

        let task = SubmitMatchTask::new(
            match_id,
            buy.terms,
            sell.terms,
            self.match_index.clone(),
            self.proof_queue.clone(),
            self.darkpool_client.clone(),
        );
        let (task_id, _handle) = self.task_driver.start_task(task).await;
        info!("started submit match task {task_id} for match {match_id}");
        Ok(())
    }

    /// Handle a counterparty's settlement payload
    ///
    /// The index enforces the payload rules; once both payloads are held a
    /// settle match task is spawned to execute the transfers
    #[instrument(skip_all, fields(match_id = %match_id, role = %role))]
    async fn handle_payload_received(
        &self,
        match_id: MatchIdentifier,
        role: SettlementRole,
        payload: TransferPayload,
        response: ResponseSender<PayloadResponse>,
    ) -> Result<(), MatchOrchestratorError> {
        let result = self.match_index.record_payload(&match_id, role, payload).await;
        let ready = matches!(result, Ok(true));

        // The requester may have hung up; nothing to do if so
        let _ = response.send(result);

        if ready {
            let task = SettleMatchTask::new(
                match_id,
                self.match_index.clone(),
                self.darkpool_client.clone(),
            );
            let (task_id, _handle) = self.task_driver.start_task(task).await;
            info!("started settle match task {task_id} for match {match_id}");
        }

        Ok(())
    }

    /// Advance a record's status through the index
    async fn transition(
        &self,
        match_id: &MatchIdentifier,
        next: MatchStatus,
    ) -> Result<(), MatchOrchestratorError> {
        self.match_index
            .transition(match_id, next)
            .await
            .map_err(|err| MatchOrchestratorError::State(err.to_string()))
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        order::{OrderSide, OrderTerms},
        order_validity::OrderValidityStatement,
        proof::{CircuitId, Proof, ProofBundle},
        settlement::SettlementTerms,
    };
    use common::types::{
        MatchIdentifier,
        ledger::OrderStatus,
        new_cancel_channel,
        order::RevealedOrder,
        r#match::{MatchResult, MatchStatus, SettlementRole, TransferPayload},
    };
    use darkpool_client::{DarkpoolClient, EmbeddedDarkpool};
    use external_api::bus_message::{MATCH_LIFECYCLE_TOPIC, SystemBusMessage};
    use job_types::{
        match_orchestrator::new_orchestrator_queue, new_response_channel,
        proof_manager::{ProofManagerReceiver, new_proof_manager_queue},
    };
    use proof_manager::mock::MockProofManager;
    use rand::thread_rng;
    use state::{MatchIndex, MatchIndexError};
    use system_bus::{SystemBus, TopicReader};
    use task_driver::driver::TaskDriver;

    use super::MatchOrchestratorExecutor;

    /// The test harness: an executor over fresh state, plus the handles the
    /// tests observe it through
    struct Harness {
        /// The executor under test
        executor: MatchOrchestratorExecutor<EmbeddedDarkpool>,
        /// The bus tasks publish lifecycle events on
        bus: SystemBus<SystemBusMessage>,
        /// The match index shared with the executor
        match_index: MatchIndex,
        /// The ledger tasks submit to
        client: EmbeddedDarkpool,
        /// The receive side of the proof queue; tests either attach a mock
        /// prover or hold it to observe dispatches
        proof_recv: ProofManagerReceiver,
    }

    /// Build an executor over fresh state
    fn harness() -> Harness {
        let bus = SystemBus::new();
        let match_index = MatchIndex::new(bus.clone());
        let client = EmbeddedDarkpool::new();

        let (proof_queue, proof_recv) = new_proof_manager_queue();
        let (_job_queue, job_recv) = new_orchestrator_queue();
        let (_cancel_sender, cancel_channel) = new_cancel_channel();

        let executor = MatchOrchestratorExecutor::new(
            job_recv,
            match_index.clone(),
            proof_queue,
            client.clone(),
            TaskDriver::new(bus.clone()),
            cancel_channel,
        );

        Harness { executor, bus, match_index, client, proof_recv }
    }

    /// Attest a statement's public signals into a bundle
    fn bundle(circuit: CircuitId, signals: Vec<Scalar>) -> ProofBundle {
        ProofBundle { circuit, proof: Proof::attest(circuit, &signals), public_signals: signals }
    }

    /// The reference crossing pair as revealed orders
    fn crossing_legs() -> (RevealedOrder, RevealedOrder) {
        let mut rng = thread_rng();
        let buy_terms = OrderTerms {
            side: OrderSide::Buy,
            price: 1000,
            amount: 500,
            nonce: Scalar::random(&mut rng),
        };
        let sell_terms = OrderTerms {
            side: OrderSide::Sell,
            price: 900,
            amount: 600,
            nonce: Scalar::random(&mut rng),
        };

        let buy = RevealedOrder::new(
            buy_terms,
            buy_terms.compute_commitment(),
            "buyer".to_string(),
            Scalar::from(1u8),
        );
        let sell = RevealedOrder::new(
            sell_terms,
            sell_terms.compute_commitment(),
            "seller".to_string(),
            Scalar::from(2u8),
        );
        (buy, sell)
    }

    /// Register both legs as active orders on the ledger
    async fn activate_legs(client: &EmbeddedDarkpool, buy: &RevealedOrder, sell: &RevealedOrder) {
        for order in [buy, sell] {
            let statement = OrderValidityStatement { commitment: order.commitment };
            let b = bundle(CircuitId::OrderValidity, statement.to_public_signals());
            client.submit_order(&b, order.owner_key).await.unwrap();
        }
    }

    /// Insert a pending record for the legs, as the matching engine would
    async fn insert_match(
        index: &MatchIndex,
        buy: &RevealedOrder,
        sell: &RevealedOrder,
    ) -> MatchIdentifier {
        let settlement = SettlementTerms::derive(&buy.terms, &sell.terms).unwrap();
        let record = MatchResult::new(buy, sell, settlement);
        let id = record.id;
        index.insert(record).await;
        id
    }

    /// A transfer payload over a single distinguishing element
    fn payload(seed: u64) -> TransferPayload {
        TransferPayload::new(vec![Scalar::from(seed)])
    }

    /// Read lifecycle messages until the match is announced confirmed
    async fn await_confirmed(reader: &mut TopicReader<SystemBusMessage>) {
        loop {
            if let SystemBusMessage::MatchConfirmed { .. } = reader.next_message().await {
                return;
            }
        }
    }

    /// Read lifecycle messages until the match is announced settled
    async fn await_settled(reader: &mut TopicReader<SystemBusMessage>) {
        loop {
            if let SystemBusMessage::MatchSettled { .. } = reader.next_message().await {
                return;
            }
        }
    }

    /// Drive a freshly inserted match through the submit pipeline
    ///
    /// Returns once the record is confirmed on the ledger
    async fn confirm_match(
        harness: &Harness,
        match_id: MatchIdentifier,
        buy: RevealedOrder,
        sell: RevealedOrder,
    ) {
        harness.executor.handle_match_found(match_id, buy, sell).await.unwrap();

        // On the current-thread test runtime the spawned task cannot run
        // until this task yields, so subscribing here still precedes the
        // task's first publish
        let mut reader = harness.bus.subscribe(MATCH_LIFECYCLE_TOPIC.to_string());
        await_confirmed(&mut reader).await;
    }

    /// Tests driving a discovered match through proving and submission
    #[tokio::test]
    async fn test_match_found_runs_to_confirmed() {
        let harness = harness();
        MockProofManager::start(harness.proof_recv.clone());

        let (buy, sell) = crossing_legs();
        activate_legs(&harness.client, &buy, &sell).await;
        let match_id = insert_match(&harness.match_index, &buy, &sell).await;

        confirm_match(&harness, match_id, buy, sell).await;

        let record = harness.match_index.get(&match_id).await.unwrap();
        assert_eq!(record.status, MatchStatus::Confirmed);
        assert!(record.proof.is_some());
        assert!(record.calldata.is_some());
        assert_eq!(record.ledger_match_id, Some(0));

        let status = harness.client.get_order_status(record.buy_commitment).await.unwrap();
        assert_eq!(status, OrderStatus::Matched);
    }

    /// Tests that unusable private terms fail the match without a proof
    /// dispatch
    #[tokio::test]
    async fn test_mismatched_legs_fail_without_proving() {
        let harness = harness();
        let (buy, sell) = crossing_legs();
        let match_id = insert_match(&harness.match_index, &buy, &sell).await;

        // Break the binding between the buy leg's terms and its commitment
        let mut tampered = buy;
        tampered.terms.price += 2;
        harness.executor.handle_match_found(match_id, tampered, sell).await.unwrap();

        let record = harness.match_index.get(&match_id).await.unwrap();
        let MatchStatus::Failed { reason } = record.status else {
            panic!("expected the match to fail");
        };
        assert_eq!(reason, "private terms missing for the match legs");

        // No proof job reached the queue
        assert!(harness.proof_recv.try_recv().is_err());
    }

    /// Tests that a rediscovered match does not spawn a second pipeline
    #[tokio::test]
    async fn test_rediscovered_match_skipped() {
        let harness = harness();
        MockProofManager::start(harness.proof_recv.clone());

        let (buy, sell) = crossing_legs();
        activate_legs(&harness.client, &buy, &sell).await;
        let match_id = insert_match(&harness.match_index, &buy, &sell).await;
        confirm_match(&harness, match_id, buy.clone(), sell.clone()).await;

        // A duplicate discovery is ignored; the record stays confirmed
        harness.executor.handle_match_found(match_id, buy, sell).await.unwrap();
        let record = harness.match_index.get(&match_id).await.unwrap();
        assert_eq!(record.status, MatchStatus::Confirmed);
    }

    /// Tests the payload path: recording, readiness, and settlement
    #[tokio::test]
    async fn test_payload_flow_settles() {
        let harness = harness();
        MockProofManager::start(harness.proof_recv.clone());

        let (buy, sell) = crossing_legs();
        activate_legs(&harness.client, &buy, &sell).await;
        let match_id = insert_match(&harness.match_index, &buy, &sell).await;
        confirm_match(&harness, match_id, buy, sell).await;

        // The buyer's payload alone does not ready the match
        let (response, recv) = new_response_channel();
        harness
            .executor
            .handle_payload_received(match_id, SettlementRole::Buyer, payload(3), response)
            .await
            .unwrap();
        assert!(!recv.await.unwrap().unwrap());

        // The seller's payload completes the pair and spawns settlement
        let (response, recv) = new_response_channel();
        harness
            .executor
            .handle_payload_received(match_id, SettlementRole::Seller, payload(4), response)
            .await
            .unwrap();
        assert!(recv.await.unwrap().unwrap());

        let mut reader = harness.bus.subscribe(MATCH_LIFECYCLE_TOPIC.to_string());
        await_settled(&mut reader).await;

        let record = harness.match_index.get(&match_id).await.unwrap();
        assert_eq!(record.status, MatchStatus::Settled);

        let ledger_record = harness.client.get_match_record(0).await.unwrap().unwrap();
        assert!(ledger_record.settled);
    }

    /// Tests that payloads are refused while the match is not confirmed
    #[tokio::test]
    async fn test_payload_rejected_before_confirmation() {
        let harness = harness();
        let (buy, sell) = crossing_legs();
        let match_id = insert_match(&harness.match_index, &buy, &sell).await;

        let (response, recv) = new_response_channel();
        harness
            .executor
            .handle_payload_received(match_id, SettlementRole::Buyer, payload(3), response)
            .await
            .unwrap();

        let err = recv.await.unwrap().unwrap_err();
        assert!(matches!(err, MatchIndexError::NotAwaitingPayloads { .. }));

        let record = harness.match_index.get(&match_id).await.unwrap();
        assert_eq!(record.status, MatchStatus::PendingProof);
    }
}
