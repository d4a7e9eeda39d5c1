//! Defines the threading model of the matching engine as a worker that can
//! be scheduled by the coordinator thread

use std::thread::{Builder, JoinHandle};

use async_trait::async_trait;
use common::{
    default_wrapper::{DefaultOption, default_option},
    types::CancelChannel,
    worker::Worker,
};
use darkpool_client::DarkpoolClient;
use job_types::{
    match_orchestrator::OrchestratorQueue, matching_engine::MatchingEngineReceiver,
    proof_manager::ProofManagerQueue,
};
use state::{MatchIndex, SharedOrderBook};
use tokio::runtime::Builder as RuntimeBuilder;
use tracing::info;

use crate::{error::MatchingEngineError, executor::MatchingEngineExecutor};

/// The name of the main executor thread
const MAIN_THREAD_NAME: &str = "matching-engine-main";

/// The configuration of the matching engine
pub struct MatchingEngineConfig<C: DarkpoolClient> {
    /// The job queue on which to receive engine jobs
    pub job_queue: MatchingEngineReceiver,
    /// The shared handle to the resting order book
    pub book: SharedOrderBook,
    /// The shared index of match records
    pub match_index: MatchIndex,
    /// The work queue of the proof manager
    pub proof_queue: ProofManagerQueue,
    /// The job queue of the match orchestrator
    pub orchestrator_queue: OrchestratorQueue,
    /// The client for ledger submissions
    pub darkpool_client: C,
    /// The channel on which the coordinator signals shutdown
    pub cancel_channel: CancelChannel,
}

/// The worker wrapper around the matching engine's executor loop
pub struct MatchingEngine<C: DarkpoolClient> {
    /// The executor, held until the main thread takes ownership
    executor: DefaultOption<MatchingEngineExecutor<C>>,
    /// The handle of the main executor thread
    join_handle: DefaultOption<JoinHandle<MatchingEngineError>>,
}

#[async_trait]
impl<C: DarkpoolClient> Worker for MatchingEngine<C> {
    type WorkerConfig = MatchingEngineConfig<C>;
    type Error = MatchingEngineError;

    async fn new(config: Self::WorkerConfig) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let executor = MatchingEngineExecutor::new(
            config.job_queue,
            config.book,
            config.match_index,
            config.proof_queue,
            config.orchestrator_queue,
            config.darkpool_client,
            config.cancel_channel,
        );

        Ok(Self { executor: default_option(executor), join_handle: DefaultOption::default() })
    }

    fn name(&self) -> String {
        "matching-engine".to_string()
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        info!("starting matching engine executor...");
        let executor = self
            .executor
            .take()
            .ok_or_else(|| MatchingEngineError::Setup("executor already taken".to_string()))?;

        let handle = Builder::new()
            .name(MAIN_THREAD_NAME.to_string())
            .spawn(move || {
                // Build a Tokio runtime for the executor loop
                let runtime = RuntimeBuilder::new_multi_thread().enable_all().build().unwrap();
                runtime.block_on(executor.execution_loop())
            })
            .map_err(|err| MatchingEngineError::Setup(err.to_string()))?;

        self.join_handle.replace(Some(handle));
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn join(&mut self) -> Vec<JoinHandle<Self::Error>> {
        vec![self.join_handle.take().unwrap()]
    }
}
