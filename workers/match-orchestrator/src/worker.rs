//! Defines the threading model of the match orchestrator as a worker that
//! can be scheduled by the coordinator thread

use std::thread::{Builder, JoinHandle};

use async_trait::async_trait;
use common::{
    default_wrapper::{DefaultOption, default_option},
    types::CancelChannel,
    worker::Worker,
};
use darkpool_client::DarkpoolClient;
use external_api::bus_message::SystemBusMessage;
use job_types::{match_orchestrator::OrchestratorReceiver, proof_manager::ProofManagerQueue};
use state::MatchIndex;
use system_bus::SystemBus;
use task_driver::driver::TaskDriver;
use tokio::runtime::Builder as RuntimeBuilder;
use tracing::info;

use crate::{error::MatchOrchestratorError, executor::MatchOrchestratorExecutor};

/// The name of the main executor thread
const MAIN_THREAD_NAME: &str = "match-orchestrator-main";

/// The configuration of the match orchestrator
pub struct MatchOrchestratorConfig<C: DarkpoolClient> {
    /// The job queue on which to receive orchestrator jobs
    pub job_queue: OrchestratorReceiver,
    /// The shared index of match records
    pub match_index: MatchIndex,
    /// The work queue of the proof manager
    pub proof_queue: ProofManagerQueue,
    /// The client for ledger submissions
    pub darkpool_client: C,
    /// The system bus tasks publish lifecycle events on
    pub system_bus: SystemBus<SystemBusMessage>,
    /// The channel on which the coordinator signals shutdown
    pub cancel_channel: CancelChannel,
}

/// The worker wrapper around the match orchestrator's executor loop
pub struct MatchOrchestrator<C: DarkpoolClient> {
    /// The executor, held until the main thread takes ownership
    executor: DefaultOption<MatchOrchestratorExecutor<C>>,
    /// The handle of the main executor thread
    join_handle: DefaultOption<JoinHandle<MatchOrchestratorError>>,
}

#[async_trait]
impl<C: DarkpoolClient> Worker for MatchOrchestrator<C> {
    type WorkerConfig = MatchOrchestratorConfig<C>;
    type Error = MatchOrchestratorError;

    async fn new(config: Self::WorkerConfig) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let executor = MatchOrchestratorExecutor::new(
            config.job_queue,
            config.match_index,
            config.proof_queue,
            config.darkpool_client,
            TaskDriver::new(config.system_bus),
            config.cancel_channel,
        );

        Ok(Self { executor: default_option(executor), join_handle: DefaultOption::default() })
    }

    fn name(&self) -> String {
        "match-orchestrator".to_string()
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        info!("starting match orchestrator executor...");
        let executor = self
            .executor
            .take()
            .ok_or_else(|| MatchOrchestratorError::Setup("executor already taken".to_string()))?;

        let handle = Builder::new()
            .name(MAIN_THREAD_NAME.to_string())
            .spawn(move || {
                // Build a Tokio runtime for the executor loop; the per-match
                // tasks it spawns run on the same runtime
                let runtime = RuntimeBuilder::new_multi_thread().enable_all().build().unwrap();
                runtime.block_on(executor.execution_loop())
            })
            .map_err(|err| MatchOrchestratorError::Setup(err.to_string()))?;

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
