//! The entrypoint to the duskpool node; starts the coordinator thread which
//! manages all other worker threads

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use std::{error::Error, time::Duration};

use api_server::{ApiServer, ApiServerConfig};
use chain_events::{ChainEventsConfig, ChainEventsListener};
use common::{
    types::new_cancel_channel,
    worker::{Worker, new_worker_failure_channel, watch_worker},
};
use config::parse_command_line_args;
use darkpool_client::EmbeddedDarkpool;
use job_types::{
    chain_events::{ChainEventsJob, new_chain_events_queue},
    match_orchestrator::new_orchestrator_queue,
    matching_engine::{MatchingEngineJob, new_matching_engine_queue},
    proof_manager::new_proof_manager_queue,
};
use match_orchestrator::{MatchOrchestrator, MatchOrchestratorConfig};
use matching_engine::{MatchingEngine, MatchingEngineConfig};
use proof_manager::{ProofManagerConfig, ProofManagerWorker};
use state::{MatchIndex, SharedOrderBook};
use system_bus::SystemBus;
use system_clock::SystemClock;
use tracing::{error, info};

/// The name of the timer that triggers matching cycles
const MATCHING_CYCLE_TIMER: &str = "matching-cycle";
/// The name of the timer that triggers ledger event polls
const CHAIN_POLL_TIMER: &str = "chain-poll";

/// The entrypoint to the node's execution
///
/// At a high level, this method begins a coordinator thread that:
///     1. Allocates resources and starts up workers
///     2. Watches worker threads for panics and errors
///     3. Cleans up and recovers any failed workers that are recoverable
///
/// The general flow for allocating a worker's resources is:
///     1. Allocate any communication primitives the worker needs access to
///        (job queues, global bus, etc)
///     2. Build a cancel channel that the coordinator can use to cancel
///        worker execution
///     3. Allocate and start the worker's execution
///     4. Allocate a thread to monitor the worker for faults
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Parse command line arguments
    let config = parse_command_line_args().expect("error parsing command line args");
    config.configure_telemetry();
    info!(
        "node running with\n\t version: {}\n\t port: {}",
        env!("CARGO_PKG_VERSION"),
        config.http_port
    );

    // Construct the ledger client and the shared stores
    let system_bus = SystemBus::new();
    let darkpool_client = EmbeddedDarkpool::new();
    let book = SharedOrderBook::new(system_bus.clone());
    let match_index = MatchIndex::new(system_bus.clone());

    // Build communication primitives
    let (matching_engine_queue, matching_engine_receiver) = new_matching_engine_queue();
    let (orchestrator_queue, orchestrator_receiver) = new_orchestrator_queue();
    let (proof_queue, proof_receiver) = new_proof_manager_queue();
    let (chain_events_queue, chain_events_receiver) = new_chain_events_queue();

    // Start the proof manager
    let (_proof_cancel_sender, proof_cancel_receiver) = new_cancel_channel();
    let mut proof_manager = ProofManagerWorker::new(ProofManagerConfig {
        job_queue: proof_receiver,
        num_threads: config.proof_threads,
        cancel_channel: proof_cancel_receiver,
    })
    .await
    .expect("failed to build proof manager");
    proof_manager.start().expect("failed to start proof manager");

    let (proof_failure_sender, mut proof_failure_receiver) = new_worker_failure_channel();
    watch_worker::<ProofManagerWorker>(&mut proof_manager, &proof_failure_sender);

    // Start the match orchestrator
    let (_orchestrator_cancel_sender, orchestrator_cancel_receiver) = new_cancel_channel();
    let mut match_orchestrator = MatchOrchestrator::new(MatchOrchestratorConfig {
        job_queue: orchestrator_receiver,
        match_index: match_index.clone(),
        proof_queue: proof_queue.clone(),
        darkpool_client: darkpool_client.clone(),
        system_bus: system_bus.clone(),
        cancel_channel: orchestrator_cancel_receiver,
    })
    .await
    .expect("failed to build match orchestrator");
    match_orchestrator.start().expect("failed to start match orchestrator");

    let (orchestrator_failure_sender, mut orchestrator_failure_receiver) =
        new_worker_failure_channel();
    watch_worker::<MatchOrchestrator<EmbeddedDarkpool>>(
        &mut match_orchestrator,
        &orchestrator_failure_sender,
    );

    // Start the matching engine
    let (_matching_cancel_sender, matching_cancel_receiver) = new_cancel_channel();
    let mut matching_engine = MatchingEngine::new(MatchingEngineConfig {
        job_queue: matching_engine_receiver,
        book: book.clone(),
        match_index: match_index.clone(),
        proof_queue: proof_queue.clone(),
        orchestrator_queue: orchestrator_queue.clone(),
        darkpool_client: darkpool_client.clone(),
        cancel_channel: matching_cancel_receiver,
    })
    .await
    .expect("failed to build matching engine");
    matching_engine.start().expect("failed to start matching engine");

    let (matching_failure_sender, mut matching_failure_receiver) = new_worker_failure_channel();
    watch_worker::<MatchingEngine<EmbeddedDarkpool>>(
        &mut matching_engine,
        &matching_failure_sender,
    );

    // Start the chain events listener
    let (_chain_cancel_sender, chain_cancel_receiver) = new_cancel_channel();
    let mut chain_events = ChainEventsListener::new(ChainEventsConfig {
        job_queue: chain_events_receiver,
        darkpool_client: darkpool_client.clone(),
        system_bus: system_bus.clone(),
        cancel_channel: chain_cancel_receiver,
    })
    .await
    .expect("failed to build chain events listener");
    chain_events.start().expect("failed to start chain events listener");

    let (chain_failure_sender, mut chain_failure_receiver) = new_worker_failure_channel();
    watch_worker::<ChainEventsListener<EmbeddedDarkpool>>(&mut chain_events, &chain_failure_sender);

    // Start the api server
    let (_api_cancel_sender, api_cancel_receiver) = new_cancel_channel();
    let mut api_server = ApiServer::new(ApiServerConfig {
        bind_addr: config.bind_addr,
        http_port: config.http_port,
        matching_engine_queue: matching_engine_queue.clone(),
        orchestrator_queue: orchestrator_queue.clone(),
        book: book.clone(),
        match_index: match_index.clone(),
        darkpool_client: darkpool_client.clone(),
        cancel_channel: api_cancel_receiver,
    })
    .await
    .expect("failed to build api server");
    api_server.start().expect("failed to start api server");

    let (api_failure_sender, mut api_failure_receiver) = new_worker_failure_channel();
    watch_worker::<ApiServer<EmbeddedDarkpool>>(&mut api_server, &api_failure_sender);

    // Register the periodic jobs that drive matching and ledger polling
    let clock = SystemClock::new().await;
    clock
        .add_timer(
            MATCHING_CYCLE_TIMER.to_string(),
            Duration::from_secs(config.matching_interval),
            move || {
                matching_engine_queue
                    .send(MatchingEngineJob::ExecuteMatchingCycle)
                    .map_err(|err| err.to_string())
            },
        )
        .await
        .expect("failed to register matching cycle timer");

    clock
        .add_timer(
            CHAIN_POLL_TIMER.to_string(),
            Duration::from_secs(config.chain_poll_interval),
            move || {
                chain_events_queue.send(ChainEventsJob::PollEvents).map_err(|err| err.to_string())
            },
        )
        .await
        .expect("failed to register chain poll timer");

    // Await worker failures; recover those that are recoverable and exit on
    // any that is not
    loop {
        tokio::select! {
            _ = proof_failure_receiver.recv() => {
                return Err("proof manager failed".into());
            },
            _ = orchestrator_failure_receiver.recv() => {
                return Err("match orchestrator failed".into());
            },
            _ = matching_failure_receiver.recv() => {
                return Err("matching engine failed".into());
            },
            _ = chain_failure_receiver.recv() => {
                return Err("chain events listener failed".into());
            },
            _ = api_failure_receiver.recv() => {
                if !api_server.is_recoverable() {
                    return Err("api server failed".into());
                }

                error!("api server failed, recovering...");
                api_server.cleanup().expect("failed to cleanup api server");
                api_server = api_server.recover();
                api_server.start().expect("failed to restart api server");

                let (failure_sender, failure_receiver) = new_worker_failure_channel();
                watch_worker::<ApiServer<EmbeddedDarkpool>>(&mut api_server, &failure_sender);
                api_failure_receiver = failure_receiver;
            },
        }
    }
}
