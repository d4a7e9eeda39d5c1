//! Defines mock node methods for integration testing

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::missing_docs_in_private_items)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::needless_pass_by_ref_mut)]

use std::mem;

use api_server::{ApiServer, ApiServerConfig};
use chain_events::{ChainEventsConfig, ChainEventsListener};
use common::{
    default_wrapper::{DefaultOption, default_option},
    types::{CancelChannel, new_cancel_channel},
    worker::Worker,
};
use config::NodeConfig;
use darkpool_client::EmbeddedDarkpool;
use external_api::bus_message::SystemBusMessage;
use eyre::Result;
use futures::Future;
use job_types::{
    chain_events::{ChainEventsJob, ChainEventsQueue, ChainEventsReceiver, new_chain_events_queue},
    match_orchestrator::{
        OrchestratorJob, OrchestratorQueue, OrchestratorReceiver, new_orchestrator_queue,
    },
    matching_engine::{
        MatchingEngineJob, MatchingEngineQueue, MatchingEngineReceiver, new_matching_engine_queue,
    },
    proof_manager::{
        ProofManagerJob, ProofManagerQueue, ProofManagerReceiver, new_proof_manager_queue,
    },
};
use match_orchestrator::{MatchOrchestrator, MatchOrchestratorConfig};
use matching_engine::{MatchingEngine, MatchingEngineConfig};
use proof_manager::{ProofManagerConfig, ProofManagerWorker, mock::MockProofManager};
use reqwest::{Client, Method, Response, header::HeaderMap};
use serde::{Serialize, de::DeserializeOwned};
use state::{MatchIndex, SharedOrderBook};
use system_bus::SystemBus;
use tokio::runtime::Handle;

/// A helper that blocks the calling thread on a future
///
/// We use this to give a synchronous mock node api, which emits a convenient
/// builder pattern
fn run_fut<F>(fut: F) -> F::Output
where
    F: Future,
{
    Handle::current().block_on(fut)
}

/// Build a cancel channel whose sender is never dropped
///
/// Mock node workers are never cancelled, so the sender is forgotten to keep
/// the channel open for the life of the process
fn mock_cancel() -> CancelChannel {
    let (send, recv) = new_cancel_channel();
    mem::forget(send);

    recv
}

/// The mock node struct, used to build testing nodes
///
/// We store both ends of the queue for each worker because:
///   1. Storing the sender allows testing code to send messages to the worker
///      directly
///   2. Storing the receiver prevents the receiver from being dropped, which
///      would close the channel. We want the channel to remain open even if no
///      worker is listening
///
/// The receiver end of each queue is stored in a `DefaultOption` so that
/// if/when a worker is spawned for that queue they may take ownership of the
/// receiver.
pub struct MockNodeController {
    /// The node's config
    config: NodeConfig,

    // --- Shared Handles --- //
    /// The client over the embedded ledger
    darkpool_client: EmbeddedDarkpool,
    /// The system bus
    bus: SystemBus<SystemBusMessage>,
    /// The shared handle to the resting order book
    book: SharedOrderBook,
    /// The shared index of match records
    match_index: MatchIndex,
    /// HTTP client for API requests
    http_client: Client,

    // --- Worker Queues --- //
    /// The matching engine's queue
    matching_engine_queue: (MatchingEngineQueue, DefaultOption<MatchingEngineReceiver>),
    /// The match orchestrator's queue
    orchestrator_queue: (OrchestratorQueue, DefaultOption<OrchestratorReceiver>),
    /// The proof generation queue
    proof_queue: (ProofManagerQueue, DefaultOption<ProofManagerReceiver>),
    /// The chain events queue
    chain_events_queue: (ChainEventsQueue, DefaultOption<ChainEventsReceiver>),
}

/// All methods use a builder pattern to allow chained construction
impl MockNodeController {
    /// Constructor
    pub fn new(config: NodeConfig) -> Self {
        let bus = SystemBus::new();
        let darkpool_client = EmbeddedDarkpool::new();
        let book = SharedOrderBook::new(bus.clone());
        let match_index = MatchIndex::new(bus.clone());
        let (matching_sender, matching_recv) = new_matching_engine_queue();
        let (orchestrator_sender, orchestrator_recv) = new_orchestrator_queue();
        let (proof_sender, proof_recv) = new_proof_manager_queue();
        let (chain_sender, chain_recv) = new_chain_events_queue();

        Self {
            config,
            darkpool_client,
            bus,
            book,
            match_index,
            http_client: Client::new(),
            matching_engine_queue: (matching_sender, default_option(matching_recv)),
            orchestrator_queue: (orchestrator_sender, default_option(orchestrator_recv)),
            proof_queue: (proof_sender, default_option(proof_recv)),
            chain_events_queue: (chain_sender, default_option(chain_recv)),
        }
    }

    // -----------
    // | Getters |
    // -----------

    /// Get a copy of the node config
    pub fn config(&self) -> NodeConfig {
        self.config.clone()
    }

    /// Get a handle to the embedded darkpool client
    pub fn darkpool_client(&self) -> EmbeddedDarkpool {
        self.darkpool_client.clone()
    }

    /// Get a copy of the system bus
    pub fn bus(&self) -> SystemBus<SystemBusMessage> {
        self.bus.clone()
    }

    /// Get a handle to the shared order book
    pub fn book(&self) -> SharedOrderBook {
        self.book.clone()
    }

    /// Get a handle to the shared match index
    pub fn match_index(&self) -> MatchIndex {
        self.match_index.clone()
    }

    // -----------------
    // | Worker Queues |
    // -----------------

    /// Send an API request to the mock node
    #[allow(clippy::needless_pass_by_value)]
    pub async fn send_api_req<B: Serialize, R: DeserializeOwned>(
        &self,
        route: &str,
        method: Method,
        headers: HeaderMap,
        body: B,
    ) -> Result<R> {
        let resp = self.send_api_req_raw(route, method, headers, body).await?;
        if resp.status().is_success() {
            resp.json().await.map_err(|e| eyre::eyre!(e))
        } else {
            Err(eyre::eyre!("Request failed with status: {}", resp.status()))
        }
    }

    /// Send an API request to the mock node and return the raw response
    pub async fn send_api_req_raw<B: Serialize>(
        &self,
        route: &str,
        method: Method,
        headers: HeaderMap,
        body: B,
    ) -> Result<Response> {
        let client = &self.http_client;
        let url = format!("http://localhost:{}{}", self.config.http_port, route);

        match method {
            Method::GET => {
                client.get(url).headers(headers).send().await.map_err(|e| eyre::eyre!(e))
            },
            Method::POST => client
                .post(url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .map_err(|e| eyre::eyre!(e)),
            _ => eyre::bail!("Unsupported method"),
        }
    }

    /// Send a job to the matching engine
    pub fn send_matching_engine_job(&self, job: MatchingEngineJob) -> Result<()> {
        self.matching_engine_queue.0.send(job).map_err(|e| eyre::eyre!(e))
    }

    /// Send a job to the match orchestrator
    pub fn send_orchestrator_job(&self, job: OrchestratorJob) -> Result<()> {
        self.orchestrator_queue.0.send(job).map_err(|e| eyre::eyre!(e))
    }

    /// Send a job to the proof manager
    pub fn send_proof_job(&self, job: ProofManagerJob) -> Result<()> {
        self.proof_queue.0.send(job).map_err(|e| eyre::eyre!(e))
    }

    /// Send a job to the chain events listener
    pub fn send_chain_events_job(&self, job: ChainEventsJob) -> Result<()> {
        self.chain_events_queue.0.send(job).map_err(|e| eyre::eyre!(e))
    }

    // -------------------
    // | Builder Methods |
    // -------------------

    /// Add a matching engine to the mock node
    pub fn with_matching_engine(mut self) -> Self {
        let job_queue = self.matching_engine_queue.1.take().unwrap();
        let conf = MatchingEngineConfig {
            job_queue,
            book: self.book.clone(),
            match_index: self.match_index.clone(),
            proof_queue: self.proof_queue.0.clone(),
            orchestrator_queue: self.orchestrator_queue.0.clone(),
            darkpool_client: self.darkpool_client.clone(),
            cancel_channel: mock_cancel(),
        };

        let mut engine =
            run_fut(MatchingEngine::new(conf)).expect("Failed to create matching engine");
        engine.start().expect("Failed to start matching engine");

        self
    }

    /// Add a match orchestrator to the mock node
    pub fn with_match_orchestrator(mut self) -> Self {
        let job_queue = self.orchestrator_queue.1.take().unwrap();
        let conf = MatchOrchestratorConfig {
            job_queue,
            match_index: self.match_index.clone(),
            proof_queue: self.proof_queue.0.clone(),
            darkpool_client: self.darkpool_client.clone(),
            system_bus: self.bus.clone(),
            cancel_channel: mock_cancel(),
        };

        let mut orchestrator =
            run_fut(MatchOrchestrator::new(conf)).expect("Failed to create match orchestrator");
        orchestrator.start().expect("Failed to start match orchestrator");

        self
    }

    /// Add a proof manager to the mock node
    pub fn with_proof_manager(mut self) -> Self {
        let job_queue = self.proof_queue.1.take().unwrap();
        let conf = ProofManagerConfig {
            job_queue,
            num_threads: self.config.proof_threads,
            cancel_channel: mock_cancel(),
        };

        let mut manager =
            run_fut(ProofManagerWorker::new(conf)).expect("Failed to create proof manager");
        manager.start().expect("Failed to start proof manager");

        self
    }

    /// Add a mock proof manager that attests to every job without evaluating
    /// its statement
    pub fn with_mock_proof_manager(mut self) -> Self {
        let job_queue = self.proof_queue.1.take().unwrap();
        MockProofManager::start(job_queue);

        self
    }

    /// Add a chain events listener to the mock node
    pub fn with_chain_events(mut self) -> Self {
        let job_queue = self.chain_events_queue.1.take().unwrap();
        let conf = ChainEventsConfig {
            job_queue,
            darkpool_client: self.darkpool_client.clone(),
            system_bus: self.bus.clone(),
            cancel_channel: mock_cancel(),
        };

        let mut listener = run_fut(ChainEventsListener::new(conf))
            .expect("Failed to create chain events listener");
        listener.start().expect("Failed to start chain events listener");

        self
    }

    /// Add an API server to the mock node
    pub fn with_api_server(self) -> Self {
        let config = &self.config;
        let conf = ApiServerConfig {
            bind_addr: config.bind_addr,
            http_port: config.http_port,
            matching_engine_queue: self.matching_engine_queue.0.clone(),
            orchestrator_queue: self.orchestrator_queue.0.clone(),
            book: self.book.clone(),
            match_index: self.match_index.clone(),
            darkpool_client: self.darkpool_client.clone(),
            cancel_channel: mock_cancel(),
        };

        let mut server = run_fut(ApiServer::new(conf)).expect("Failed to create API server");
        server.start().expect("Failed to start API server");

        // Forget the server to avoid dropping it and its runtime
        mem::forget(server);
        self
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        order::{OrderSide, OrderTerms},
        order_validity::{OrderValidityStatement, OrderValidityWitness},
        proof::CircuitId,
    };
    use config::NodeConfig;
    use job_types::proof_manager::{ProofJob, new_proof_job};
    use rand::thread_rng;
    use tokio::runtime::Builder as RuntimeBuilder;

    use super::MockNodeController;

    /// Tests a proof job sent through the controller to a mock prover
    #[test]
    fn test_mock_proof_manager() {
        let runtime = RuntimeBuilder::new_multi_thread().enable_all().build().unwrap();
        let _guard = runtime.enter();

        let node = MockNodeController::new(NodeConfig::default()).with_mock_proof_manager();

        runtime.block_on(async move {
            let mut rng = thread_rng();
            let terms = OrderTerms {
                side: OrderSide::Buy,
                price: 1000,
                amount: 500,
                nonce: Scalar::random(&mut rng),
            };
            let statement = OrderValidityStatement { commitment: terms.compute_commitment() };
            let witness = OrderValidityWitness { terms };

            let (job, response) = new_proof_job(ProofJob::OrderValidity { statement, witness });
            node.send_proof_job(job).unwrap();

            let bundle = response.await.unwrap().unwrap();
            assert_eq!(bundle.circuit, CircuitId::OrderValidity);
        });
    }
}
