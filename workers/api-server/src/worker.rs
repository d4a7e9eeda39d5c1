//! Defines the `Worker` implementation for the api server

use std::{
    net::IpAddr,
    thread::{self, JoinHandle},
};

use async_trait::async_trait;
use common::{
    default_wrapper::{DefaultOption, default_option},
    types::CancelChannel,
    worker::Worker,
};
use darkpool_client::DarkpoolClient;
use futures::executor::block_on;
use job_types::{match_orchestrator::OrchestratorQueue, matching_engine::MatchingEngineQueue};
use state::{MatchIndex, SharedOrderBook};
use tokio::{
    runtime::{Builder as TokioBuilder, Runtime},
    task::JoinHandle as TokioJoinHandle,
};

use crate::{error::ApiServerError, http::HttpServer};

/// The number of threads backing the HTTP server
const API_SERVER_NUM_THREADS: usize = 2;

/// The worker config for the api server
#[derive(Clone)]
pub struct ApiServerConfig<C: DarkpoolClient> {
    /// The address the HTTP server binds to
    pub bind_addr: IpAddr,
    /// The port the HTTP server listens on
    pub http_port: u16,
    /// The job queue of the matching engine, for order reveals and
    /// cancellations
    pub matching_engine_queue: MatchingEngineQueue,
    /// The job queue of the match orchestrator, for settlement payloads
    pub orchestrator_queue: OrchestratorQueue,
    /// The shared handle to the resting order book
    pub book: SharedOrderBook,
    /// The shared index of match records
    pub match_index: MatchIndex,
    /// The client on which to query ledger state
    pub darkpool_client: C,
    /// The channel on which the coordinator may send a cancel signal
    pub cancel_channel: CancelChannel,
}

/// The api server worker; owns the runtime its HTTP server runs on
pub struct ApiServer<C: DarkpoolClient> {
    /// The worker's config
    config: ApiServerConfig<C>,
    /// The join handle of the HTTP server's task
    http_server_join_handle: DefaultOption<TokioJoinHandle<ApiServerError>>,
    /// The runtime backing the HTTP server
    server_runtime: DefaultOption<Runtime>,
}

#[async_trait]
impl<C: DarkpoolClient> Worker for ApiServer<C> {
    type WorkerConfig = ApiServerConfig<C>;
    type Error = ApiServerError;

    async fn new(config: Self::WorkerConfig) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        Ok(Self {
            config,
            http_server_join_handle: DefaultOption::default(),
            server_runtime: DefaultOption::default(),
        })
    }

    fn name(&self) -> String {
        "api-server".to_string()
    }

    fn is_recoverable(&self) -> bool {
        // The server holds no state outside its config; a fresh instance may
        // be rebuilt from it
        true
    }

    fn recover(self) -> Self {
        Self {
            config: self.config,
            http_server_join_handle: DefaultOption::default(),
            server_runtime: DefaultOption::default(),
        }
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        // Build a runtime for the server, then spawn the server's loop on it
        // as a blocking task
        let tokio_runtime = TokioBuilder::new_multi_thread()
            .worker_threads(API_SERVER_NUM_THREADS)
            .enable_all()
            .build()
            .map_err(|err| ApiServerError::Setup(err.to_string()))?;

        let http_server = HttpServer::new(&self.config);
        let http_thread_handle = tokio_runtime.spawn_blocking(move || {
            // The serve loop only returns on failure
            let err = block_on(http_server.execution_loop()).err().unwrap();
            ApiServerError::HttpServerFailure(err.to_string())
        });

        self.http_server_join_handle = default_option(http_thread_handle);
        self.server_runtime = default_option(tokio_runtime);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), Self::Error> {
        drop(self.server_runtime.take());
        Ok(())
    }

    fn join(&mut self) -> Vec<JoinHandle<Self::Error>> {
        // Wrap the tokio join handle in a wrapper thread that the watcher can
        // join on
        let join_handle = self.http_server_join_handle.take().unwrap();
        let wrapper = thread::spawn(move || block_on(join_handle).unwrap());

        vec![wrapper]
    }
}
