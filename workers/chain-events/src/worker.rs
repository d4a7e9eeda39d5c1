//! Defines the threading model of the ledger event poller as a worker that
//! can be scheduled by the coordinator thread

use std::thread::{Builder, JoinHandle};

use async_trait::async_trait;
use common::{
    default_wrapper::{DefaultOption, default_option},
    worker::Worker,
};
use darkpool_client::DarkpoolClient;
use tokio::runtime::Builder as RuntimeBuilder;
use tracing::info;

use crate::{
    error::ChainEventsError,
    listener::{ChainEventsConfig, ChainEventsExecutor, ChainEventsListener},
};

/// The name of the main executor thread
const MAIN_THREAD_NAME: &str = "chain-events-main";

#[async_trait]
impl<C: DarkpoolClient> Worker for ChainEventsListener<C> {
    type WorkerConfig = ChainEventsConfig<C>;
    type Error = ChainEventsError;

    async fn new(config: Self::WorkerConfig) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        let executor = ChainEventsExecutor::new(config);
        Ok(Self { executor: default_option(executor), join_handle: DefaultOption::default() })
    }

    fn name(&self) -> String {
        "chain-events".to_string()
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        info!("starting chain events listener...");
        let executor = self
            .executor
            .take()
            .ok_or_else(|| ChainEventsError::Setup("executor already taken".to_string()))?;

        // The poller is light; a current thread runtime is enough
        let handle = Builder::new()
            .name(MAIN_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = RuntimeBuilder::new_current_thread().enable_all().build().unwrap();
                runtime.block_on(executor.execution_loop())
            })
            .map_err(|err| ChainEventsError::Setup(err.to_string()))?;

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
