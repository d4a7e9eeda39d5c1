//! Defines the main threading model of the proof generation module as a
//! worker that can be scheduled by the coordinator thread

use std::{
    sync::Arc,
    thread::{Builder, JoinHandle},
};

use async_trait::async_trait;
use common::{
    default_wrapper::{DefaultOption, default_option},
    types::CancelChannel,
    worker::Worker,
};
use job_types::proof_manager::ProofManagerReceiver;
use rayon::ThreadPoolBuilder;

use crate::{error::ProofManagerError, proof_manager::ProofManager};

/// The name of the main worker thread
const MAIN_THREAD_NAME: &str = "proof-generation-main";

/// The configuration of the proof manager, holding its work queue and cancel
/// channel
pub struct ProofManagerConfig {
    /// The job queue on which the manager may receive proof generation jobs
    pub job_queue: ProofManagerReceiver,
    /// The number of threads in the proving pool
    pub num_threads: usize,
    /// The channel on which the coordinator signals shutdown
    pub cancel_channel: CancelChannel,
}

/// The worker wrapper around the proof generation loop
pub struct ProofManagerWorker {
    /// The job queue, held until the main thread takes ownership
    job_queue: DefaultOption<ProofManagerReceiver>,
    /// The number of threads in the proving pool
    num_threads: usize,
    /// The cancel channel the coordinator signals shutdown on
    cancel_channel: CancelChannel,
    /// The handle of the main driver thread
    join_handle: DefaultOption<JoinHandle<ProofManagerError>>,
}

#[async_trait]
impl Worker for ProofManagerWorker {
    type WorkerConfig = ProofManagerConfig;
    type Error = ProofManagerError;

    async fn new(config: Self::WorkerConfig) -> Result<Self, Self::Error>
    where
        Self: Sized,
    {
        Ok(Self {
            job_queue: default_option(config.job_queue),
            num_threads: config.num_threads,
            cancel_channel: config.cancel_channel,
            join_handle: DefaultOption::default(),
        })
    }

    fn name(&self) -> String {
        "proof-generation".to_string()
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn start(&mut self) -> Result<(), Self::Error> {
        let job_queue = self
            .job_queue
            .take()
            .ok_or_else(|| ProofManagerError::Setup("job queue already taken".to_string()))?;
        let cancel_channel = self.cancel_channel.clone();

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("proof-gen-{i}"))
            .build()
            .map_err(|err| ProofManagerError::Setup(err.to_string()))?;
        let thread_pool = Arc::new(thread_pool);

        // The execution loop only returns on error; the thread yields that
        // error to the watcher
        let handle = Builder::new()
            .name(MAIN_THREAD_NAME.to_string())
            .spawn(move || {
                ProofManager::execution_loop(job_queue, thread_pool, cancel_channel).err().unwrap()
            })
            .map_err(|err| ProofManagerError::Setup(err.to_string()))?;

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

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        order::{OrderSide, OrderTerms},
        order_validity::{OrderValidityStatement, OrderValidityWitness},
        proof::CircuitId,
    };
    use common::{types::new_cancel_channel, worker::Worker};
    use job_types::proof_manager::{ProofJob, new_proof_job, new_proof_manager_queue};
    use rand::thread_rng;

    use super::{ProofManagerConfig, ProofManagerWorker};

    /// Tests proving through a running worker end to end
    #[tokio::test]
    async fn test_worker_round_trip() {
        let (queue, receiver) = new_proof_manager_queue();
        let (_cancel_sender, cancel_channel) = new_cancel_channel();

        let config =
            ProofManagerConfig { job_queue: receiver, num_threads: 2, cancel_channel };
        let mut worker = ProofManagerWorker::new(config).await.unwrap();
        worker.start().unwrap();

        let mut rng = thread_rng();
        let order = OrderTerms {
            side: OrderSide::Sell,
            price: 900,
            amount: 600,
            nonce: Scalar::random(&mut rng),
        };
        let statement = OrderValidityStatement { commitment: order.compute_commitment() };
        let witness = OrderValidityWitness { terms: order };

        let (job, response) = new_proof_job(ProofJob::OrderValidity { statement, witness });
        queue.send(job).unwrap();

        let bundle = response.await.unwrap().unwrap();
        assert_eq!(bundle.circuit, CircuitId::OrderValidity);
        assert_eq!(bundle.public_signals, statement.to_public_signals());
    }
}
