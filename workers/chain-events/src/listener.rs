//! Defines the core implementation of the ledger event poller

use std::thread::JoinHandle;

use common::{
    default_wrapper::{DefaultOption, default_option},
    types::CancelChannel,
};
use darkpool_client::DarkpoolClient;
use external_api::bus_message::{LEDGER_EVENT_TOPIC, SystemBusMessage};
use job_types::chain_events::{ChainEventsJob, ChainEventsReceiver};
use system_bus::SystemBus;
use tracing::{debug, error, info};

use crate::error::ChainEventsError;

// -------------
// | Constants |
// -------------

/// The error message emitted when the job queue has already been taken
const ERR_QUEUE_TAKEN: &str = "job queue already taken";
/// The error message emitted when the job queue closes
const ERR_QUEUE_CLOSED: &str = "job queue closed";

// ----------
// | Worker |
// ----------

/// The configuration passed to the listener upon startup
pub struct ChainEventsConfig<C: DarkpoolClient> {
    /// The job queue on which the clock timer sends poll triggers
    pub job_queue: ChainEventsReceiver,
    /// The client for ledger queries
    pub darkpool_client: C,
    /// The bus on which observed events are republished
    pub system_bus: SystemBus<SystemBusMessage>,
    /// The channel on which the coordinator signals shutdown
    pub cancel_channel: CancelChannel,
}

/// The worker responsible for watching the ledger's event log and
/// republishing new entries on the system bus
pub struct ChainEventsListener<C: DarkpoolClient> {
    /// The executor, held until the main thread takes ownership
    pub(super) executor: DefaultOption<ChainEventsExecutor<C>>,
    /// The handle of the main executor thread
    pub(super) join_handle: DefaultOption<JoinHandle<ChainEventsError>>,
}

// ------------
// | Executor |
// ------------

/// The executor that runs in a thread and polls the ledger's event log
pub struct ChainEventsExecutor<C: DarkpoolClient> {
    /// The job queue on which to receive poll triggers
    job_queue: DefaultOption<ChainEventsReceiver>,
    /// The client for ledger queries
    darkpool_client: C,
    /// The bus on which observed events are republished
    system_bus: SystemBus<SystemBusMessage>,
    /// The first log index not yet observed
    next_index: u64,
    /// The channel on which the coordinator signals shutdown
    cancel_channel: CancelChannel,
}

impl<C: DarkpoolClient> ChainEventsExecutor<C> {
    /// Create a new executor with its cursor at the start of the log
    pub fn new(config: ChainEventsConfig<C>) -> Self {
        Self {
            job_queue: default_option(config.job_queue),
            darkpool_client: config.darkpool_client,
            system_bus: config.system_bus,
            next_index: 0,
            cancel_channel: config.cancel_channel,
        }
    }

    /// The main execution loop; runs until cancelled or the queue closes
    pub async fn execution_loop(mut self) -> ChainEventsError {
        info!("starting chain events executor loop");
        let mut job_queue = match self.job_queue.take() {
            Some(queue) => queue,
            None => return ChainEventsError::Setup(ERR_QUEUE_TAKEN.to_string()),
        };

        loop {
            tokio::select! {
                job = job_queue.recv() => {
                    match job {
                        Some(job) => self.handle_job(job).await,
                        None => {
                            return ChainEventsError::JobQueueClosed(ERR_QUEUE_CLOSED.to_string())
                        },
                    }
                },

                // Await cancellation by the coordinator
                _ = self.cancel_channel.changed() => {
                    info!("chain events listener received cancel signal, shutting down...");
                    return ChainEventsError::Cancelled("received cancel signal".to_string());
                }
            }
        }
    }

    /// Dispatch a job to its handler; a failed poll is logged and left for
    /// the next tick to retry
    async fn handle_job(&mut self, job: ChainEventsJob) {
        let res = match job {
            ChainEventsJob::PollEvents => self.poll_events().await,
        };

        if let Err(err) = res {
            error!("error handling chain events job: {err}");
        }
    }

    /// Poll the log and republish every event past the cursor
    ///
    /// The cursor advances per event, so a poll that fails midway resumes
    /// from the first unpublished entry rather than re-emitting
    async fn poll_events(&mut self) -> Result<(), ChainEventsError> {
        let events = self
            .darkpool_client
            .events_since(self.next_index)
            .await
            .map_err(|err| ChainEventsError::Ledger(err.to_string()))?;

        for event in events {
            debug!("observed ledger event at log index {}", event.index);
            self.next_index = event.index + 1;
            self.system_bus
                .publish(LEDGER_EVENT_TOPIC.to_string(), SystemBusMessage::LedgerEvent { event });
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use circuit_types::Scalar;
    use common::types::{ledger::LedgerEvent, new_cancel_channel};
    use darkpool_client::{DarkpoolClient, EmbeddedDarkpool};
    use external_api::bus_message::{LEDGER_EVENT_TOPIC, SystemBusMessage};
    use job_types::chain_events::new_chain_events_queue;
    use system_bus::SystemBus;

    use super::{ChainEventsConfig, ChainEventsExecutor};

    /// Create an executor wired to a fresh bus and embedded ledger
    fn harness()
    -> (ChainEventsExecutor<EmbeddedDarkpool>, SystemBus<SystemBusMessage>, EmbeddedDarkpool) {
        let bus: SystemBus<SystemBusMessage> = SystemBus::new();
        let client = EmbeddedDarkpool::new();
        let (_job_queue, job_recv) = new_chain_events_queue();
        let (_cancel_sender, cancel_channel) = new_cancel_channel();

        let executor = ChainEventsExecutor::new(ChainEventsConfig {
            job_queue: job_recv,
            darkpool_client: client.clone(),
            system_bus: bus.clone(),
            cancel_channel,
        });

        (executor, bus, client)
    }

    /// Tests that a poll republishes every new log entry in order
    #[tokio::test]
    async fn test_poll_publishes_new_events() {
        let (mut executor, bus, client) = harness();
        let first_leaf = Scalar::from(11u8);
        let second_leaf = Scalar::from(12u8);
        client.deposit(first_leaf).await.unwrap();
        client.deposit(second_leaf).await.unwrap();

        let mut reader = bus.subscribe(LEDGER_EVENT_TOPIC.to_string());
        executor.poll_events().await.unwrap();

        for (log_index, leaf) in [(0, first_leaf), (1, second_leaf)] {
            let SystemBusMessage::LedgerEvent { event } = reader.next_message().await else {
                panic!("expected a ledger event");
            };
            assert_eq!(event.index, log_index);

            let LedgerEvent::DepositInserted { leaf: observed, .. } = event.event else {
                panic!("expected a deposit event");
            };
            assert_eq!(observed, leaf);
        }
        assert_eq!(executor.next_index, 2);
    }

    /// Tests that the cursor skips entries observed by an earlier poll
    #[tokio::test]
    async fn test_poll_resumes_past_observed_events() {
        let (mut executor, bus, client) = harness();
        client.deposit(Scalar::from(1u8)).await.unwrap();
        executor.poll_events().await.unwrap();
        assert_eq!(executor.next_index, 1);

        // Only the deposit sequenced after the first poll should surface
        let new_leaf = Scalar::from(2u8);
        client.deposit(new_leaf).await.unwrap();
        let mut reader = bus.subscribe(LEDGER_EVENT_TOPIC.to_string());
        executor.poll_events().await.unwrap();

        let SystemBusMessage::LedgerEvent { event } = reader.next_message().await else {
            panic!("expected a ledger event");
        };
        assert_eq!(event.index, 1);
        assert_eq!(executor.next_index, 2);
    }

    /// Tests that polling an empty log leaves the cursor untouched
    #[tokio::test]
    async fn test_poll_empty_log() {
        let (mut executor, _bus, _client) = harness();
        executor.poll_events().await.unwrap();
        assert_eq!(executor.next_index, 0);
    }
}
