//! The matching engine executor, the single owner of the book and the vault
//!
//! Jobs are handled inline rather than spawned: a matching cycle must see
//! the book exactly as the preceding reveal or cancellation left it, and the
//! easiest way to guarantee that is to never interleave two jobs

use std::cmp::Ordering;

use circuit_types::{
    Scalar,
    errors::StatementError,
    match_validity::{MatchValidityStatement, MatchValidityWitness},
    order_validity::{OrderValidityStatement, OrderValidityWitness},
    proof::ProofBundle,
    settlement::SettlementTerms,
};
use common::{
    default_wrapper::{DefaultOption, default_option},
    types::{CancelChannel, TraderId, order::RevealedOrder, r#match::MatchResult},
};
use darkpool_client::DarkpoolClient;
use job_types::{
    ResponseSender,
    match_orchestrator::{OrchestratorJob, OrchestratorQueue},
    matching_engine::{
        CancelOrderResponse, MatchingEngineJob, MatchingEngineReceiver, PlaceOrderResponse,
    },
    proof_manager::{ProofJob, ProofManagerQueue, new_proof_job},
};
use state::{BookOrder, MatchIndex, OrderRejection, OrderVault, SharedOrderBook};
use tracing::{error, info, instrument, warn};

use crate::error::MatchingEngineError;

// -------------
// | Constants |
// -------------

/// The error message emitted when the job queue has already been taken
const ERR_QUEUE_TAKEN: &str = "job queue already taken";
/// The error message emitted when the job queue closes
const ERR_QUEUE_CLOSED: &str = "job queue closed";
/// The error message emitted when a book entry has no vault terms
const ERR_VAULT_MISSING: &str = "book order missing from the vault";

// ------------
// | Executor |
// ------------

/// The matching engine executor
pub struct MatchingEngineExecutor<C: DarkpoolClient> {
    /// The job queue on which to receive engine jobs
    job_queue: DefaultOption<MatchingEngineReceiver>,
    /// The shared handle to the resting order book
    book: SharedOrderBook,
    /// The private vault of revealed order terms
    ///
    /// Owned outright; the terms never leave the executor except inside a
    /// `MatchFound` job bound for the orchestrator
    vault: OrderVault,
    /// The shared index of match records
    match_index: MatchIndex,
    /// The work queue of the proof manager
    proof_queue: ProofManagerQueue,
    /// The job queue of the match orchestrator
    orchestrator_queue: OrchestratorQueue,
    /// The client for ledger submissions
    darkpool_client: C,
    /// The channel on which the coordinator signals shutdown
    cancel_channel: CancelChannel,
}

impl<C: DarkpoolClient> MatchingEngineExecutor<C> {
    /// Create a new executor with an empty vault
    pub fn new(
        job_queue: MatchingEngineReceiver,
        book: SharedOrderBook,
        match_index: MatchIndex,
        proof_queue: ProofManagerQueue,
        orchestrator_queue: OrchestratorQueue,
        darkpool_client: C,
        cancel_channel: CancelChannel,
    ) -> Self {
        Self {
            job_queue: default_option(job_queue),
            book,
            vault: OrderVault::new(),
            match_index,
            proof_queue,
            orchestrator_queue,
            darkpool_client,
            cancel_channel,
        }
    }

    /// The main execution loop; runs until cancelled or the queue closes
    pub async fn execution_loop(mut self) -> MatchingEngineError {
        info!("starting matching engine executor loop");
        let mut job_queue = match self.job_queue.take() {
            Some(queue) => queue,
            None => return MatchingEngineError::Setup(ERR_QUEUE_TAKEN.to_string()),
        };

        loop {
            tokio::select! {
                job = job_queue.recv() => {
                    match job {
                        Some(job) => self.handle_job(job).await,
                        None => {
                            return MatchingEngineError::JobQueueClosed(ERR_QUEUE_CLOSED.to_string())
                        },
                    }
                },

                // Await cancellation by the coordinator
                _ = self.cancel_channel.changed() => {
                    info!("matching engine received cancel signal, shutting down...");
                    return MatchingEngineError::Cancelled("received cancel signal".to_string());
                }
            }
        }
    }
}

// ----------------
// | Job Handlers |
// ----------------

impl<C: DarkpoolClient> MatchingEngineExecutor<C> {
    /// Dispatch a job to its handler; job failures are logged, not fatal
    async fn handle_job(&mut self, job: MatchingEngineJob) {
        let res = match job {
            MatchingEngineJob::PlaceOrder { order, response } => {
                self.handle_place_order(order, response).await
            },
            MatchingEngineJob::CancelOrder { commitment, trader_id, response } => {
                self.handle_cancel_order(commitment, trader_id, response).await
            },
            MatchingEngineJob::ExecuteMatchingCycle => self.execute_matching_cycle().await,
        };

        if let Err(err) = res {
            error!("error handling matching engine job: {err}");
        }
    }

    /// Handle a place order job
    ///
    /// An engine failure drops the response channel instead of answering;
    /// the requester reads the hangup as an internal error
    async fn handle_place_order(
        &mut self,
        order: RevealedOrder,
        response: ResponseSender<PlaceOrderResponse>,
    ) -> Result<(), MatchingEngineError> {
        let result = self.place_order(order).await?;

        // The requester may have hung up; nothing to do if so
        let _ = response.send(result);
        Ok(())
    }

    /// Admit a revealed order: validate, prove, register on the ledger, and
    /// rest it in the book
    ///
    /// The inner result is the admission outcome returned to the requester;
    /// the outer error is an engine failure that leaves them unanswered
    async fn place_order(
        &mut self,
        order: RevealedOrder,
    ) -> Result<PlaceOrderResponse, MatchingEngineError> {
        // Run the book's admission checks up front so a reveal that would be
        // refused costs no proving or ledger work
        {
            let book = self.book.write().await;
            if book.is_retired(&order.commitment) {
                return Ok(Err(OrderRejection::Retired));
            }
            if book.contains(&order.commitment) {
                return Ok(Err(OrderRejection::DuplicateCommitment));
            }
        }

        let statement = OrderValidityStatement { commitment: order.commitment };
        let witness = OrderValidityWitness { terms: order.terms };
        if let Err(err) = statement.evaluate(&witness) {
            return Ok(Err(err.into()));
        }

        // Prove validity and register the commitment as active on the ledger
        let bundle = self.prove_order_validity(statement, witness).await?;
        self.darkpool_client
            .submit_order(&bundle, order.owner_key)
            .await
            .map_err(|err| MatchingEngineError::Ledger(err.to_string()))?;

        // Rest the order in the book and store its terms in the vault
        if let Err(rejection) = self.book.add_order(&order).await {
            return Ok(Err(rejection));
        }

        let book_order = BookOrder {
            commitment: order.commitment,
            side: order.terms.side,
            price: order.terms.price,
            trader_id: order.trader_id.clone(),
            received_at: order.received_at,
        };
        self.vault.insert(order);
        Ok(Ok(book_order))
    }

    /// Request an order validity proof from the proof manager
    async fn prove_order_validity(
        &self,
        statement: OrderValidityStatement,
        witness: OrderValidityWitness,
    ) -> Result<ProofBundle, MatchingEngineError> {
        let (job, response) = new_proof_job(ProofJob::OrderValidity { statement, witness });
        self.proof_queue
            .send(job)
            .map_err(|err| MatchingEngineError::SendMessage(err.to_string()))?;

        response
            .await
            .map_err(|err| MatchingEngineError::SendMessage(err.to_string()))?
            .map_err(MatchingEngineError::ProofGeneration)
    }

    /// Handle a cancel order job
    ///
    /// The book enforces ownership; once the removal stands, a disagreeing
    /// ledger is logged rather than unwound, so the response stays positive
    async fn handle_cancel_order(
        &mut self,
        commitment: Scalar,
        trader_id: TraderId,
        response: ResponseSender<CancelOrderResponse>,
    ) -> Result<(), MatchingEngineError> {
        let cancelled_at = match self.book.cancel_order(&commitment, &trader_id).await {
            Ok(cancelled_at) => cancelled_at,
            Err(rejection) => {
                let _ = response.send(Err(rejection));
                return Ok(());
            },
        };

        // Mirror the cancellation on the ledger with the owner's key
        match self.vault.take(&commitment) {
            Some(order) => {
                if let Err(err) =
                    self.darkpool_client.cancel_order(commitment, order.owner_key).await
                {
                    error!("ledger cancellation of order {commitment} failed: {err}");
                }
            },
            None => error!("cancelled order {commitment} had no vault entry"),
        }

        let _ = response.send(Ok(cancelled_at));
        Ok(())
    }
}

// ------------------
// | Matching Cycle |
// ------------------

impl<C: DarkpoolClient> MatchingEngineExecutor<C> {
    /// Run one matching cycle over the book
    ///
    /// The book is pinned for the whole cycle, so reveals and cancellations
    /// queued behind the cycle observe the post-cycle book. Matches are
    /// registered in the index and forwarded to the orchestrator only after
    /// the book settles into its final shape
    #[instrument(name = "execute_matching_cycle", skip_all)]
    async fn execute_matching_cycle(&mut self) -> Result<(), MatchingEngineError> {
        let mut book = self.book.write().await;
        let mut matches = Vec::new();

        loop {
            let (buy, sell) = match (book.best_buy(), book.best_sell()) {
                (Some(buy), Some(sell)) => (buy.clone(), sell.clone()),
                _ => break,
            };

            // The book ranks each side best first, so an open spread at the
            // top means no pair below can cross either
            if buy.price < sell.price {
                break;
            }

            let (Some(buy_order), Some(sell_order)) = (
                self.vault.get(&buy.commitment).cloned(),
                self.vault.get(&sell.commitment).cloned(),
            ) else {
                return Err(MatchingEngineError::State(ERR_VAULT_MISSING.to_string()));
            };

            let settlement = match SettlementTerms::derive(&buy_order.terms, &sell_order.terms) {
                Ok(settlement) => settlement,
                Err(StatementError::OddPriceSum) => {
                    let (dropped, surviving) = odd_sum_drop_target(&buy, &sell);
                    book.remove_dropped(&dropped, &surviving);
                    self.vault.take(&dropped);
                    continue;
                },
                Err(err) => {
                    return Err(MatchingEngineError::State(format!(
                        "settlement derivation failed: {err}"
                    )));
                },
            };

            if settlement.amount == 0 {
                // Unreachable while admission requires positive amounts;
                // discard both legs rather than record a zero-amount match
                warn!(
                    "derived a zero amount for {} and {}; discarding both legs",
                    buy.commitment, sell.commitment
                );
                book.remove_matched(&buy.commitment);
                book.remove_matched(&sell.commitment);
                self.vault.take(&buy.commitment);
                self.vault.take(&sell.commitment);
                continue;
            }

            // Re-derive through the validity statement before committing the
            // pair; the same check gates proving and ledger verification
            let record = MatchResult::new(&buy_order, &sell_order, settlement);
            let statement = MatchValidityStatement {
                buy_commitment: record.buy_commitment,
                sell_commitment: record.sell_commitment,
                settlement_commitment: record.settlement_commitment,
            };
            let witness =
                MatchValidityWitness { buy: buy_order.terms, sell: sell_order.terms, settlement };
            if let Err(err) = statement.evaluate(&witness) {
                return Err(MatchingEngineError::State(format!("match validation failed: {err}")));
            }

            book.remove_matched(&buy.commitment);
            book.remove_matched(&sell.commitment);
            self.vault.take(&buy.commitment);
            self.vault.take(&sell.commitment);

            info!(
                "matched {} with {} for {} at price {}",
                buy.commitment, sell.commitment, settlement.amount, settlement.price
            );
            matches.push((record, buy_order, sell_order));
        }
        drop(book);

        // Register the records and hand the legs' terms to the orchestrator
        for (record, buy, sell) in matches {
            let match_id = record.id;
            self.match_index.insert(record).await;

            self.orchestrator_queue
                .send(OrchestratorJob::MatchFound { match_id, buy, sell })
                .map_err(|err| MatchingEngineError::SendMessage(err.to_string()))?;
        }

        Ok(())
    }
}

/// Select the leg dropped under the odd price sum policy
///
/// Returns `(dropped, surviving)`. The older leg is dropped; an arrival tie
/// drops the leg with the numerically higher commitment, making the outcome
/// independent of traversal order
fn odd_sum_drop_target(buy: &BookOrder, sell: &BookOrder) -> (Scalar, Scalar) {
    let drop_buy = match buy.received_at.cmp(&sell.received_at) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => buy.commitment > sell.commitment,
    };

    if drop_buy { (buy.commitment, sell.commitment) } else { (sell.commitment, buy.commitment) }
}
