//! The embedded darkpool client, wrapping the in-process ledger state
//! machine behind the client trait
//!
//! Every submission is encoded to calldata and decoded again before it
//! reaches the machine, so calls cross the same encoder boundary they would
//! on a real deployment. The machine sits behind an async rwlock; write
//! submissions serialize on it, which gives the ledger its
//! one-transaction-per-block semantics

use async_trait::async_trait;
use circuit_types::{Scalar, deposit::Nullifier, merkle::MerkleRoot, proof::ProofBundle};
use common::{
    AsyncShared, new_async_shared,
    types::{
        ledger::{OrderStatus, SequencedEvent, TxReceipt},
        r#match::TransferPayload,
    },
};
use darkpool::{Darkpool, DepositAccepted, MatchAccepted, records::MatchRecord};
use tracing::info;

use crate::{
    calldata::{LedgerCall, decode_call, encode_call},
    errors::DarkpoolClientError,
    traits::{DarkpoolClient, DepositReceipt, MatchSubmission},
};

// -----------
// | Helpers |
// -----------

/// Synthesize the transaction hash for a sequenced block
///
/// The embedded ledger sequences one transaction per block, so the block
/// number identifies the transaction
fn synthetic_tx_hash(block_number: u64) -> String {
    format!("{block_number:#066x}")
}

/// Build the receipt for a transaction sequenced into the given block
fn synthetic_receipt(block_number: u64) -> TxReceipt {
    TxReceipt { tx_hash: synthetic_tx_hash(block_number), block_number }
}

/// The typed return data of an executed entrypoint call
enum CallOutcome {
    /// The call was sequenced with no return data beyond its block
    Sequenced(u64),
    /// The call recorded a match
    MatchAccepted(MatchAccepted),
    /// The call appended a deposit leaf
    DepositAccepted(DepositAccepted),
}

impl CallOutcome {
    /// The block number the call was sequenced into
    fn block_number(&self) -> u64 {
        match self {
            CallOutcome::Sequenced(block) => *block,
            CallOutcome::MatchAccepted(accepted) => accepted.block_number,
            CallOutcome::DepositAccepted(accepted) => accepted.block_number,
        }
    }
}

// ----------
// | Client |
// ----------

/// The embedded client over the in-process ledger
#[derive(Clone, Default)]
pub struct EmbeddedDarkpool {
    /// The ledger state machine
    darkpool: AsyncShared<Darkpool>,
}

impl EmbeddedDarkpool {
    /// Create a client over a fresh ledger
    pub fn new() -> Self {
        Self { darkpool: new_async_shared(Darkpool::new()) }
    }

    /// Encode, decode, and execute an entrypoint call against the ledger
    ///
    /// The round trip through calldata keeps the embedded deployment honest;
    /// the machine sees exactly the bytes the encoder produced
    async fn execute(&self, call: &LedgerCall) -> Result<CallOutcome, DarkpoolClientError> {
        let calldata = encode_call(call)?;
        let decoded = decode_call(&calldata)?;
        let mut darkpool = self.darkpool.write().await;

        let outcome = match decoded {
            LedgerCall::SubmitOrder { bundle, owner_key } => {
                CallOutcome::Sequenced(darkpool.submit_order(&bundle, owner_key)?)
            },
            LedgerCall::SubmitMatch { bundle } => {
                CallOutcome::MatchAccepted(darkpool.submit_match(&bundle)?)
            },
            LedgerCall::SubmitSettlement { match_id, buyer_payload, seller_payload } => {
                CallOutcome::Sequenced(darkpool.submit_settlement(
                    match_id,
                    &buyer_payload,
                    &seller_payload,
                )?)
            },
            LedgerCall::CancelOrder { commitment, caller_key } => {
                CallOutcome::Sequenced(darkpool.cancel_order(commitment, caller_key)?)
            },
            LedgerCall::Deposit { leaf } => {
                CallOutcome::DepositAccepted(darkpool.deposit(leaf)?)
            },
            LedgerCall::Claim { bundle } => CallOutcome::Sequenced(darkpool.claim(&bundle)?),
        };

        Ok(outcome)
    }
}

#[async_trait]
impl DarkpoolClient for EmbeddedDarkpool {
    // ----------------
    // | Transactions |
    // ----------------

    async fn submit_order(
        &self,
        bundle: &ProofBundle,
        owner_key: Scalar,
    ) -> Result<TxReceipt, DarkpoolClientError> {
        let call = LedgerCall::SubmitOrder { bundle: bundle.clone(), owner_key };
        let outcome = self.execute(&call).await?;
        Ok(synthetic_receipt(outcome.block_number()))
    }

    async fn submit_match(
        &self,
        bundle: &ProofBundle,
    ) -> Result<MatchSubmission, DarkpoolClientError> {
        let call = LedgerCall::SubmitMatch { bundle: bundle.clone() };
        match self.execute(&call).await? {
            CallOutcome::MatchAccepted(accepted) => {
                info!("ledger accepted match with id {}", accepted.match_id);
                Ok(MatchSubmission {
                    ledger_match_id: accepted.match_id,
                    receipt: synthetic_receipt(accepted.block_number),
                })
            },
            _ => Err(DarkpoolClientError::rpc("unexpected return data for submit-match")),
        }
    }

    async fn submit_settlement(
        &self,
        ledger_match_id: u64,
        buyer_payload: &TransferPayload,
        seller_payload: &TransferPayload,
    ) -> Result<TxReceipt, DarkpoolClientError> {
        let call = LedgerCall::SubmitSettlement {
            match_id: ledger_match_id,
            buyer_payload: buyer_payload.clone(),
            seller_payload: seller_payload.clone(),
        };

        let outcome = self.execute(&call).await?;
        info!("ledger settled match {ledger_match_id}");
        Ok(synthetic_receipt(outcome.block_number()))
    }

    async fn cancel_order(
        &self,
        commitment: Scalar,
        caller_key: Scalar,
    ) -> Result<TxReceipt, DarkpoolClientError> {
        let call = LedgerCall::CancelOrder { commitment, caller_key };
        let outcome = self.execute(&call).await?;
        Ok(synthetic_receipt(outcome.block_number()))
    }

    async fn deposit(&self, leaf: Scalar) -> Result<DepositReceipt, DarkpoolClientError> {
        let call = LedgerCall::Deposit { leaf };
        match self.execute(&call).await? {
            CallOutcome::DepositAccepted(accepted) => {
                info!("ledger appended deposit leaf at index {}", accepted.index);
                Ok(DepositReceipt {
                    index: accepted.index,
                    new_root: accepted.new_root,
                    receipt: synthetic_receipt(accepted.block_number),
                })
            },
            _ => Err(DarkpoolClientError::rpc("unexpected return data for deposit")),
        }
    }

    async fn claim(&self, bundle: &ProofBundle) -> Result<TxReceipt, DarkpoolClientError> {
        let call = LedgerCall::Claim { bundle: bundle.clone() };
        let outcome = self.execute(&call).await?;
        Ok(synthetic_receipt(outcome.block_number()))
    }

    // -----------
    // | Queries |
    // -----------

    async fn get_root(&self) -> Result<MerkleRoot, DarkpoolClientError> {
        Ok(self.darkpool.read().await.root())
    }

    async fn get_leaf_count(&self) -> Result<u64, DarkpoolClientError> {
        Ok(self.darkpool.read().await.leaf_count())
    }

    async fn is_nullifier_spent(&self, nullifier: Nullifier) -> Result<bool, DarkpoolClientError> {
        Ok(self.darkpool.read().await.nullifier_spent(&nullifier))
    }

    async fn get_order_status(
        &self,
        commitment: Scalar,
    ) -> Result<OrderStatus, DarkpoolClientError> {
        Ok(self.darkpool.read().await.order_status(&commitment))
    }

    async fn get_match_record(
        &self,
        ledger_match_id: u64,
    ) -> Result<Option<MatchRecord>, DarkpoolClientError> {
        Ok(self.darkpool.read().await.match_record(ledger_match_id))
    }

    async fn get_block_number(&self) -> Result<u64, DarkpoolClientError> {
        Ok(self.darkpool.read().await.block_number())
    }

    async fn events_since(&self, index: u64) -> Result<Vec<SequencedEvent>, DarkpoolClientError> {
        Ok(self.darkpool.read().await.events_since(index))
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        match_validity::MatchValidityStatement,
        order::{OrderSide, OrderTerms},
        order_validity::OrderValidityStatement,
        proof::{CircuitId, Proof, ProofBundle},
        settlement::SettlementTerms,
    };
    use common::types::{ledger::OrderStatus, r#match::TransferPayload};
    use darkpool::DarkpoolError;
    use rand::thread_rng;

    use super::EmbeddedDarkpool;
    use crate::{DarkpoolClient, DarkpoolClientError};

    /// Attest a statement's public signals into a bundle
    fn bundle(circuit: CircuitId, signals: Vec<Scalar>) -> ProofBundle {
        ProofBundle { circuit, proof: Proof::attest(circuit, &signals), public_signals: signals }
    }

    /// Build order terms with a random nonce
    fn terms(side: OrderSide, price: u128, amount: u128) -> OrderTerms {
        let mut rng = thread_rng();
        OrderTerms { side, price, amount, nonce: Scalar::random(&mut rng) }
    }

    /// The order validity bundle for the given terms
    fn order_bundle(terms: &OrderTerms) -> ProofBundle {
        let statement = OrderValidityStatement { commitment: terms.compute_commitment() };
        bundle(CircuitId::OrderValidity, statement.to_public_signals())
    }

    /// The match validity bundle for the given crossing legs
    fn match_bundle(buy: &OrderTerms, sell: &OrderTerms) -> ProofBundle {
        let settlement = SettlementTerms::derive(buy, sell).unwrap();
        let statement = MatchValidityStatement {
            buy_commitment: buy.compute_commitment(),
            sell_commitment: sell.compute_commitment(),
            settlement_commitment: settlement.compute_commitment(),
        };
        bundle(CircuitId::MatchValidity, statement.to_public_signals())
    }

    /// A non-empty transfer payload
    fn payload() -> TransferPayload {
        TransferPayload::new(vec![Scalar::from(5u8)])
    }

    /// Tests order submission and owner-authorized cancellation through the
    /// client trait
    #[tokio::test]
    async fn test_order_submission_and_cancel() {
        let client = EmbeddedDarkpool::new();
        let order = terms(OrderSide::Buy, 1000, 500);
        let commitment = order.compute_commitment();
        let owner_key = Scalar::from(42u8);

        let receipt = client.submit_order(&order_bundle(&order), owner_key).await.unwrap();
        assert_eq!(receipt.block_number, 1);
        assert_eq!(receipt.tx_hash.len(), 66);
        assert!(receipt.tx_hash.starts_with("0x"));
        assert_eq!(client.get_order_status(commitment).await.unwrap(), OrderStatus::Active);

        // A caller without the owner key cannot cancel
        let err = client.cancel_order(commitment, Scalar::from(43u8)).await.unwrap_err();
        assert!(matches!(err, DarkpoolClientError::Rejected(DarkpoolError::NotOwner)));

        client.cancel_order(commitment, owner_key).await.unwrap();
        assert_eq!(client.get_order_status(commitment).await.unwrap(), OrderStatus::Cancelled);
    }

    /// Tests the full match and settlement flow, checking receipts advance
    /// one block per transaction
    #[tokio::test]
    async fn test_match_and_settlement_flow() {
        let client = EmbeddedDarkpool::new();
        let buy = terms(OrderSide::Buy, 1000, 500);
        let sell = terms(OrderSide::Sell, 900, 600);

        client.submit_order(&order_bundle(&buy), Scalar::from(1u8)).await.unwrap();
        client.submit_order(&order_bundle(&sell), Scalar::from(2u8)).await.unwrap();

        let submission = client.submit_match(&match_bundle(&buy, &sell)).await.unwrap();
        assert_eq!(submission.ledger_match_id, 0);
        assert_eq!(submission.receipt.block_number, 3);
        assert_eq!(
            client.get_order_status(buy.compute_commitment()).await.unwrap(),
            OrderStatus::Matched,
        );

        let receipt = client
            .submit_settlement(submission.ledger_match_id, &payload(), &payload())
            .await
            .unwrap();
        assert_eq!(receipt.block_number, 4);

        let record = client.get_match_record(submission.ledger_match_id).await.unwrap().unwrap();
        assert!(record.settled);
        assert_eq!(
            client.get_order_status(sell.compute_commitment()).await.unwrap(),
            OrderStatus::Settled,
        );

        // One event per accepted transaction
        let events = client.events_since(0).await.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(client.get_block_number().await.unwrap(), 4);
    }

    /// Tests that ledger rejections surface with their reason intact
    #[tokio::test]
    async fn test_rejection_surfaces_reason() {
        let client = EmbeddedDarkpool::new();
        let order = terms(OrderSide::Sell, 900, 600);
        let b = order_bundle(&order);

        client.submit_order(&b, Scalar::from(1u8)).await.unwrap();
        let err = client.submit_order(&b, Scalar::from(1u8)).await.unwrap_err();
        assert!(err.is_rejection());
        assert!(matches!(
            err,
            DarkpoolClientError::Rejected(DarkpoolError::DuplicateCommitment)
        ));

        // A failed submission does not advance the block counter
        assert_eq!(client.get_block_number().await.unwrap(), 1);
    }
}
