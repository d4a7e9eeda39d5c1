//! The resting order book: revealed commitments ranked on two price-ordered
//! sides
//!
//! Each side keeps its orders in a `BTreeSet` of ranking keys so the best
//! resting order is a first-element peek. Ties at a price level resolve by
//! arrival time, first in first matched. A retired set records every
//! commitment that has left the book, so matched, cancelled, and dropped
//! orders can never re-enter under the same commitment

use std::cmp::Ordering;
use std::collections::BTreeSet;

use circuit_types::{
    Price, Scalar,
    errors::StatementError,
    order::OrderSide,
    order_validity::{OrderValidityStatement, OrderValidityWitness},
};
use common::{
    AsyncShared, new_async_shared,
    types::{
        TraderId,
        order::{OrderMetadata, RevealedOrder},
    },
};
use external_api::bus_message::{ORDER_STATE_CHANGE_TOPIC, SystemBusMessage};
use rustc_hash::{FxHashMap, FxHashSet};
use system_bus::SystemBus;
use thiserror::Error;
use tokio::sync::RwLockWriteGuard;
use tracing::warn;
use util::get_current_time_millis;

// ----------
// | Errors |
// ----------

/// The reasons the book refuses to admit a revealed order
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum OrderRejection {
    /// The revealed terms fail the order validity statement
    #[error("invalid order: {0}")]
    InvalidTerms(#[from] StatementError),
    /// An order with the same commitment is already resting
    #[error("an order with this commitment is already in the book")]
    DuplicateCommitment,
    /// The commitment previously left the book by match, cancel, or drop
    #[error("this commitment has already left the book and may not return")]
    Retired,
}

/// The reasons a cancellation is refused
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CancelRejection {
    /// No resting order carries the commitment
    #[error("no resting order with this commitment")]
    UnknownOrder,
    /// The cancelling trader did not reveal the order
    #[error("only the revealing trader may cancel an order")]
    NotOwner,
}

// ----------------
// | Ranking Keys |
// ----------------

/// The ranking key of a buy side order
///
/// Buys rank by descending price, then by arrival, then by commitment, so
/// the side's first key is the highest-priced, oldest resting buy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BuyKey {
    /// The limit price of the order
    price: Price,
    /// The arrival timestamp, breaking price ties in favor of older orders
    received_at: u64,
    /// The commitment, a final unique tie-break
    commitment: Scalar,
}

impl Ord for BuyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .price
            .cmp(&self.price)
            .then_with(|| self.received_at.cmp(&other.received_at))
            .then_with(|| self.commitment.cmp(&other.commitment))
    }
}

impl PartialOrd for BuyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The ranking key of a sell side order
///
/// Sells rank by ascending price, then by arrival, then by commitment; the
/// derived lexicographic order gives exactly that
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SellKey {
    /// The limit price of the order
    price: Price,
    /// The arrival timestamp, breaking price ties in favor of older orders
    received_at: u64,
    /// The commitment, a final unique tie-break
    commitment: Scalar,
}

// -----------------
// | Book Entries  |
// -----------------

/// A resting order as the book tracks it
///
/// The book keeps the limit price for ranking; the external view built by
/// [`OrderBook::public_view`] strips it
#[derive(Clone, Debug)]
pub struct BookOrder {
    /// The commitment identifying the order
    pub commitment: Scalar,
    /// The side of the order
    pub side: OrderSide,
    /// The limit price of the order
    pub price: Price,
    /// The trader that revealed the order
    pub trader_id: TraderId,
    /// The unix timestamp in milliseconds at which the order was received
    pub received_at: u64,
}

impl BookOrder {
    /// The non-sensitive metadata view of the order
    fn metadata(&self) -> OrderMetadata {
        OrderMetadata {
            commitment: self.commitment,
            side: self.side,
            trader_id: self.trader_id.clone(),
            received_at: self.received_at,
        }
    }
}

/// Counters summarizing book activity since the node started
#[derive(Clone, Copy, Debug, Default)]
pub struct BookStats {
    /// The number of orders currently resting in the book
    pub active_orders: u64,
    /// The number of resting orders on the buy side
    pub active_buys: u64,
    /// The number of resting orders on the sell side
    pub active_sells: u64,
    /// The number of orders admitted since startup
    pub orders_revealed: u64,
    /// The number of orders cancelled since startup
    pub orders_cancelled: u64,
    /// The number of orders dropped by the odd price sum policy
    pub orders_dropped: u64,
}

// --------------
// | Order Book |
// --------------

/// The resting order book
#[derive(Clone)]
pub struct OrderBook {
    /// The resting orders keyed by commitment
    orders: FxHashMap<Scalar, BookOrder>,
    /// The buy side, ranked best first
    buys: BTreeSet<BuyKey>,
    /// The sell side, ranked best first
    sells: BTreeSet<SellKey>,
    /// Commitments that have left the book and may never re-enter
    retired: FxHashSet<Scalar>,
    /// The number of orders admitted since startup
    orders_revealed: u64,
    /// The number of orders cancelled since startup
    orders_cancelled: u64,
    /// The number of orders dropped by the odd price sum policy
    orders_dropped: u64,
    /// A handle to the system bus for order state events
    bus: SystemBus<SystemBusMessage>,
}

impl OrderBook {
    /// Create an empty book publishing state events on the given bus
    pub fn new(bus: SystemBus<SystemBusMessage>) -> Self {
        Self {
            orders: FxHashMap::default(),
            buys: BTreeSet::new(),
            sells: BTreeSet::new(),
            retired: FxHashSet::default(),
            orders_revealed: 0,
            orders_cancelled: 0,
            orders_dropped: 0,
            bus,
        }
    }

    // ------------------
    // | State Changes  |
    // ------------------

    /// Admit a revealed order to the book
    ///
    /// The terms are checked against the order validity statement before the
    /// order rests; a commitment that has ever left the book is refused even
    /// if the reveal is otherwise well-formed
    pub fn add_order(&mut self, order: &RevealedOrder) -> Result<(), OrderRejection> {
        let commitment = order.commitment;
        if self.retired.contains(&commitment) {
            return Err(OrderRejection::Retired);
        }
        if self.orders.contains_key(&commitment) {
            return Err(OrderRejection::DuplicateCommitment);
        }

        let statement = OrderValidityStatement { commitment };
        statement.evaluate(&OrderValidityWitness { terms: order.terms })?;

        self.insert_entry(BookOrder {
            commitment,
            side: order.terms.side,
            price: order.terms.price,
            trader_id: order.trader_id.clone(),
            received_at: order.received_at,
        });
        self.orders_revealed += 1;

        self.bus.publish(
            ORDER_STATE_CHANGE_TOPIC.to_string(),
            SystemBusMessage::OrderRevealed { metadata: order.metadata() },
        );
        Ok(())
    }

    /// Cancel a resting order on behalf of its owner
    ///
    /// Returns the cancellation timestamp on success. The commitment retires
    /// with the order; re-revealing it is refused
    pub fn cancel_order(
        &mut self,
        commitment: &Scalar,
        trader_id: &str,
    ) -> Result<u64, CancelRejection> {
        let entry = self.orders.get(commitment).ok_or(CancelRejection::UnknownOrder)?;
        if entry.trader_id != trader_id {
            return Err(CancelRejection::NotOwner);
        }

        self.remove_entry(commitment);
        self.orders_cancelled += 1;

        let cancelled_at = get_current_time_millis();
        self.bus.publish(
            ORDER_STATE_CHANGE_TOPIC.to_string(),
            SystemBusMessage::OrderCancelled { commitment: *commitment, timestamp: cancelled_at },
        );
        Ok(cancelled_at)
    }

    /// Remove an order that matched, retiring its commitment
    ///
    /// The match announcement itself is made by the match index; the book
    /// only retires the legs. Removing an already absent commitment is a
    /// no-op
    pub fn remove_matched(&mut self, commitment: &Scalar) {
        self.remove_entry(commitment);
    }

    /// Remove an order dropped by the odd price sum policy
    ///
    /// The drop is logged and announced with the commitment of the
    /// counterparty order left resting in the book
    pub fn remove_dropped(&mut self, commitment: &Scalar, surviving_commitment: &Scalar) {
        if self.remove_entry(commitment).is_none() {
            return;
        }
        self.orders_dropped += 1;

        warn!(
            "dropped order {commitment} under the odd price sum policy; \
             {surviving_commitment} remains in the book"
        );
        self.bus.publish(
            ORDER_STATE_CHANGE_TOPIC.to_string(),
            SystemBusMessage::OrderDropped {
                commitment: *commitment,
                surviving_commitment: *surviving_commitment,
                timestamp: get_current_time_millis(),
            },
        );
    }

    // -----------
    // | Getters |
    // -----------

    /// The best resting buy: highest price, oldest at that price
    pub fn best_buy(&self) -> Option<&BookOrder> {
        self.buys.first().and_then(|key| self.orders.get(&key.commitment))
    }

    /// The best resting sell: lowest price, oldest at that price
    pub fn best_sell(&self) -> Option<&BookOrder> {
        self.sells.first().and_then(|key| self.orders.get(&key.commitment))
    }

    /// Whether the commitment is currently resting in the book
    pub fn contains(&self, commitment: &Scalar) -> bool {
        self.orders.contains_key(commitment)
    }

    /// Whether the commitment has left the book and may not return
    pub fn is_retired(&self, commitment: &Scalar) -> bool {
        self.retired.contains(commitment)
    }

    /// The number of resting orders across both sides
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the book has no resting orders
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// The number of resting orders on the given side
    pub fn depth(&self, side: OrderSide) -> usize {
        match side {
            OrderSide::Buy => self.buys.len(),
            OrderSide::Sell => self.sells.len(),
        }
    }

    /// The non-sensitive listing of the book, oldest order first
    ///
    /// Prices, amounts, and nonces never pass through this view
    pub fn public_view(&self) -> Vec<OrderMetadata> {
        let mut entries: Vec<OrderMetadata> =
            self.orders.values().map(BookOrder::metadata).collect();
        entries.sort_by_key(|meta| meta.received_at);
        entries
    }

    /// A snapshot of the book's activity counters
    pub fn stats(&self) -> BookStats {
        BookStats {
            active_orders: self.orders.len() as u64,
            active_buys: self.buys.len() as u64,
            active_sells: self.sells.len() as u64,
            orders_revealed: self.orders_revealed,
            orders_cancelled: self.orders_cancelled,
            orders_dropped: self.orders_dropped,
        }
    }

    // -----------
    // | Helpers |
    // -----------

    /// Insert an entry into the commitment map and its side's ranking set
    fn insert_entry(&mut self, entry: BookOrder) {
        match entry.side {
            OrderSide::Buy => {
                self.buys.insert(BuyKey {
                    price: entry.price,
                    received_at: entry.received_at,
                    commitment: entry.commitment,
                });
            },
            OrderSide::Sell => {
                self.sells.insert(SellKey {
                    price: entry.price,
                    received_at: entry.received_at,
                    commitment: entry.commitment,
                });
            },
        }

        self.orders.insert(entry.commitment, entry);
    }

    /// Remove an entry from the map and its ranking set, retiring the
    /// commitment
    fn remove_entry(&mut self, commitment: &Scalar) -> Option<BookOrder> {
        let entry = self.orders.remove(commitment)?;
        match entry.side {
            OrderSide::Buy => {
                self.buys.remove(&BuyKey {
                    price: entry.price,
                    received_at: entry.received_at,
                    commitment: entry.commitment,
                });
            },
            OrderSide::Sell => {
                self.sells.remove(&SellKey {
                    price: entry.price,
                    received_at: entry.received_at,
                    commitment: entry.commitment,
                });
            },
        }

        self.retired.insert(entry.commitment);
        Some(entry)
    }
}

// ----------------------
// | Shared Book Handle |
// ----------------------

/// A clone-able, thread-safe handle to the node's order book
///
/// The matching engine holds the write guard across a full matching cycle so
/// the cycle is atomic with respect to reveals and cancellations; readers
/// such as the API server take short read locks for listings and stats
#[derive(Clone)]
pub struct SharedOrderBook {
    /// The underlying book behind an async read-write lock
    book: AsyncShared<OrderBook>,
}

impl SharedOrderBook {
    /// Create a shared handle around an empty book
    pub fn new(bus: SystemBus<SystemBusMessage>) -> Self {
        Self { book: new_async_shared(OrderBook::new(bus)) }
    }

    /// Acquire the write half of the book
    ///
    /// The matching engine uses this to pin the book for the duration of a
    /// cycle
    pub async fn write(&self) -> RwLockWriteGuard<'_, OrderBook> {
        self.book.write().await
    }

    /// Admit a revealed order to the book
    pub async fn add_order(&self, order: &RevealedOrder) -> Result<(), OrderRejection> {
        self.book.write().await.add_order(order)
    }

    /// Cancel a resting order on behalf of its owner
    pub async fn cancel_order(
        &self,
        commitment: &Scalar,
        trader_id: &str,
    ) -> Result<u64, CancelRejection> {
        self.book.write().await.cancel_order(commitment, trader_id)
    }

    /// Whether the commitment is currently resting in the book
    pub async fn contains(&self, commitment: &Scalar) -> bool {
        self.book.read().await.contains(commitment)
    }

    /// The non-sensitive listing of the book
    pub async fn public_view(&self) -> Vec<OrderMetadata> {
        self.book.read().await.public_view()
    }

    /// A snapshot of the book's activity counters
    pub async fn stats(&self) -> BookStats {
        self.book.read().await.stats()
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        errors::StatementError,
        order::{OrderSide, OrderTerms},
    };
    use common::types::order::RevealedOrder;
    use external_api::bus_message::{ORDER_STATE_CHANGE_TOPIC, SystemBusMessage};
    use rand::thread_rng;
    use system_bus::SystemBus;

    use super::{CancelRejection, OrderBook, OrderRejection};

    /// Build a revealed order with a fixed arrival time
    fn order(
        side: OrderSide,
        price: u128,
        amount: u128,
        trader: &str,
        received_at: u64,
    ) -> RevealedOrder {
        let mut rng = thread_rng();
        let terms = OrderTerms { side, price, amount, nonce: Scalar::random(&mut rng) };
        RevealedOrder {
            commitment: terms.compute_commitment(),
            terms,
            trader_id: trader.to_string(),
            owner_key: Scalar::from(1u8),
            received_at,
        }
    }

    /// Build an empty book with a fresh bus
    fn empty_book() -> OrderBook {
        OrderBook::new(SystemBus::new())
    }

    /// Tests best-of-side selection across price levels
    #[test]
    fn test_best_price_selection() {
        let mut book = empty_book();
        let buy_low = order(OrderSide::Buy, 100, 10, "t1", 1);
        let buy_high = order(OrderSide::Buy, 110, 10, "t2", 2);
        let sell_high = order(OrderSide::Sell, 200, 10, "t3", 3);
        let sell_low = order(OrderSide::Sell, 190, 10, "t4", 4);

        for o in [&buy_low, &buy_high, &sell_high, &sell_low] {
            book.add_order(o).unwrap();
        }

        assert_eq!(book.best_buy().unwrap().commitment, buy_high.commitment);
        assert_eq!(book.best_sell().unwrap().commitment, sell_low.commitment);
        assert_eq!(book.depth(OrderSide::Buy), 2);
        assert_eq!(book.depth(OrderSide::Sell), 2);
    }

    /// Tests that price ties resolve in favor of the earlier arrival
    #[test]
    fn test_arrival_order_tiebreak() {
        let mut book = empty_book();
        let first = order(OrderSide::Buy, 100, 10, "t1", 1);
        let second = order(OrderSide::Buy, 100, 10, "t2", 2);

        book.add_order(&second).unwrap();
        book.add_order(&first).unwrap();
        assert_eq!(book.best_buy().unwrap().commitment, first.commitment);

        book.remove_matched(&first.commitment);
        assert_eq!(book.best_buy().unwrap().commitment, second.commitment);
    }

    /// Tests the admission rejections: bad commitment, zero terms, duplicate
    #[test]
    fn test_admission_rejections() {
        let mut book = empty_book();

        let mut tampered = order(OrderSide::Buy, 100, 10, "t1", 1);
        tampered.terms.price += 1;
        assert_eq!(
            book.add_order(&tampered),
            Err(OrderRejection::InvalidTerms(StatementError::CommitmentMismatch)),
        );

        let zero_amount = order(OrderSide::Buy, 100, 0, "t1", 1);
        assert_eq!(
            book.add_order(&zero_amount),
            Err(OrderRejection::InvalidTerms(StatementError::NonPositiveTerms)),
        );

        let good = order(OrderSide::Buy, 100, 10, "t1", 1);
        book.add_order(&good).unwrap();
        assert_eq!(book.add_order(&good), Err(OrderRejection::DuplicateCommitment));
    }

    /// Tests that a commitment never re-enters once it has left the book
    #[test]
    fn test_retired_commitments_never_return() {
        let mut book = empty_book();

        let cancelled = order(OrderSide::Buy, 100, 10, "t1", 1);
        book.add_order(&cancelled).unwrap();
        book.cancel_order(&cancelled.commitment, "t1").unwrap();
        assert_eq!(book.add_order(&cancelled), Err(OrderRejection::Retired));

        let matched = order(OrderSide::Sell, 90, 10, "t2", 2);
        book.add_order(&matched).unwrap();
        book.remove_matched(&matched.commitment);
        assert!(book.is_retired(&matched.commitment));
        assert_eq!(book.add_order(&matched), Err(OrderRejection::Retired));

        // A second removal of the same commitment is a no-op
        book.remove_matched(&matched.commitment);
        assert_eq!(book.len(), 0);

        let dropped = order(OrderSide::Sell, 91, 10, "t3", 3);
        book.add_order(&dropped).unwrap();
        book.remove_dropped(&dropped.commitment, &matched.commitment);
        assert_eq!(book.add_order(&dropped), Err(OrderRejection::Retired));

        assert!(book.is_empty());
    }

    /// Tests the cancellation owner check
    #[test]
    fn test_cancel_owner_check() {
        let mut book = empty_book();
        let o = order(OrderSide::Buy, 100, 10, "alice", 1);
        book.add_order(&o).unwrap();

        assert_eq!(book.cancel_order(&o.commitment, "mallory"), Err(CancelRejection::NotOwner));
        assert!(book.contains(&o.commitment));

        let unknown = Scalar::from(42u8);
        assert_eq!(book.cancel_order(&unknown, "alice"), Err(CancelRejection::UnknownOrder));

        book.cancel_order(&o.commitment, "alice").unwrap();
        assert!(!book.contains(&o.commitment));
    }

    /// Tests that the public view lists oldest first and tracks removals
    #[test]
    fn test_public_view() {
        let mut book = empty_book();
        let newer = order(OrderSide::Buy, 100, 10, "t1", 20);
        let older = order(OrderSide::Sell, 200, 10, "t2", 10);
        book.add_order(&newer).unwrap();
        book.add_order(&older).unwrap();

        let view = book.public_view();
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].commitment, older.commitment);
        assert_eq!(view[1].commitment, newer.commitment);

        book.remove_matched(&older.commitment);
        assert_eq!(book.public_view().len(), 1);
    }

    /// Tests the activity counters
    #[test]
    fn test_stats_counters() {
        let mut book = empty_book();
        let a = order(OrderSide::Buy, 100, 10, "t1", 1);
        let b = order(OrderSide::Buy, 101, 10, "t1", 2);
        let c = order(OrderSide::Sell, 200, 10, "t2", 3);
        for o in [&a, &b, &c] {
            book.add_order(o).unwrap();
        }

        book.cancel_order(&a.commitment, "t1").unwrap();
        book.remove_dropped(&b.commitment, &c.commitment);
        // A repeated drop of the same commitment must not double count
        book.remove_dropped(&b.commitment, &c.commitment);

        let stats = book.stats();
        assert_eq!(stats.active_orders, 1);
        assert_eq!(stats.active_buys, 0);
        assert_eq!(stats.active_sells, 1);
        assert_eq!(stats.orders_revealed, 3);
        assert_eq!(stats.orders_cancelled, 1);
        assert_eq!(stats.orders_dropped, 1);
    }

    /// Tests that book mutations publish order state events
    #[tokio::test]
    async fn test_order_state_events() {
        let bus = SystemBus::new();
        let mut reader = bus.subscribe(ORDER_STATE_CHANGE_TOPIC.to_string());
        let mut book = OrderBook::new(bus);

        let o = order(OrderSide::Buy, 100, 10, "t1", 1);
        book.add_order(&o).unwrap();
        book.cancel_order(&o.commitment, "t1").unwrap();

        let revealed = reader.next_message().await;
        assert!(matches!(
            revealed,
            SystemBusMessage::OrderRevealed { ref metadata } if metadata.commitment == o.commitment
        ));

        let cancelled = reader.next_message().await;
        assert!(matches!(
            cancelled,
            SystemBusMessage::OrderCancelled { commitment, .. } if commitment == o.commitment
        ));
    }
}
