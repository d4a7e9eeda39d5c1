//! The vault of revealed order terms
//!
//! The vault is the matching engine's private store of full order terms,
//! keyed by commitment. It is deliberately not shared: the book exposes
//! commitments and metadata, while the terms themselves stay here until the
//! engine forwards them into a match or the order is cancelled

use circuit_types::Scalar;
use common::types::order::RevealedOrder;
use rustc_hash::FxHashMap;

/// The private store of revealed order terms
#[derive(Clone, Debug, Default)]
pub struct OrderVault {
    /// The revealed orders keyed by their commitment
    orders: FxHashMap<Scalar, RevealedOrder>,
}

impl OrderVault {
    /// Create an empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an order's revealed terms
    pub fn insert(&mut self, order: RevealedOrder) {
        self.orders.insert(order.commitment, order);
    }

    /// Read an order's revealed terms
    pub fn get(&self, commitment: &Scalar) -> Option<&RevealedOrder> {
        self.orders.get(commitment)
    }

    /// Remove and return an order's revealed terms
    pub fn take(&mut self, commitment: &Scalar) -> Option<RevealedOrder> {
        self.orders.remove(commitment)
    }

    /// The number of orders the vault holds
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the vault holds no orders
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        order::{OrderSide, OrderTerms},
    };
    use common::types::order::RevealedOrder;
    use rand::thread_rng;

    use super::OrderVault;

    /// Tests the insert/get/take lifecycle
    #[test]
    fn test_vault_lifecycle() {
        let mut rng = thread_rng();
        let nonce = Scalar::random(&mut rng);
        let terms = OrderTerms { side: OrderSide::Buy, price: 100, amount: 5, nonce };
        let order = RevealedOrder::new(
            terms,
            terms.compute_commitment(),
            "trader-1".to_string(),
            Scalar::from(2u8),
        );
        let commitment = order.commitment;

        let mut vault = OrderVault::new();
        assert!(vault.is_empty());

        vault.insert(order);
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.get(&commitment).unwrap().terms, terms);

        let taken = vault.take(&commitment).unwrap();
        assert_eq!(taken.terms, terms);
        assert!(vault.take(&commitment).is_none());
        assert!(vault.is_empty());
    }
}
