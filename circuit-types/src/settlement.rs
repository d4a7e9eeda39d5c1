//! Settlement terms and the arithmetic that derives them from a crossing
//! pair

use duskpool_crypto::{Scalar, hash::compute_poseidon_hash};
use serde::{Deserialize, Serialize};

use crate::{
    Amount, Price,
    errors::StatementError,
    order::{OrderSide, OrderTerms},
};

/// The terms of a settled match: the traded amount and the execution price
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementTerms {
    /// The amount exchanged; the smaller of the two leg amounts
    pub amount: Amount,
    /// The execution price; the exact integer midpoint of the leg prices
    pub price: Price,
}

impl SettlementTerms {
    /// Derive settlement terms from a buy and a sell leg
    ///
    /// Fails with `SideMismatch` if the legs' sides are wrong, `NotCrossing`
    /// if the buy price is below the sell price, and `OddPriceSum` if the
    /// price sum admits no exact integer midpoint. The caller decides the
    /// recovery policy for each failure; this function only reports
    pub fn derive(buy: &OrderTerms, sell: &OrderTerms) -> Result<Self, StatementError> {
        if buy.side != OrderSide::Buy || sell.side != OrderSide::Sell {
            return Err(StatementError::SideMismatch);
        }

        if buy.price < sell.price {
            return Err(StatementError::NotCrossing);
        }

        let (amount, price) = derive_settlement_arithmetic(buy, sell)?;
        Ok(Self { amount, price })
    }

    /// Compute the commitment binding these terms
    ///
    /// `settlementCommitment = Hash(settlementAmount, settlementPrice)`
    pub fn compute_commitment(&self) -> Scalar {
        compute_poseidon_hash(&[Scalar::from(self.amount), Scalar::from(self.price)])
    }
}

/// The raw midpoint/min arithmetic, shared by derivation and re-validation
fn derive_settlement_arithmetic(
    buy: &OrderTerms,
    sell: &OrderTerms,
) -> Result<(Amount, Price), StatementError> {
    // Overflow-safe midpoint: a/2 + b/2 + carry of the two low bits
    let low_bits = (buy.price & 1) + (sell.price & 1);
    if low_bits == 1 {
        return Err(StatementError::OddPriceSum);
    }

    let price = (buy.price / 2) + (sell.price / 2) + (low_bits / 2);
    let amount = Amount::min(buy.amount, sell.amount);
    Ok((amount, price))
}
