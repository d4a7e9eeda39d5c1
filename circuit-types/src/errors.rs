//! Error types for statement evaluation and public-signal decoding

use thiserror::Error;

/// The reasons a statement fails native evaluation
///
/// The variants deliberately distinguish the protocol's rejection classes so
/// that callers can surface a structured reason rather than a generic message
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StatementError {
    /// A commitment does not recompute from its revealed preimage
    #[error("commitment does not match revealed terms")]
    CommitmentMismatch,
    /// An order's price or amount is zero
    #[error("order price and amount must be positive")]
    NonPositiveTerms,
    /// A buy/sell pair does not cross
    #[error("orders do not cross: buy price below sell price")]
    NotCrossing,
    /// The two legs of a match have the wrong sides
    #[error("match legs must be one buy and one sell order")]
    SideMismatch,
    /// The price sum is odd, so no exact integer midpoint exists
    #[error("price sum is odd; no exact midpoint price exists")]
    OddPriceSum,
    /// The claimed settlement amount is not the minimum of the leg amounts
    #[error("settlement amount does not equal the smaller order amount")]
    AmountMismatch,
    /// The claimed settlement price is not the midpoint of the leg prices
    #[error("settlement price does not equal the midpoint price")]
    PriceMismatch,
    /// An accumulator opening does not fold to the claimed root
    #[error("merkle opening does not produce the claimed root")]
    RootMismatch,
    /// A claimed denomination is outside the allowed set
    #[error("denomination is not one of the allowed deposit amounts")]
    InvalidDenomination,
    /// A nullifier does not derive from the claimed secret
    #[error("nullifier does not derive from the deposit secret")]
    NullifierMismatch,
}

/// Errors decoding a statement from its public signals
#[derive(Clone, Debug, Error)]
pub enum SignalsError {
    /// The signal vector has the wrong length for the circuit
    #[error("expected {expected} public signals, got {actual}")]
    Length {
        /// The number of signals the circuit publishes
        expected: usize,
        /// The number of signals received
        actual: usize,
    },
    /// A signal value does not fit the statement field it encodes
    #[error("public signal out of range: {0}")]
    OutOfRange(String),
}
