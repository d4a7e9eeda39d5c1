//! Groups API types for match queries and settlement payload submission

use circuit_types::Scalar;
use common::types::{MatchIdentifier, r#match::SettlementRole};
use serde::{Deserialize, Serialize};

use crate::types::ApiMatch;

// ---------------
// | HTTP Routes |
// ---------------

/// Fetch the public view of a match by its identifier
pub const GET_MATCH_ROUTE: &str = "/v0/match/:match_id";
/// Submit a bilateral transfer payload for one side of a match
pub const SUBMIT_PAYLOAD_ROUTE: &str = "/v0/match/:match_id/payload";

// -------------
// | API Types |
// -------------

/// The response type to fetch a match by its identifier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetMatchResponse {
    /// The public view of the match
    pub match_result: ApiMatch,
}

/// The request type to submit a settlement payload
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitPayloadRequest {
    /// The role the submitting counterparty plays in the match
    pub role: SettlementRole,
    /// The opaque transfer payload, as a sequence of field elements
    pub payload: Vec<Scalar>,
}

/// The response type after a settlement payload is accepted
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitPayloadResponse {
    /// The identifier of the match
    pub match_id: MatchIdentifier,
    /// The role the payload was recorded under
    pub role: SettlementRole,
    /// Whether both roles have now supplied payloads
    pub ready: bool,
}
