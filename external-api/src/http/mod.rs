//! Groups API types for the HTTP API

use serde::{Deserialize, Serialize};

pub mod matches;
pub mod order;
pub mod stats;

/// Health check
pub const PING_ROUTE: &str = "/v0/ping";

/// A ping response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PingResponse {
    /// The timestamp when the response is sent
    pub timestamp: u64,
}
