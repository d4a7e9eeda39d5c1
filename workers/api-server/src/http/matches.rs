//! Groups routes and handlers for match queries and settlement payload
//! submission

use async_trait::async_trait;
use common::types::r#match::TransferPayload;
use external_api::{
    EmptyRequestResponse,
    http::matches::{GetMatchResponse, SubmitPayloadRequest, SubmitPayloadResponse},
    types::ApiMatch,
};
use job_types::match_orchestrator::{OrchestratorQueue, new_payload_job};
use state::{MatchIndex, MatchIndexError};

use super::parse_match_id_from_params;
use crate::{
    error::{ApiServerError, bad_request, internal_error, not_found},
    router::{QueryParams, TypedHandler, UrlParams},
};

// ------------------
// | Error Messages |
// ------------------

/// Error displayed when no match record exists for the requested identifier
const ERR_MATCH_NOT_FOUND: &str = "no match with the given id";
/// Error displayed when the orchestrator's queue or response channel is
/// closed
const ERR_ORCHESTRATOR_UNAVAILABLE: &str = "match orchestrator unavailable";

// ------------------
// | Route Handlers |
// ------------------

/// Handler for the GET /v0/match/:match_id route
#[derive(Clone)]
pub struct GetMatchHandler {
    /// The shared index of match records
    match_index: MatchIndex,
}

impl GetMatchHandler {
    /// Constructor
    pub fn new(match_index: MatchIndex) -> Self {
        Self { match_index }
    }
}

#[async_trait]
impl TypedHandler for GetMatchHandler {
    type Request = EmptyRequestResponse;
    type Response = GetMatchResponse;

    async fn handle_typed(
        &self,
        _req: Self::Request,
        url_params: UrlParams,
        _query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError> {
        let match_id = parse_match_id_from_params(&url_params)?;
        let record = self
            .match_index
            .get(&match_id)
            .await
            .ok_or_else(|| not_found(ERR_MATCH_NOT_FOUND))?;

        Ok(GetMatchResponse { match_result: ApiMatch::from(&record) })
    }
}

/// Handler for the POST /v0/match/:match_id/payload route
#[derive(Clone)]
pub struct SubmitPayloadHandler {
    /// The job queue of the match orchestrator
    orchestrator_queue: OrchestratorQueue,
}

impl SubmitPayloadHandler {
    /// Constructor
    pub fn new(orchestrator_queue: OrchestratorQueue) -> Self {
        Self { orchestrator_queue }
    }
}

#[async_trait]
impl TypedHandler for SubmitPayloadHandler {
    type Request = SubmitPayloadRequest;
    type Response = SubmitPayloadResponse;

    async fn handle_typed(
        &self,
        req: Self::Request,
        url_params: UrlParams,
        _query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError> {
        let match_id = parse_match_id_from_params(&url_params)?;
        let payload = TransferPayload::new(req.payload);

        // The orchestrator owns all writes to match records; the handler only
        // relays the payload and reports the index's verdict
        let (job, response) = new_payload_job(match_id, req.role, payload);
        self.orchestrator_queue
            .send(job)
            .map_err(|_| internal_error(ERR_ORCHESTRATOR_UNAVAILABLE))?;
        let result = response.await.map_err(|_| internal_error(ERR_ORCHESTRATOR_UNAVAILABLE))?;

        let ready = result.map_err(|err| match err {
            MatchIndexError::UnknownMatch(..) => not_found(err),
            _ => bad_request(err),
        })?;

        Ok(SubmitPayloadResponse { match_id, role: req.role, ready })
    }
}
