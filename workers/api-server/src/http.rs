//! Groups handlers for the HTTP API

use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use async_trait::async_trait;
use circuit_types::Scalar;
use common::types::MatchIdentifier;
use darkpool_client::DarkpoolClient;
use external_api::{
    EmptyRequestResponse,
    http::{
        PING_ROUTE, PingResponse,
        matches::{GET_MATCH_ROUTE, SUBMIT_PAYLOAD_ROUTE},
        order::{CANCEL_ORDER_ROUTE, GET_ORDER_BOOK_ROUTE, REVEAL_ORDER_ROUTE},
        stats::GET_STATS_ROUTE,
    },
};
use hyper::{
    Body, Error as HyperError, Method, Request, Response, Server,
    server::conn::AddrStream,
    service::{make_service_fn, service_fn},
};
use util::get_current_time_millis;

use self::{
    matches::{GetMatchHandler, SubmitPayloadHandler},
    order::{CancelOrderHandler, GetOrderBookHandler, RevealOrderHandler},
    stats::GetStatsHandler,
};
use crate::{
    error::{ApiServerError, bad_request},
    router::{QueryParams, Router, TypedHandler, UrlParams},
    worker::ApiServerConfig,
};

mod matches;
mod order;
mod stats;

// ------------------
// | Error Messages |
// ------------------

/// Error message displayed when a commitment cannot be parsed from the URL
const ERR_COMMITMENT_PARSE: &str = "could not parse commitment";
/// Error message displayed when a match id cannot be parsed from the URL
const ERR_MATCH_ID_PARSE: &str = "could not parse match id";

// ----------------
// | URL Captures |
// ----------------

/// The :commitment param in a URL
const COMMITMENT_URL_PARAM: &str = "commitment";
/// The :match_id param in a URL
const MATCH_ID_URL_PARAM: &str = "match_id";

/// A helper to parse out an order commitment from a URL param
pub(super) fn parse_commitment_from_params(params: &UrlParams) -> Result<Scalar, ApiServerError> {
    let commitment_str = params
        .get(COMMITMENT_URL_PARAM)
        .ok_or_else(|| bad_request(ERR_COMMITMENT_PARSE.to_string()))?;

    Scalar::from_hex_string(commitment_str)
        .map_err(|_| bad_request(ERR_COMMITMENT_PARSE.to_string()))
}

/// A helper to parse out a match id from a URL param
pub(super) fn parse_match_id_from_params(
    params: &UrlParams,
) -> Result<MatchIdentifier, ApiServerError> {
    params
        .get(MATCH_ID_URL_PARAM)
        .ok_or_else(|| bad_request(ERR_MATCH_ID_PARSE.to_string()))?
        .parse()
        .map_err(|_| bad_request(ERR_MATCH_ID_PARSE.to_string()))
}

// ---------------
// | HTTP Server |
// ---------------

/// A wrapper around the router that the worker delegates requests to
#[derive(Clone)]
pub(super) struct HttpServer {
    /// The http router, used to dispatch requests to handlers
    router: Arc<Router>,
    /// The address the server binds to
    bind_addr: IpAddr,
    /// The port the server listens on
    http_port: u16,
}

impl HttpServer {
    /// Create a new http server with all routes registered
    pub(super) fn new<C: DarkpoolClient>(config: &ApiServerConfig<C>) -> Self {
        let router = Self::build_router(config);
        Self { router: Arc::new(router), bind_addr: config.bind_addr, http_port: config.http_port }
    }

    /// Build a router and register routes on it
    fn build_router<C: DarkpoolClient>(config: &ApiServerConfig<C>) -> Router {
        let mut router = Router::new();

        // The "/v0/ping" route
        router.add_route(&Method::GET, PING_ROUTE.to_string(), PingHandler::new());

        // The "/v0/order" route
        router.add_route(
            &Method::POST,
            REVEAL_ORDER_ROUTE.to_string(),
            RevealOrderHandler::new(config.matching_engine_queue.clone()),
        );

        // The "/v0/order/:commitment/cancel" route
        router.add_route(
            &Method::POST,
            CANCEL_ORDER_ROUTE.to_string(),
            CancelOrderHandler::new(config.matching_engine_queue.clone()),
        );

        // The "/v0/book" route
        router.add_route(
            &Method::GET,
            GET_ORDER_BOOK_ROUTE.to_string(),
            GetOrderBookHandler::new(config.book.clone()),
        );

        // The "/v0/match/:match_id" route
        router.add_route(
            &Method::GET,
            GET_MATCH_ROUTE.to_string(),
            GetMatchHandler::new(config.match_index.clone()),
        );

        // The "/v0/match/:match_id/payload" route
        router.add_route(
            &Method::POST,
            SUBMIT_PAYLOAD_ROUTE.to_string(),
            SubmitPayloadHandler::new(config.orchestrator_queue.clone()),
        );

        // The "/v0/stats" route
        router.add_route(
            &Method::GET,
            GET_STATS_ROUTE.to_string(),
            GetStatsHandler::new(
                config.book.clone(),
                config.match_index.clone(),
                config.darkpool_client.clone(),
            ),
        );

        router
    }

    /// The execution loop for the http server, accepts incoming connections,
    /// serves them, and awaits the next connection
    pub(super) async fn execution_loop(self) -> Result<(), ApiServerError> {
        // Build an HTTP handler callback
        // Clone self and move it into each layer of the callback so that each
        // scope has its own copy of self
        let self_clone = self.clone();
        let make_service = make_service_fn(move |_: &AddrStream| {
            let self_clone = self_clone.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let self_clone = self_clone.clone();
                    async move { Ok::<_, HyperError>(self_clone.serve_request(req).await) }
                }))
            }
        });

        // Build the http server and enter its execution loop
        let addr = SocketAddr::new(self.bind_addr, self.http_port);
        Server::bind(&addr)
            .serve(make_service)
            .await
            .map_err(|err| ApiServerError::HttpServerFailure(err.to_string()))
    }

    /// Serve an http request
    async fn serve_request(&self, req: Request<Body>) -> Response<Body> {
        self.router.handle_req(req.method().to_owned(), req.uri().to_owned(), req).await
    }
}

// ----------------
// | Ping Handler |
// ----------------

/// Handler for the ping route, returns a pong
#[derive(Clone, Debug, Default)]
pub struct PingHandler;
impl PingHandler {
    /// Create a new handler for "/v0/ping"
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait]
impl TypedHandler for PingHandler {
    type Request = EmptyRequestResponse;
    type Response = PingResponse;

    async fn handle_typed(
        &self,
        _req: Self::Request,
        _url_params: UrlParams,
        _query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError> {
        Ok(PingResponse { timestamp: get_current_time_millis() })
    }
}
