//! Abstracts routing logic from the HTTP server

use std::{collections::HashMap, iter};

use async_trait::async_trait;
use hyper::{Body, Method, Request, Response, StatusCode, Uri};
use itertools::Itertools;
use matchit::Router as MatchRouter;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::error::ApiServerError;

/// A type alias for URL generic params maps, i.e. /path/to/resource/:id
pub(super) type UrlParams = HashMap<String, String>;
/// A type alias for query params, i.e. /path/to/resource?id=123
pub(super) type QueryParams = HashMap<String, String>;

/// The maximum time an OPTIONS request to the HTTP API may be cached; above
/// the default of 5 seconds to avoid unnecessary pre-flights
const PREFLIGHT_CACHE_TIME: &str = "7200"; // 2 hours, Chromium max
/// Error message returned when query params are invalid
const ERR_INVALID_QUERY_PARAMS: &str = "invalid query params";

// -----------
// | Helpers |
// -----------

/// Builds an HTTP 400 (Bad Request) response
pub(super) fn build_400_response(err: String) -> Response<Body> {
    Response::builder().status(StatusCode::BAD_REQUEST).body(Body::from(err)).unwrap()
}

/// Builds an HTTP 404 (Not Found) response
pub(super) fn build_404_response(err: String) -> Response<Body> {
    Response::builder().status(StatusCode::NOT_FOUND).body(Body::from(err)).unwrap()
}

/// Builds an HTTP 500 (Internal Server Error) response
pub(super) fn build_500_response(err: String) -> Response<Body> {
    Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).body(Body::from(err)).unwrap()
}

/// Builds an HTTP response with the given status code
pub(super) fn build_response_from_status_code(
    status_code: StatusCode,
    err: String,
) -> Response<Body> {
    Response::builder().status(status_code).body(Body::from(err)).unwrap()
}

/// Parse key value pairs from a query params string
fn parse_query_params(query_str: &str) -> Result<QueryParams, &'static str> {
    if query_str.is_empty() {
        return Ok(QueryParams::new());
    }

    let mut params = QueryParams::new();
    for param in query_str.split('&') {
        let (key, value) = param.split_once('=').ok_or(ERR_INVALID_QUERY_PARAMS)?;
        params.insert(key.to_string(), value.to_string());
    }

    Ok(params)
}

// -------------------------
// | Trait Implementations |
// -------------------------

/// A handler is attached to a route and handles the process of translating an
/// abstract request type into a response
#[async_trait]
pub trait Handler: Send + Sync {
    /// The handler method for the request/response on the handler's route
    async fn handle(
        &self,
        req: Request<Body>,
        url_params: UrlParams,
        query_params: QueryParams,
    ) -> Response<Body>;
}

/// A handler that has associated Request/Response type information attached to
/// it. We implement this as a subtrait so that the router can store trait
/// objects (associated types are disallowed on trait objects) as Handler that
/// concretely re-use the default serialization/deserialization logic below
#[async_trait]
pub trait TypedHandler: Send + Sync {
    /// The request type that the handler consumes
    type Request: DeserializeOwned + for<'de> Deserialize<'de>;
    /// The response type that the handler returns
    type Response: Serialize + Send;

    /// The handler logic, translate request into response
    async fn handle_typed(
        &self,
        req: Self::Request,
        url_params: UrlParams,
        query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError>;
}

/// Auto-implementation of the Handler trait for a TypedHandler which covers the
/// process of deserializing the request, reporting errors, and serializing the
/// response into a body
#[async_trait]
impl<
    Req: DeserializeOwned + for<'de> Deserialize<'de> + Send,
    Resp: Serialize,
    T: TypedHandler<Request = Req, Response = Resp>,
> Handler for T
{
    async fn handle(
        &self,
        req: Request<Body>,
        url_params: UrlParams,
        query_params: QueryParams,
    ) -> Response<Body> {
        // Deserialize the request into the request type, return HTTP 400 if
        // deserialization fails
        let req_body_bytes = hyper::body::to_bytes(req.into_body()).await;
        if let Err(e) = req_body_bytes {
            return build_400_response(e.to_string());
        }

        let mut unwrapped: &[u8] = &req_body_bytes.unwrap(); // Necessary to explicitly hold temporary value
        if unwrapped.is_empty() {
            // If no HTTP body data was passed, replace the data with "null". Serde expects
            // "null" as the serialized version of an empty struct
            unwrapped = "null".as_bytes();
        }
        let deserialized = serde_json::from_reader(unwrapped);
        if let Err(e) = deserialized {
            return build_400_response(e.to_string());
        }

        let req_body: Req = deserialized.unwrap();

        // Forward to the typed handler; all responses allow cross-origin
        // requests, as clients connecting to a locally-run node have a
        // different origin port
        let res = self.handle_typed(req_body, url_params, query_params).await;
        let builder = Response::builder().header("Access-Control-Allow-Origin", "*");
        match res {
            Ok(resp) => builder.body(Body::from(serde_json::to_vec(&resp).unwrap())).unwrap(),
            Err(ApiServerError::HttpStatusCode(status, msg)) => {
                builder.status(status).body(Body::from(msg)).unwrap()
            },
            Err(_) => {
                builder.status(StatusCode::INTERNAL_SERVER_ERROR).body(Body::empty()).unwrap()
            },
        }
    }
}

// ----------
// | Router |
// ----------

/// Wrapper around a matchit router that allows different HTTP request types to
/// be matched
pub struct Router {
    /// The underlying router
    router: MatchRouter<Box<dyn Handler>>,
}

impl Router {
    /// Create a new router with no routes established
    pub fn new() -> Self {
        Self { router: MatchRouter::new() }
    }

    /// Helper to build a routable path from a method and a concrete route
    ///
    /// The `matchit::Router` works only on URLs directly; so we prepend the
    /// operation type to the URL when creating the route
    ///
    /// Concretely, if POST is valid to /route then we route to /POST/route
    fn create_full_route(method: &Method, mut route: String) -> String {
        // Prepend a "/" if not already done
        if !route.starts_with('/') {
            route = String::from("/") + &route;
        }

        format!("/{method}{route}")
    }

    /// Add a route to the router
    pub fn add_route<H: Handler + 'static>(&mut self, method: &Method, route: String, handler: H) {
        debug!("attached handler to route {route} with method {method}");
        let full_route = Self::create_full_route(method, route);

        self.router
            .insert(full_route, Box::new(handler))
            .expect("error attaching handler to route");
    }

    /// Route a request to a handler
    #[instrument(skip_all, fields(
        http.status_code,
        http.method = %method,
        http.route = %route,
    ))]
    pub async fn handle_req(
        &self,
        method: Method,
        route: Uri,
        req: Request<Body>,
    ) -> Response<Body> {
        let path = route.path();
        let res = if method == Method::OPTIONS {
            // If the request is an options request, handle it directly
            self.handle_options_req(path)
        } else {
            // Get the full routable path
            let full_route = Self::create_full_route(&method, path.to_string());

            // Dispatch to handler
            if let Ok(matched_path) = self.router.at(&full_route) {
                let handler = matched_path.value;
                let params = matched_path.params;

                // Clone the params to take ownership
                let mut params_map = HashMap::with_capacity(params.len());
                for (key, value) in params.iter() {
                    params_map.insert(key.to_string(), value.to_string());
                }

                // Parse query params
                let query_params = match parse_query_params(route.query().unwrap_or("")) {
                    Ok(params) => params,
                    Err(e) => {
                        return build_400_response(e.to_string());
                    },
                };

                handler.as_ref().handle(req, params_map, query_params).await
            } else {
                build_404_response(format!("Route {route} for method {method} not found"))
            }
        };

        tracing::Span::current().record("http.status_code", res.status().as_str());

        res
    }

    /// Handle an options request
    fn handle_options_req(&self, route: &str) -> Response<Body> {
        // Get the set of allowed methods for this route
        let allowed_methods = vec![Method::GET, Method::POST]
            .into_iter()
            .filter_map(|method: Method| {
                let full_route = Self::create_full_route(&method, route.to_owned());
                self.router.at(&full_route).ok()?;
                Some(method)
            })
            // All routes allow OPTIONS
            .chain(iter::once(Method::OPTIONS))
            .collect_vec();

        // Combine the allowed methods into a comma separated string
        let allowed_methods_str = allowed_methods.iter().map(|method| method.as_str()).join(",");

        Response::builder()
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Headers", "*")
            .header("Access-Control-Allow-Methods", allowed_methods_str)
            .header("Access-Control-Allow-Credentials", "true")
            .header("Access-Control-Max-Age", PREFLIGHT_CACHE_TIME)
            .body(Body::from(""))
            .unwrap()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use hyper::{Body, Method, Request, StatusCode, Uri};
    use serde::{Deserialize, Serialize};

    use super::{QueryParams, Router, TypedHandler, UrlParams};
    use crate::error::ApiServerError;

    /// A handler echoing back the captured URL param
    struct EchoHandler;

    /// The response type of the echo handler
    #[derive(Serialize, Deserialize)]
    struct EchoResponse {
        /// The URL param captured by the route
        name: String,
    }

    #[async_trait]
    impl TypedHandler for EchoHandler {
        type Request = ();
        type Response = EchoResponse;

        async fn handle_typed(
            &self,
            _req: Self::Request,
            url_params: UrlParams,
            _query_params: QueryParams,
        ) -> Result<Self::Response, ApiServerError> {
            Ok(EchoResponse { name: url_params.get("name").cloned().unwrap_or_default() })
        }
    }

    /// Build a router with the echo handler attached at "/echo/:name"
    fn echo_router() -> Router {
        let mut router = Router::new();
        router.add_route(&Method::GET, "/echo/:name".to_string(), EchoHandler);
        router
    }

    /// Tests dispatch to a matched route with a URL capture
    #[tokio::test]
    async fn test_route_dispatch() {
        let router = echo_router();
        let uri: Uri = "/echo/duskpool".parse().unwrap();
        let req = Request::builder().uri(uri.clone()).body(Body::empty()).unwrap();

        let resp = router.handle_req(Method::GET, uri, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = hyper::body::to_bytes(resp.into_body()).await.unwrap();
        let echoed: EchoResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(echoed.name, "duskpool");
    }

    /// Tests that an unmatched route returns a 404
    #[tokio::test]
    async fn test_route_not_found() {
        let router = echo_router();
        let uri: Uri = "/missing".parse().unwrap();
        let req = Request::builder().uri(uri.clone()).body(Body::empty()).unwrap();

        let resp = router.handle_req(Method::GET, uri, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    /// Tests that a malformed query string returns a 400
    #[tokio::test]
    async fn test_invalid_query_params() {
        let router = echo_router();
        let uri: Uri = "/echo/duskpool?flag".parse().unwrap();
        let req = Request::builder().uri(uri.clone()).body(Body::empty()).unwrap();

        let resp = router.handle_req(Method::GET, uri, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
