//! Groups routes and handlers for order reveal, cancellation, and book
//! queries

use async_trait::async_trait;
use circuit_types::order::OrderTerms;
use common::types::order::RevealedOrder;
use external_api::{
    EmptyRequestResponse,
    http::order::{
        CancelOrderRequest, CancelOrderResponse, GetOrderBookResponse, RevealOrderRequest,
        RevealOrderResponse,
    },
    types::parse_decimal,
};
use itertools::Itertools;
use job_types::matching_engine::{MatchingEngineQueue, new_cancel_order_job, new_place_order_job};
use state::{CancelRejection, SharedOrderBook};

use super::parse_commitment_from_params;
use crate::{
    error::{ApiServerError, bad_request, internal_error, not_found, unauthorized},
    router::{QueryParams, TypedHandler, UrlParams},
};

// ------------------
// | Error Messages |
// ------------------

/// Error displayed when the matching engine's queue or response channel is
/// closed
const ERR_ENGINE_UNAVAILABLE: &str = "matching engine unavailable";

// ------------------
// | Route Handlers |
// ------------------

/// Handler for the POST /v0/order route
#[derive(Clone)]
pub struct RevealOrderHandler {
    /// The job queue of the matching engine
    matching_engine_queue: MatchingEngineQueue,
}

impl RevealOrderHandler {
    /// Constructor
    pub fn new(matching_engine_queue: MatchingEngineQueue) -> Self {
        Self { matching_engine_queue }
    }
}

#[async_trait]
impl TypedHandler for RevealOrderHandler {
    type Request = RevealOrderRequest;
    type Response = RevealOrderResponse;

    async fn handle_typed(
        &self,
        req: Self::Request,
        _url_params: UrlParams,
        _query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError> {
        // Parse the decimal string fields before anything reaches the engine
        let price = parse_decimal(&req.price).map_err(bad_request)?;
        let amount = parse_decimal(&req.amount).map_err(bad_request)?;

        let terms = OrderTerms { side: req.direction, price, amount, nonce: req.nonce };
        let order = RevealedOrder::new(terms, req.commitment, req.trader_id, req.owner_pub_key);

        // Forward to the engine and await its verdict; a dropped response
        // channel means the engine failed internally
        let (job, response) = new_place_order_job(order);
        self.matching_engine_queue
            .send(job)
            .map_err(|_| internal_error(ERR_ENGINE_UNAVAILABLE))?;
        let result = response.await.map_err(|_| internal_error(ERR_ENGINE_UNAVAILABLE))?;

        let book_order = result.map_err(bad_request)?;
        Ok(RevealOrderResponse {
            commitment: book_order.commitment,
            received_at: book_order.received_at,
        })
    }
}

/// Handler for the POST /v0/order/:commitment/cancel route
#[derive(Clone)]
pub struct CancelOrderHandler {
    /// The job queue of the matching engine
    matching_engine_queue: MatchingEngineQueue,
}

impl CancelOrderHandler {
    /// Constructor
    pub fn new(matching_engine_queue: MatchingEngineQueue) -> Self {
        Self { matching_engine_queue }
    }
}

#[async_trait]
impl TypedHandler for CancelOrderHandler {
    type Request = CancelOrderRequest;
    type Response = CancelOrderResponse;

    async fn handle_typed(
        &self,
        req: Self::Request,
        url_params: UrlParams,
        _query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError> {
        let commitment = parse_commitment_from_params(&url_params)?;

        let (job, response) = new_cancel_order_job(commitment, req.trader_id);
        self.matching_engine_queue
            .send(job)
            .map_err(|_| internal_error(ERR_ENGINE_UNAVAILABLE))?;
        let result = response.await.map_err(|_| internal_error(ERR_ENGINE_UNAVAILABLE))?;

        let cancelled_at = result.map_err(|rejection| match rejection {
            CancelRejection::UnknownOrder => not_found(rejection),
            CancelRejection::NotOwner => unauthorized(rejection),
        })?;

        Ok(CancelOrderResponse { commitment, cancelled_at })
    }
}

/// Handler for the GET /v0/book route
#[derive(Clone)]
pub struct GetOrderBookHandler {
    /// The shared handle to the resting order book
    book: SharedOrderBook,
}

impl GetOrderBookHandler {
    /// Constructor
    pub fn new(book: SharedOrderBook) -> Self {
        Self { book }
    }
}

#[async_trait]
impl TypedHandler for GetOrderBookHandler {
    type Request = EmptyRequestResponse;
    type Response = GetOrderBookResponse;

    async fn handle_typed(
        &self,
        _req: Self::Request,
        _url_params: UrlParams,
        _query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError> {
        let orders = self.book.public_view().await.into_iter().map(Into::into).collect_vec();
        Ok(GetOrderBookResponse { orders })
    }
}

#[cfg(test)]
mod test {
    use circuit_types::{
        Scalar,
        order::{OrderSide, OrderTerms},
    };
    use common::types::order::RevealedOrder;
    use external_api::{
        EmptyRequestResponse, http::order::CancelOrderRequest, types::ApiRevealedOrder,
    };
    use hyper::StatusCode;
    use job_types::matching_engine::{MatchingEngineJob, new_matching_engine_queue};
    use rand::thread_rng;
    use state::{BookOrder, CancelRejection, OrderRejection, SharedOrderBook};
    use system_bus::SystemBus;

    use super::{CancelOrderHandler, GetOrderBookHandler, RevealOrderHandler};
    use crate::{
        error::ApiServerError,
        http::COMMITMENT_URL_PARAM,
        router::{QueryParams, TypedHandler, UrlParams},
    };

    /// The wire form of a valid buy order reveal
    fn reveal_request() -> ApiRevealedOrder {
        let mut rng = thread_rng();
        let terms = OrderTerms {
            side: OrderSide::Buy,
            price: 1000,
            amount: 500,
            nonce: Scalar::random(&mut rng),
        };

        ApiRevealedOrder {
            direction: terms.side,
            price: terms.price.to_string(),
            amount: terms.amount.to_string(),
            nonce: terms.nonce,
            commitment: terms.compute_commitment(),
            trader_id: "buyer".to_string(),
            owner_pub_key: Scalar::from(1u8),
        }
    }

    /// The URL params of a cancel request for the given commitment
    fn cancel_params(commitment: Scalar) -> UrlParams {
        let mut params = UrlParams::new();
        params.insert(COMMITMENT_URL_PARAM.to_string(), commitment.to_hex_string());
        params
    }

    /// Assert that the given result is an http error with the given status
    fn assert_status<T>(res: Result<T, ApiServerError>, expected: StatusCode) {
        match res {
            Err(ApiServerError::HttpStatusCode(status, _)) => assert_eq!(status, expected),
            _ => panic!("expected an http status error"),
        }
    }

    /// Tests the reveal handler against an engine that admits the order
    #[tokio::test]
    async fn test_reveal_order_accepted() {
        let (queue, mut recv) = new_matching_engine_queue();
        let handler = RevealOrderHandler::new(queue);

        // Stand in for the engine: admit whatever arrives
        tokio::spawn(async move {
            let MatchingEngineJob::PlaceOrder { order, response } = recv.recv().await.unwrap()
            else {
                panic!("expected a place order job");
            };
            let book_order = BookOrder {
                commitment: order.commitment,
                side: order.side(),
                price: order.terms.price,
                trader_id: order.trader_id.clone(),
                received_at: order.received_at,
            };
            response.send(Ok(book_order)).unwrap();
        });

        let req = reveal_request();
        let commitment = req.commitment;
        let resp =
            handler.handle_typed(req, UrlParams::new(), QueryParams::new()).await.unwrap();
        assert_eq!(resp.commitment, commitment);
    }

    /// Tests that a malformed decimal field is rejected before the engine
    /// sees it
    #[tokio::test]
    async fn test_reveal_order_malformed_price() {
        let (queue, recv) = new_matching_engine_queue();
        let handler = RevealOrderHandler::new(queue);

        let mut req = reveal_request();
        req.price = "12.5".to_string();
        let res = handler.handle_typed(req, UrlParams::new(), QueryParams::new()).await;
        assert_status(res, StatusCode::BAD_REQUEST);

        // The job queue must not have been touched
        assert!(recv.is_empty());
    }

    /// Tests that an engine rejection surfaces as a bad request
    #[tokio::test]
    async fn test_reveal_order_rejected() {
        let (queue, mut recv) = new_matching_engine_queue();
        let handler = RevealOrderHandler::new(queue);

        tokio::spawn(async move {
            let MatchingEngineJob::PlaceOrder { response, .. } = recv.recv().await.unwrap()
            else {
                panic!("expected a place order job");
            };
            response.send(Err(OrderRejection::DuplicateCommitment)).unwrap();
        });

        let res =
            handler.handle_typed(reveal_request(), UrlParams::new(), QueryParams::new()).await;
        assert_status(res, StatusCode::BAD_REQUEST);
    }

    /// Tests that an engine that hangs up maps to an internal error
    #[tokio::test]
    async fn test_reveal_order_engine_hangup() {
        let (queue, mut recv) = new_matching_engine_queue();
        let handler = RevealOrderHandler::new(queue);

        tokio::spawn(async move {
            let MatchingEngineJob::PlaceOrder { response, .. } = recv.recv().await.unwrap()
            else {
                panic!("expected a place order job");
            };
            drop(response);
        });

        let res =
            handler.handle_typed(reveal_request(), UrlParams::new(), QueryParams::new()).await;
        assert_status(res, StatusCode::INTERNAL_SERVER_ERROR);
    }

    /// Tests the status codes of cancellation rejections
    #[tokio::test]
    async fn test_cancel_order_rejections() {
        for (rejection, expected) in [
            (CancelRejection::UnknownOrder, StatusCode::NOT_FOUND),
            (CancelRejection::NotOwner, StatusCode::UNAUTHORIZED),
        ] {
            let (queue, mut recv) = new_matching_engine_queue();
            let handler = CancelOrderHandler::new(queue);

            tokio::spawn(async move {
                let MatchingEngineJob::CancelOrder { response, .. } = recv.recv().await.unwrap()
                else {
                    panic!("expected a cancel order job");
                };
                response.send(Err(rejection)).unwrap();
            });

            let req = CancelOrderRequest { trader_id: "buyer".to_string() };
            let res = handler
                .handle_typed(req, cancel_params(Scalar::from(7u8)), QueryParams::new())
                .await;
            assert_status(res, expected);
        }
    }

    /// Tests a successful owner cancellation
    #[tokio::test]
    async fn test_cancel_order_success() {
        let (queue, mut recv) = new_matching_engine_queue();
        let handler = CancelOrderHandler::new(queue);

        tokio::spawn(async move {
            let MatchingEngineJob::CancelOrder { response, .. } = recv.recv().await.unwrap()
            else {
                panic!("expected a cancel order job");
            };
            response.send(Ok(1234)).unwrap();
        });

        let commitment = Scalar::from(7u8);
        let req = CancelOrderRequest { trader_id: "buyer".to_string() };
        let resp = handler
            .handle_typed(req, cancel_params(commitment), QueryParams::new())
            .await
            .unwrap();
        assert_eq!(resp.commitment, commitment);
        assert_eq!(resp.cancelled_at, 1234);
    }

    /// Tests the book listing against an empty and a populated book
    #[tokio::test]
    async fn test_get_order_book() {
        let bus = SystemBus::new();
        let book = SharedOrderBook::new(bus);
        let handler = GetOrderBookHandler::new(book.clone());

        let resp = handler
            .handle_typed(EmptyRequestResponse::default(), UrlParams::new(), QueryParams::new())
            .await
            .unwrap();
        assert!(resp.orders.is_empty());

        // Admit an order and list again
        let mut rng = thread_rng();
        let terms = OrderTerms {
            side: OrderSide::Sell,
            price: 900,
            amount: 5,
            nonce: Scalar::random(&mut rng),
        };
        let commitment = terms.compute_commitment();
        let order = RevealedOrder::new(terms, commitment, "seller".to_string(), Scalar::from(2u8));
        book.add_order(&order).await.unwrap();

        let resp = handler
            .handle_typed(EmptyRequestResponse::default(), UrlParams::new(), QueryParams::new())
            .await
            .unwrap();
        assert_eq!(resp.orders.len(), 1);
        assert_eq!(resp.orders[0].commitment, commitment);
    }
}
