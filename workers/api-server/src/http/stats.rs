//! Route handler for aggregate pool statistics

use async_trait::async_trait;
use darkpool_client::DarkpoolClient;
use external_api::{EmptyRequestResponse, http::stats::GetStatsResponse};
use state::{MatchIndex, SharedOrderBook};

use crate::{
    error::{ApiServerError, internal_error},
    router::{QueryParams, TypedHandler, UrlParams},
};

/// Handler for the GET /v0/stats route
#[derive(Clone)]
pub struct GetStatsHandler<C: DarkpoolClient> {
    /// The shared handle to the resting order book
    book: SharedOrderBook,
    /// The shared index of match records
    match_index: MatchIndex,
    /// The client on which to query ledger state
    darkpool_client: C,
}

impl<C: DarkpoolClient> GetStatsHandler<C> {
    /// Constructor
    pub fn new(book: SharedOrderBook, match_index: MatchIndex, darkpool_client: C) -> Self {
        Self { book, match_index, darkpool_client }
    }
}

#[async_trait]
impl<C: DarkpoolClient> TypedHandler for GetStatsHandler<C> {
    type Request = EmptyRequestResponse;
    type Response = GetStatsResponse;

    async fn handle_typed(
        &self,
        _req: Self::Request,
        _url_params: UrlParams,
        _query_params: QueryParams,
    ) -> Result<Self::Response, ApiServerError> {
        let book = self.book.stats().await;
        let matches = self.match_index.stats().await;
        let ledger_root = self.darkpool_client.get_root().await.map_err(internal_error)?;
        let leaf_count = self.darkpool_client.get_leaf_count().await.map_err(internal_error)?;

        Ok(GetStatsResponse {
            active_orders: book.active_orders,
            active_buys: book.active_buys,
            active_sells: book.active_sells,
            orders_revealed: book.orders_revealed,
            orders_cancelled: book.orders_cancelled,
            orders_dropped: book.orders_dropped,
            matches_found: matches.matches_found,
            matches_settled: matches.matches_settled,
            matches_failed: matches.matches_failed,
            ledger_root,
            leaf_count,
        })
    }
}
