use super::types::RawOrderBook;
use crate::core::errors::ClientError;
use crate::core::kernel::RestClient;
use crate::core::types::{Candle, Market, OrderBookSnapshot};
use futures_util::future::try_join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::instrument;

/// Stateless typed wrapper over the market-data API.
///
/// Pure request/response translation; the only state is the underlying HTTP
/// configuration. Responses are validated against the book and candle
/// invariants before they reach callers.
#[derive(Clone)]
pub struct MarketDataClient<R: RestClient> {
    rest: R,
}

impl<R: RestClient> MarketDataClient<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// All listed symbols.
    #[instrument(skip(self), fields(service = "hydromancer"))]
    pub async fn get_symbols(&self) -> Result<Vec<String>, ClientError> {
        self.rest.get_json("/api/symbols", &[]).await
    }

    /// Latest snapshot for one market.
    #[instrument(skip(self), fields(service = "hydromancer", symbol = %symbol))]
    pub async fn get_market(&self, symbol: &str) -> Result<Market, ClientError> {
        self.rest
            .get_json(&format!("/api/market/{}", symbol), &[])
            .await
    }

    /// Snapshots for the first `limit` listed symbols, fetched concurrently.
    #[instrument(skip(self), fields(service = "hydromancer", limit = limit))]
    pub async fn get_markets(&self, limit: usize) -> Result<Vec<Market>, ClientError> {
        let mut symbols = self.get_symbols().await?;
        symbols.truncate(limit);
        try_join_all(symbols.iter().map(|symbol| self.get_market(symbol))).await
    }

    /// Current mid-price per symbol.
    #[instrument(skip(self), fields(service = "hydromancer"))]
    pub async fn get_mids(&self) -> Result<HashMap<String, Decimal>, ClientError> {
        self.rest.get_json("/api/mids", &[]).await
    }

    /// Candle series for a symbol at the given interval (e.g. "1h").
    #[instrument(skip(self), fields(service = "hydromancer", symbol = %symbol, interval = %interval))]
    pub async fn get_candles(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<Vec<Candle>, ClientError> {
        let candles: Vec<Candle> = self
            .rest
            .get_json(&format!("/api/candles/{}", symbol), &[("interval", interval)])
            .await?;

        let mut last_time = i64::MIN;
        for candle in &candles {
            candle.validate()?;
            if candle.time <= last_time {
                return Err(ClientError::MalformedResponse(format!(
                    "candle series for {} is not strictly increasing in time",
                    symbol
                )));
            }
            last_time = candle.time;
        }
        Ok(candles)
    }

    /// Order book snapshot for a symbol.
    #[instrument(skip(self), fields(service = "hydromancer", symbol = %symbol))]
    pub async fn get_order_book(&self, symbol: &str) -> Result<OrderBookSnapshot, ClientError> {
        let raw: RawOrderBook = self
            .rest
            .get_json(&format!("/api/orderbook/{}", symbol), &[])
            .await?;
        let snapshot = raw.into_snapshot(symbol);
        snapshot.validate()?;
        Ok(snapshot)
    }
}
