use crate::core::types::{BookLevel, OrderBookSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order book as the data API ships it: levels are bare [price, size] pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOrderBook {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
    pub timestamp: i64,
}

impl RawOrderBook {
    #[must_use]
    pub fn into_snapshot(self, symbol: &str) -> OrderBookSnapshot {
        OrderBookSnapshot {
            symbol: symbol.to_string(),
            bids: self.bids.into_iter().map(BookLevel::from).collect(),
            asks: self.asks.into_iter().map(BookLevel::from).collect(),
            timestamp: self.timestamp,
        }
    }
}

/// Streamed last-price tick for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerUpdate {
    pub symbol: String,
    pub price: Decimal,
}

/// Streamed public trade print.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub symbol: String,
    pub price: Decimal,
    pub size: Decimal,
    pub time: i64,
}
