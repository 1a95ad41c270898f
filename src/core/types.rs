use crate::core::errors::ClientError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position direction. Long maps to the buy side of the book, short to sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    #[must_use]
    pub const fn is_buy(self) -> bool {
        matches!(self, Self::Long)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    Isolated,
    Cross,
}

/// Latest snapshot of a tradable market. Refreshed in place on every poll;
/// no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub symbol: String,
    pub price: Decimal,
    pub change_24h: Decimal,
    pub volume_24h: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    #[serde(default)]
    pub funding_rate: Decimal,
    #[serde(default)]
    pub open_interest: Decimal,
    #[serde(default = "default_max_leverage")]
    pub max_leverage: u32,
}

const fn default_max_leverage() -> u32 {
    1
}

/// One price level of an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl From<(Decimal, Decimal)> for BookLevel {
    fn from((price, size): (Decimal, Decimal)) -> Self {
        Self { price, size }
    }
}

/// Point-in-time order book capture: bids descending, asks ascending, all
/// sizes positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
    pub timestamp: i64,
}

impl OrderBookSnapshot {
    /// Check the book-shape invariants.
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_ladder(&self.bids, Ordering::Descending, "bids")?;
        validate_ladder(&self.asks, Ordering::Ascending, "asks")?;
        Ok(())
    }

    /// Midpoint between best bid and best ask, when both sides are present.
    #[must_use]
    pub fn mid_price(&self) -> Option<Decimal> {
        let best_bid = self.bids.first()?.price;
        let best_ask = self.asks.first()?.price;
        Some((best_bid + best_ask) / Decimal::TWO)
    }
}

#[derive(Clone, Copy)]
enum Ordering {
    Ascending,
    Descending,
}

fn validate_ladder(
    levels: &[BookLevel],
    ordering: Ordering,
    label: &str,
) -> Result<(), ClientError> {
    for level in levels {
        if level.size <= Decimal::ZERO {
            return Err(ClientError::MalformedResponse(format!(
                "{} contain non-positive size at price {}",
                label, level.price
            )));
        }
    }
    let in_order = levels.windows(2).all(|pair| match ordering {
        Ordering::Ascending => pair[0].price < pair[1].price,
        Ordering::Descending => pair[0].price > pair[1].price,
    });
    if in_order {
        Ok(())
    } else {
        Err(ClientError::MalformedResponse(format!(
            "{} are not monotonic by price",
            label
        )))
    }
}

/// One OHLCV bar. Times are seconds and strictly increasing within a series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Check low <= open, close <= high.
    pub fn validate(&self) -> Result<(), ClientError> {
        let contained = |px: Decimal| self.low <= px && px <= self.high;
        if contained(self.open) && contained(self.close) {
            Ok(())
        } else {
            Err(ClientError::MalformedResponse(format!(
                "candle at {} violates low <= open,close <= high",
                self.time
            )))
        }
    }
}

/// A tracked exchange order. Status moves open -> filled or open -> cancelled
/// only on confirmed exchange state, never locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Option<Decimal>,
    pub size: Decimal,
    pub leverage: u32,
    pub status: OrderStatus,
    pub timestamp: i64,
}

/// Server-derived open position. A position with size zero does not exist as
/// a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub leverage: u32,
    pub margin_mode: MarginMode,
    pub pnl: Decimal,
    pub pnl_percentage: Decimal,
    pub liquidation_price: Option<Decimal>,
    pub timestamp: i64,
}

/// Account summary for the connected wallet. Always refreshed from the
/// exchange, never computed client-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub address: String,
    pub balance: Decimal,
    pub margin_used: Decimal,
    pub margin_available: Decimal,
    pub total_pnl: Decimal,
}

/// Parameters for placing an order.
#[derive(Debug, Clone)]
pub struct OrderTicket {
    pub symbol: String,
    pub side: Side,
    pub kind: OrderKind,
    pub size: Decimal,
    pub price: Option<Decimal>,
    pub leverage: Option<u32>,
}

/// Parameters for replacing a resting order. The replacement is a full order
/// description; unspecified fields are filled from the resting order.
#[derive(Debug, Clone)]
pub struct ModifyTicket {
    pub order_id: String,
    pub symbol: String,
    pub size: Option<Decimal>,
    pub price: Option<Decimal>,
}

/// Acknowledgement of a confirmed cancel. `reference` is the order id or
/// client id the cancel targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelAck {
    pub symbol: String,
    pub reference: String,
}

/// Streaming channels offered by the data feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Markets,
    Ticker,
    OrderBook,
    Trades,
}

impl Channel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Markets => "markets",
            Self::Ticker => "ticker",
            Self::OrderBook => "orderbook",
            Self::Trades => "trades",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership key of the streaming subscription set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub channel: Channel,
    pub symbol: Option<String>,
}

impl Subscription {
    #[must_use]
    pub fn new(channel: Channel, symbol: Option<String>) -> Self {
        Self { channel, symbol }
    }
}
