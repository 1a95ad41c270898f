//! Market-data service: polled REST snapshots and the streaming feed.

pub mod codec;
pub mod rest;
pub mod stream;
pub mod types;

pub use codec::{HydromancerCodec, StreamMessage};
pub use rest::MarketDataClient;
pub use stream::{
    EventBus, EventKind, ListenerId, StreamClient, StreamConfig, StreamEvent, StreamStatus,
};
pub use types::{TickerUpdate, TradeUpdate};
