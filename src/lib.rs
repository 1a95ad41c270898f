pub mod core;
pub mod exchanges;
pub mod session;
pub mod wallet;

pub use crate::core::config::ClientConfig;
pub use crate::core::errors::ClientError;
pub use crate::core::types::*;
pub use crate::exchanges::hydromancer::{
    EventKind, MarketDataClient, StreamClient, StreamConfig, StreamEvent, StreamStatus,
};
pub use crate::exchanges::hyperliquid::ExecutionClient;
pub use crate::session::SessionFacade;
pub use crate::wallet::KeyStore;
