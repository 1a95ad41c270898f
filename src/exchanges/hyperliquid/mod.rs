//! Exchange connector: signed order execution and account state.

pub mod conversions;
pub mod execution;
pub mod info;
pub mod nonce;
pub mod types;

pub use execution::{ExecutionClient, MAINNET_CHAIN_ID, TESTNET_CHAIN_ID};
pub use info::InfoClient;
pub use nonce::NonceSequencer;

/// Default exchange endpoints.
pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";
