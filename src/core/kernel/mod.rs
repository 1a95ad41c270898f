//! Transport kernel shared by both service clients.
//!
//! The kernel is service-agnostic: it knows how to speak HTTP and WebSocket,
//! but nothing about markets or orders. Service-specific shapes live in the
//! `exchanges` modules, plugged in through the [`WsCodec`] trait and typed
//! `RestClient` calls.

pub mod codec;
pub mod rest;
pub mod ws;

pub use codec::WsCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use ws::TungsteniteWs;
