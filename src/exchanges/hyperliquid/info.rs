use super::types::{InfoRequest, OpenOrder, UserState};
use crate::core::errors::ClientError;
use crate::core::kernel::RestClient;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::instrument;

/// Thin typed wrapper around the exchange's read-only info endpoint.
#[derive(Clone)]
pub struct InfoClient<R: RestClient> {
    rest: R,
}

impl<R: RestClient> InfoClient<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    /// Current mid-price per symbol. Unparsable entries are skipped.
    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    pub async fn all_mids(&self) -> Result<HashMap<String, Decimal>, ClientError> {
        let body = serde_json::to_value(InfoRequest::AllMids)?;
        let raw: HashMap<String, String> = self.rest.post_json("/info", &body).await?;
        Ok(raw
            .into_iter()
            .filter_map(|(symbol, px)| px.parse::<Decimal>().ok().map(|px| (symbol, px)))
            .collect())
    }

    /// Account and position state for a wallet address.
    #[instrument(skip(self), fields(exchange = "hyperliquid", user = %user))]
    pub async fn user_state(&self, user: &str) -> Result<UserState, ClientError> {
        let body = serde_json::to_value(InfoRequest::UserState {
            user: user.to_string(),
        })?;
        self.rest.post_json("/info", &body).await
    }

    /// Resting orders for a wallet address.
    #[instrument(skip(self), fields(exchange = "hyperliquid", user = %user))]
    pub async fn open_orders(&self, user: &str) -> Result<Vec<OpenOrder>, ClientError> {
        let body = serde_json::to_value(InfoRequest::OpenOrders {
            user: user.to_string(),
        })?;
        self.rest.post_json("/info", &body).await
    }
}
