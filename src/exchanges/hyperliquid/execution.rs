use super::info::InfoClient;
use super::nonce::NonceSequencer;
use super::types::{
    ActionResponse, ActionStatus, CancelByCloidRequest, CancelRequest, ExchangeRequest,
    LimitOrder, ModifyRequest, OrderRequest, OrderType, TimeInForce, TriggerOrder,
};
use crate::core::errors::ClientError;
use crate::core::kernel::RestClient;
use crate::core::types::{
    CancelAck, ModifyTicket, Order, OrderKind, OrderStatus, OrderTicket, Side,
};
use crate::wallet::typed_data::{keccak256, Agent, Eip712Domain};
use crate::wallet::KeyStore;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const MAINNET_CHAIN_ID: u64 = 42_161;
pub const TESTNET_CHAIN_ID: u64 = 421_614;

/// Lifecycle of one signed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionPhase {
    Built,
    Signed,
    Submitted,
    Accepted,
    Rejected,
}

/// Builds, signs, and submits exchange actions for one wallet identity.
///
/// The client exists only while an identity is bound; its nonce sequencer is
/// shared across clones so concurrent submissions stay strictly ordered.
/// Submissions are never retried: a failed trading action surfaces to the
/// caller rather than risking a duplicate order.
#[derive(Clone)]
pub struct ExecutionClient<R: RestClient> {
    rest: R,
    info: InfoClient<R>,
    keystore: Arc<KeyStore>,
    nonces: Arc<NonceSequencer>,
    domain: Eip712Domain,
    agent_source: &'static str,
    vault_address: Option<String>,
}

struct SubmittedAction {
    nonce: u64,
    response: ActionResponse,
}

impl<R: RestClient + Clone> ExecutionClient<R> {
    pub fn new(rest: R, keystore: Arc<KeyStore>, chain_id: u64) -> Self {
        Self {
            info: InfoClient::new(rest.clone()),
            rest,
            keystore,
            nonces: Arc::new(NonceSequencer::new()),
            domain: Eip712Domain::exchange(chain_id),
            agent_source: if chain_id == MAINNET_CHAIN_ID { "a" } else { "b" },
            vault_address: None,
        }
    }

    pub fn with_vault_address(mut self, vault_address: String) -> Self {
        self.vault_address = Some(vault_address);
        self
    }

    #[must_use]
    pub fn address(&self) -> &str {
        self.keystore.address()
    }

    /// Place an order. Market orders are routed as aggressive
    /// immediate-or-cancel limit orders priced off the current mid.
    #[instrument(skip(self, ticket), fields(exchange = "hyperliquid", symbol = %ticket.symbol, side = %ticket.side))]
    pub async fn place_order(&self, ticket: &OrderTicket) -> Result<Order, ClientError> {
        self.ensure_signing()?;
        validate_ticket(ticket)?;
        let leverage = ticket.leverage.unwrap_or(1);

        let (limit_px, order_type) = match ticket.kind {
            OrderKind::Market => {
                let mid = self.current_mid(&ticket.symbol).await?;
                let px = if ticket.side.is_buy() {
                    mid * dec!(1.05)
                } else {
                    mid * dec!(0.95)
                };
                (
                    px,
                    OrderType::Limit {
                        limit: LimitOrder {
                            tif: TimeInForce::Ioc,
                        },
                    },
                )
            }
            OrderKind::Limit => (
                ticket.price.unwrap_or_default(),
                OrderType::Limit {
                    limit: LimitOrder {
                        tif: TimeInForce::Gtc,
                    },
                },
            ),
            OrderKind::Stop => {
                let px = ticket.price.unwrap_or_default();
                (
                    px,
                    OrderType::Trigger {
                        trigger: TriggerOrder {
                            trigger_px: decimal_str(px),
                            is_market: true,
                            tpsl: "sl".to_string(),
                        },
                    },
                )
            }
        };

        let request = OrderRequest {
            coin: ticket.symbol.clone(),
            is_buy: ticket.side.is_buy(),
            sz: decimal_str(ticket.size),
            limit_px: decimal_str(limit_px),
            order_type,
            reduce_only: false,
        };
        let action = json!({
            "type": "order",
            "orders": [request],
            "grouping": "na",
        });

        let submitted = self.submit(action).await?;
        if !submitted.response.is_ok() {
            debug!(phase = ?ActionPhase::Rejected, "order rejected");
            return Err(ClientError::from_exchange_reason(
                submitted.response.rejection_reason(),
            ));
        }

        let (id, status) = match submitted.response.first_status() {
            Some(ActionStatus::Error { error }) => {
                debug!(phase = ?ActionPhase::Rejected, "order rejected");
                return Err(ClientError::from_exchange_reason(error.clone()));
            }
            Some(ActionStatus::Resting { resting }) => (resting.oid.to_string(), OrderStatus::Open),
            Some(ActionStatus::Filled { filled }) => (filled.oid.to_string(), OrderStatus::Filled),
            // No resting id (e.g. the order filled instantly and the server
            // omitted it): fall back to the action nonce, which is unique per
            // identity by construction.
            _ => (submitted.nonce.to_string(), OrderStatus::Open),
        };
        debug!(phase = ?ActionPhase::Accepted, order_id = %id, "order accepted");

        Ok(Order {
            id,
            symbol: ticket.symbol.clone(),
            side: ticket.side,
            kind: ticket.kind,
            price: Some(limit_px),
            size: ticket.size,
            leverage,
            status,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// Cancel a resting order by its exchange-assigned id.
    #[instrument(skip(self), fields(exchange = "hyperliquid", symbol = %symbol, oid = %order_id))]
    pub async fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<CancelAck, ClientError> {
        self.ensure_signing()?;
        let oid: u64 = order_id.parse().map_err(|_| {
            ClientError::InvalidParameters(format!("invalid order id: {}", order_id))
        })?;

        let cancel = CancelRequest {
            coin: symbol.to_string(),
            oid,
        };
        let action = json!({
            "type": "cancel",
            "cancels": [cancel],
        });

        let submitted = self.submit(action).await?;
        self.check_cancel_outcome(&submitted.response)?;
        Ok(CancelAck {
            symbol: symbol.to_string(),
            reference: order_id.to_string(),
        })
    }

    /// Cancel a resting order by the caller-assigned client id.
    #[instrument(skip(self), fields(exchange = "hyperliquid", symbol = %symbol, cloid = %client_id))]
    pub async fn cancel_order_by_client_id(
        &self,
        symbol: &str,
        client_id: &str,
    ) -> Result<CancelAck, ClientError> {
        self.ensure_signing()?;
        let cancel = CancelByCloidRequest {
            coin: symbol.to_string(),
            cloid: client_id.to_string(),
        };
        let action = json!({
            "type": "cancelByCloid",
            "cancels": [cancel],
        });

        let submitted = self.submit(action).await?;
        self.check_cancel_outcome(&submitted.response)?;
        Ok(CancelAck {
            symbol: symbol.to_string(),
            reference: client_id.to_string(),
        })
    }

    /// Replace a resting order. The protocol takes a complete replacement
    /// description, so the resting order is fetched first to recover its side
    /// and to fill any field the caller left unspecified.
    #[instrument(skip(self, ticket), fields(exchange = "hyperliquid", symbol = %ticket.symbol, oid = %ticket.order_id))]
    pub async fn modify_order(&self, ticket: &ModifyTicket) -> Result<Order, ClientError> {
        self.ensure_signing()?;
        let oid: u64 = ticket.order_id.parse().map_err(|_| {
            ClientError::InvalidParameters(format!("invalid order id: {}", ticket.order_id))
        })?;

        let existing = self
            .info
            .open_orders(self.keystore.address())
            .await?
            .into_iter()
            .find(|order| order.oid == oid)
            .ok_or_else(|| {
                ClientError::ExchangeRejected(format!("order {} is not resting", oid))
            })?;

        let side = if existing.side == "B" { Side::Long } else { Side::Short };
        let size = ticket
            .size
            .unwrap_or_else(|| existing.sz.parse().unwrap_or(Decimal::ZERO));
        let price = ticket
            .price
            .unwrap_or_else(|| existing.limit_px.parse().unwrap_or(Decimal::ZERO));
        if size <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(ClientError::InvalidParameters(
                "replacement order needs positive size and price".to_string(),
            ));
        }

        let replacement = OrderRequest {
            coin: ticket.symbol.clone(),
            is_buy: side.is_buy(),
            sz: decimal_str(size),
            limit_px: decimal_str(price),
            order_type: OrderType::Limit {
                limit: LimitOrder {
                    tif: TimeInForce::Gtc,
                },
            },
            reduce_only: false,
        };
        let modify = ModifyRequest {
            oid,
            order: replacement,
        };
        let action = json!({
            "type": "modify",
            "modifies": [modify],
        });

        let submitted = self.submit(action).await?;
        if !submitted.response.is_ok() {
            return Err(ClientError::from_exchange_reason(
                submitted.response.rejection_reason(),
            ));
        }
        if let Some(ActionStatus::Error { error }) = submitted.response.first_status() {
            return Err(ClientError::from_exchange_reason(error.clone()));
        }

        Ok(Order {
            id: ticket.order_id.clone(),
            symbol: ticket.symbol.clone(),
            side,
            kind: OrderKind::Limit,
            price: Some(price),
            size,
            leverage: 1,
            status: OrderStatus::Open,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    /// Signing actions need a full identity, checked before any I/O.
    fn ensure_signing(&self) -> Result<(), ClientError> {
        if self.keystore.can_sign() {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Latest mid for a symbol; required to price market orders.
    async fn current_mid(&self, symbol: &str) -> Result<Decimal, ClientError> {
        let mids = self.info.all_mids().await?;
        match mids.get(symbol) {
            Some(mid) if *mid > Decimal::ZERO => Ok(*mid),
            _ => Err(ClientError::NoMarketPrice(symbol.to_string())),
        }
    }

    /// Sign an action under a fresh nonce and submit it.
    async fn submit(&self, action: Value) -> Result<SubmittedAction, ClientError> {
        let nonce = self.nonces.next();
        debug!(phase = ?ActionPhase::Built, nonce, "action built");

        let connection_id = connection_id(&action, nonce, self.vault_address.as_deref())?;
        let agent = Agent {
            source: self.agent_source.to_string(),
            connection_id,
        };
        let signature = self.keystore.sign_typed(&self.domain, &agent)?;
        debug!(phase = ?ActionPhase::Signed, nonce, "action signed");

        let envelope = ExchangeRequest {
            action,
            nonce,
            signature,
            vault_address: self.vault_address.clone(),
        };
        debug!(phase = ?ActionPhase::Submitted, nonce, "action submitted");
        let response: ActionResponse = self
            .rest
            .post_json("/exchange", &serde_json::to_value(&envelope)?)
            .await?;

        Ok(SubmittedAction { nonce, response })
    }

    fn check_cancel_outcome(&self, response: &ActionResponse) -> Result<(), ClientError> {
        if !response.is_ok() {
            let reason = response.rejection_reason();
            return Err(match ClientError::from_exchange_reason(reason.as_str()) {
                ClientError::StaleNonce => ClientError::StaleNonce,
                _ => ClientError::CancelFailed(reason),
            });
        }
        if let Some(ActionStatus::Error { error }) = response.first_status() {
            return Err(match ClientError::from_exchange_reason(error.clone()) {
                ClientError::StaleNonce => ClientError::StaleNonce,
                _ => ClientError::CancelFailed(error.clone()),
            });
        }
        Ok(())
    }
}

/// Hash committing the signature to the exact payload being authorized.
fn connection_id(
    action: &Value,
    nonce: u64,
    vault_address: Option<&str>,
) -> Result<[u8; 32], ClientError> {
    let canonical = serde_json::to_vec(&json!([action, nonce, vault_address]))?;
    Ok(keccak256(&canonical))
}

fn decimal_str(value: Decimal) -> String {
    value.normalize().to_string()
}

fn validate_ticket(ticket: &OrderTicket) -> Result<(), ClientError> {
    if ticket.size <= Decimal::ZERO {
        return Err(ClientError::InvalidParameters(
            "order size must be positive".to_string(),
        ));
    }
    if ticket.leverage == Some(0) {
        return Err(ClientError::InvalidParameters(
            "leverage must be at least 1".to_string(),
        ));
    }
    match ticket.kind {
        OrderKind::Market => Ok(()),
        OrderKind::Limit | OrderKind::Stop => match ticket.price {
            Some(price) if price > Decimal::ZERO => Ok(()),
            Some(_) => Err(ClientError::InvalidParameters(
                "order price must be positive".to_string(),
            )),
            None => Err(ClientError::InvalidParameters(
                "price is required for limit and stop orders".to_string(),
            )),
        },
    }
}
