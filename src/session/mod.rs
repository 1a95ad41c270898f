//! Session orchestration: one owned object binding the wallet, the execution
//! client, the market-data clients, and the cached view the presentation
//! layer reads.
//!
//! The session replaces any ambient global state: it is created explicitly,
//! passed by reference, and torn down by dropping it. Whenever the wallet
//! binding changes the execution client is rebuilt (or torn down) before any
//! new command is accepted.

pub mod cache;

use crate::core::config::ClientConfig;
use crate::core::errors::ClientError;
use crate::core::kernel::{RestClient, RestClientBuilder, RestClientConfig};
use crate::core::types::{
    Account, CancelAck, Candle, Market, ModifyTicket, Order, OrderBookSnapshot, OrderTicket,
    Position,
};
use crate::exchanges::hydromancer::{MarketDataClient, StreamClient};
use crate::exchanges::hyperliquid::{
    conversions, ExecutionClient, InfoClient, MAINNET_API_URL, MAINNET_CHAIN_ID, TESTNET_API_URL,
    TESTNET_CHAIN_ID,
};
use crate::wallet::KeyStore;
use cache::SessionCache;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

/// Market-wide data refresh cadence.
pub const MARKETS_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Account-scoped data refresh cadence while a wallet is bound.
pub const ACCOUNT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Markets fetched per refresh, keeping the poll fan-out bounded.
const MARKET_LIMIT: usize = 20;

struct WalletBinding<R: RestClient> {
    address: String,
    execution: ExecutionClient<R>,
}

struct SessionInner<R: RestClient + Clone> {
    market_data: MarketDataClient<R>,
    info: InfoClient<R>,
    exchange_rest: R,
    chain_id: u64,
    cache: SessionCache,
    wallet: tokio::sync::RwLock<Option<WalletBinding<R>>>,
    stream: Option<StreamClient>,
}

/// The unified trading interface handed to the presentation layer.
pub struct SessionFacade<R: RestClient + Clone> {
    inner: Arc<SessionInner<R>>,
}

impl<R: RestClient + Clone> Clone for SessionFacade<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SessionFacade<crate::core::kernel::ReqwestRest> {
    /// Build a session from configuration. Requires a tokio runtime (the
    /// streaming worker is spawned here). No wallet is bound yet.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let market_rest = RestClientBuilder::new(RestClientConfig::new(
            config.api_url.clone(),
            "hydromancer".to_string(),
        ))
        .with_bearer_token(config.api_key.clone())
        .build()?;

        let exchange_url = config.exchange_url.clone().unwrap_or_else(|| {
            if config.testnet {
                TESTNET_API_URL.to_string()
            } else {
                MAINNET_API_URL.to_string()
            }
        });
        let exchange_rest = RestClientBuilder::new(RestClientConfig::new(
            exchange_url,
            "hyperliquid".to_string(),
        ))
        .build()?;

        let chain_id = if config.testnet {
            TESTNET_CHAIN_ID
        } else {
            MAINNET_CHAIN_ID
        };
        let stream = StreamClient::new(config.ws_url.clone(), config.api_key.clone());

        Ok(Self::with_parts(
            MarketDataClient::new(market_rest),
            InfoClient::new(exchange_rest.clone()),
            exchange_rest,
            chain_id,
            Some(stream),
        ))
    }

    /// Build a session and bind the configured wallet key, when present.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let session = Self::new(config)?;
        if let Some(key) = &config.private_key {
            session.connect_wallet(key.expose_secret()).await?;
        }
        Ok(session)
    }
}

impl<R: RestClient + Clone + 'static> SessionFacade<R> {
    /// Assemble a session from already-built parts. Used directly by tests to
    /// substitute transports.
    pub fn with_parts(
        market_data: MarketDataClient<R>,
        info: InfoClient<R>,
        exchange_rest: R,
        chain_id: u64,
        stream: Option<StreamClient>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                market_data,
                info,
                exchange_rest,
                chain_id,
                cache: SessionCache::new(),
                wallet: tokio::sync::RwLock::new(None),
                stream,
            }),
        }
    }

    /// The streaming client, when the session was built with one.
    #[must_use]
    pub fn stream(&self) -> Option<&StreamClient> {
        self.inner.stream.as_ref()
    }

    // Wallet lifecycle

    /// Bind a signing identity from a raw private key, replacing any previous
    /// one. The execution client is rebuilt and all account-scoped state is
    /// dropped before the new identity serves any command.
    #[instrument(skip_all)]
    pub async fn connect_wallet(&self, raw_key: &str) -> Result<String, ClientError> {
        let keystore = Arc::new(KeyStore::from_private_key(raw_key)?);
        let address = keystore.address().to_string();
        let execution =
            ExecutionClient::new(self.inner.exchange_rest.clone(), keystore, self.inner.chain_id);

        {
            let mut slot = self.inner.wallet.write().await;
            *slot = Some(WalletBinding {
                address: address.clone(),
                execution,
            });
        }
        self.inner.cache.advance_epoch();
        info!(address = %address, "Wallet connected");
        Ok(address)
    }

    /// Drop the signing identity; idempotent. Key material is erased and any
    /// in-flight account-scoped fetch resolves into the void.
    pub async fn disconnect_wallet(&self) {
        let had_wallet = self.inner.wallet.write().await.take().is_some();
        if had_wallet {
            self.inner.cache.advance_epoch();
            info!("Wallet disconnected");
        }
    }

    pub async fn address(&self) -> Option<String> {
        self.inner
            .wallet
            .read()
            .await
            .as_ref()
            .map(|binding| binding.address.clone())
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.wallet.read().await.is_some()
    }

    // Trading commands

    /// Place an order, then re-fetch positions, orders, and account. The
    /// optimistic result is returned but never written into the caches; the
    /// server remains the only source of account truth.
    pub async fn place_order(&self, ticket: OrderTicket) -> Result<Order, ClientError> {
        let execution = self.execution().await?;
        let order = execution.place_order(&ticket).await?;
        self.refresh_after_mutation().await;
        Ok(order)
    }

    /// Cancel an order by its exchange id, then re-fetch account state.
    pub async fn cancel_order(
        &self,
        order_id: &str,
        symbol: &str,
    ) -> Result<CancelAck, ClientError> {
        let execution = self.execution().await?;
        let ack = execution.cancel_order(order_id, symbol).await?;
        self.refresh_after_mutation().await;
        Ok(ack)
    }

    /// Cancel an order by its client-assigned id, then re-fetch account state.
    pub async fn cancel_order_by_client_id(
        &self,
        symbol: &str,
        client_id: &str,
    ) -> Result<CancelAck, ClientError> {
        let execution = self.execution().await?;
        let ack = execution.cancel_order_by_client_id(symbol, client_id).await?;
        self.refresh_after_mutation().await;
        Ok(ack)
    }

    /// Replace a resting order, then re-fetch account state.
    pub async fn modify_order(&self, ticket: ModifyTicket) -> Result<Order, ClientError> {
        let execution = self.execution().await?;
        let order = execution.modify_order(&ticket).await?;
        self.refresh_after_mutation().await;
        Ok(order)
    }

    // Refresh operations

    /// Fetch and cache market snapshots. Market-wide; runs with or without a
    /// wallet.
    pub async fn refresh_markets(&self) -> Result<Vec<Market>, ClientError> {
        let markets = self.inner.market_data.get_markets(MARKET_LIMIT).await?;
        self.inner.cache.store_markets(markets.clone());
        Ok(markets)
    }

    /// Fetch and cache open positions for the bound wallet.
    pub async fn refresh_positions(&self) -> Result<Vec<Position>, ClientError> {
        let (address, epoch) = self.account_scope().await?;
        let state = self.inner.info.user_state(&address).await?;
        let positions = conversions::positions_from_user_state(&state);
        if !self.inner.cache.store_positions(epoch, positions.clone()) {
            debug!("Discarding positions fetched under a previous identity");
        }
        Ok(positions)
    }

    /// Fetch and cache resting orders for the bound wallet.
    pub async fn refresh_orders(&self) -> Result<Vec<Order>, ClientError> {
        let (address, epoch) = self.account_scope().await?;
        let open_orders = self.inner.info.open_orders(&address).await?;
        let orders: Vec<Order> = open_orders.iter().map(conversions::order_from_open_order).collect();
        if !self.inner.cache.store_orders(epoch, orders.clone()) {
            debug!("Discarding orders fetched under a previous identity");
        }
        Ok(orders)
    }

    /// Fetch and cache the account summary for the bound wallet.
    pub async fn refresh_account(&self) -> Result<Account, ClientError> {
        let (address, epoch) = self.account_scope().await?;
        let state = self.inner.info.user_state(&address).await?;
        let account = conversions::account_from_user_state(&address, &state);
        if !self.inner.cache.store_account(epoch, account.clone()) {
            debug!("Discarding account fetched under a previous identity");
        }
        Ok(account)
    }

    // Read-through market data (not cached; consumers poll at their own pace)

    pub async fn candles(&self, symbol: &str, interval: &str) -> Result<Vec<Candle>, ClientError> {
        self.inner.market_data.get_candles(symbol, interval).await
    }

    pub async fn order_book(&self, symbol: &str) -> Result<OrderBookSnapshot, ClientError> {
        self.inner.market_data.get_order_book(symbol).await
    }

    // Cached reads

    #[must_use]
    pub fn markets(&self) -> Option<Vec<Market>> {
        self.inner.cache.markets()
    }

    #[must_use]
    pub fn positions(&self) -> Option<Vec<Position>> {
        self.inner.cache.positions()
    }

    #[must_use]
    pub fn orders(&self) -> Option<Vec<Order>> {
        self.inner.cache.orders()
    }

    #[must_use]
    pub fn account(&self) -> Option<Account> {
        self.inner.cache.account()
    }

    // Polling

    /// Spawn the background poll loops: markets on a 30 s cadence regardless
    /// of wallet state, account-scoped data on a 5 s cadence while a wallet
    /// is bound. The loops stop once every facade handle is dropped.
    pub fn spawn_pollers(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let weak = Arc::downgrade(&self.inner);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(MARKETS_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let facade = Self { inner };
                if let Err(e) = facade.refresh_markets().await {
                    warn!("Market poll failed: {}", e);
                }
            }
        }));

        let weak = Arc::downgrade(&self.inner);
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(ACCOUNT_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let facade = Self { inner };
                // Account-scoped polling is suppressed without an identity.
                if !facade.is_connected().await {
                    continue;
                }
                let (positions, orders, account) = tokio::join!(
                    facade.refresh_positions(),
                    facade.refresh_orders(),
                    facade.refresh_account(),
                );
                for e in [positions.err(), orders.err(), account.err()]
                    .into_iter()
                    .flatten()
                {
                    warn!("Account poll failed: {}", e);
                }
            }
        }));

        handles
    }

    // Internals

    async fn execution(&self) -> Result<ExecutionClient<R>, ClientError> {
        self.inner
            .wallet
            .read()
            .await
            .as_ref()
            .map(|binding| binding.execution.clone())
            .ok_or(ClientError::NotConnected)
    }

    async fn account_scope(&self) -> Result<(String, u64), ClientError> {
        let guard = self.inner.wallet.read().await;
        let binding = guard.as_ref().ok_or(ClientError::NotConnected)?;
        Ok((binding.address.clone(), self.inner.cache.epoch()))
    }

    /// Invalidate and re-fetch everything a trade can touch. Failures here
    /// are logged, not surfaced: the mutation itself already succeeded, and
    /// the next poll tick retries the fetch.
    async fn refresh_after_mutation(&self) {
        self.inner.cache.invalidate_positions();
        self.inner.cache.invalidate_orders();
        self.inner.cache.invalidate_account();

        let (positions, orders, account) = tokio::join!(
            self.refresh_positions(),
            self.refresh_orders(),
            self.refresh_account(),
        );
        for e in [positions.err(), orders.err(), account.err()]
            .into_iter()
            .flatten()
        {
            warn!("Post-trade refresh failed: {}", e);
        }
    }
}
