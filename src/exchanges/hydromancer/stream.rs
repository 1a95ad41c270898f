use super::codec::{HydromancerCodec, StreamMessage};
use super::types::{TickerUpdate, TradeUpdate};
use crate::core::errors::ClientError;
use crate::core::kernel::TungsteniteWs;
use crate::core::kernel::codec::WsCodec;
use crate::core::types::{Channel, Market, OrderBookSnapshot, Subscription};
use secrecy::{ExposeSecret, Secret};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

const LISTENER_BUFFER: usize = 256;

/// Streaming client configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Authentication acknowledgement timeout in milliseconds.
    pub auth_timeout_ms: u64,
    /// Max reconnection attempts before the client parks.
    pub max_reconnect_attempts: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            auth_timeout_ms: 10_000,
            max_reconnect_attempts: 5,
        }
    }
}

/// Connection lifecycle of the streaming client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Disconnected,
    Connecting,
    Authenticating,
    Live,
    Reconnecting,
}

/// Event fanned out to registered listeners.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    AuthAccepted,
    AuthRejected,
    Markets(Vec<Market>),
    Ticker(TickerUpdate),
    OrderBook(OrderBookSnapshot),
    Trade(TradeUpdate),
    /// Server-initiated disconnect notice.
    ServerDisconnect { reason: Option<String> },
    Live,
    ConnectionLost,
    /// Terminal: the reconnect budget is spent and the client is parked.
    ReconnectExhausted,
}

/// Listener registration key; one kind per message family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Auth,
    Markets,
    Ticker,
    OrderBook,
    Trades,
    Lifecycle,
}

impl StreamEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AuthAccepted | Self::AuthRejected => EventKind::Auth,
            Self::Markets(_) => EventKind::Markets,
            Self::Ticker(_) => EventKind::Ticker,
            Self::OrderBook(_) => EventKind::OrderBook,
            Self::Trade(_) => EventKind::Trades,
            Self::ServerDisconnect { .. }
            | Self::Live
            | Self::ConnectionLost
            | Self::ReconnectExhausted => EventKind::Lifecycle,
        }
    }
}

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Typed publish/subscribe fan-out, decoupled from the transport.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(ListenerId, mpsc::Sender<StreamEvent>)>>,
}

impl EventBus {
    pub fn attach(&mut self, kind: EventKind) -> (ListenerId, mpsc::Receiver<StreamEvent>) {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER);
        self.listeners.entry(kind).or_default().push((id, tx));
        (id, rx)
    }

    pub fn detach(&mut self, id: ListenerId) {
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(listener_id, _)| *listener_id != id);
        }
    }

    /// Synchronous fan-out to every listener of the event's kind. Lagging
    /// listeners lose the event; gone listeners are pruned.
    pub fn publish(&mut self, event: &StreamEvent) {
        let Some(listeners) = self.listeners.get_mut(&event.kind()) else {
            return;
        };
        listeners.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(listener = ?id, "Listener lagging; dropping event");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}

/// Subscription set with transition-aware mutation: a wire message is due
/// only when membership actually changes.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionSet {
    entries: HashSet<Subscription>,
}

impl SubscriptionSet {
    /// Returns true when this is a 0 -> 1 transition.
    pub fn insert(&mut self, subscription: Subscription) -> bool {
        self.entries.insert(subscription)
    }

    /// Returns true when this is a 1 -> 0 transition.
    pub fn remove(&mut self, subscription: &Subscription) -> bool {
        self.entries.remove(subscription)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.entries.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Reconnect delay for the given attempt number.
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    let millis = 1_000u64
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(30_000);
    Duration::from_millis(millis)
}

enum StreamCommand {
    Connect,
    Subscribe {
        subscription: Subscription,
        ack: oneshot::Sender<Result<(), ClientError>>,
    },
    Unsubscribe {
        subscription: Subscription,
        ack: oneshot::Sender<Result<(), ClientError>>,
    },
    Disconnect {
        ack: oneshot::Sender<()>,
    },
}

/// Managed streaming connection to the data feed.
///
/// One background worker owns the socket and the subscription set; this
/// handle talks to it over a command channel. Subscriptions survive
/// reconnects: the full set is replayed after every successful
/// authentication, before any new command is taken.
pub struct StreamClient {
    commands: mpsc::Sender<StreamCommand>,
    status: watch::Receiver<StreamStatus>,
    bus: Arc<Mutex<EventBus>>,
}

impl StreamClient {
    /// Create the client and spawn its worker. Requires a tokio runtime.
    #[must_use]
    pub fn new(ws_url: String, api_key: Secret<String>) -> Self {
        Self::with_config(ws_url, api_key, StreamConfig::default())
    }

    /// Create the client with explicit connection settings.
    #[must_use]
    pub fn with_config(ws_url: String, api_key: Secret<String>, config: StreamConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (status_tx, status_rx) = watch::channel(StreamStatus::Disconnected);
        let bus = Arc::new(Mutex::new(EventBus::default()));

        let worker = StreamWorker {
            url: ws_url,
            api_key,
            config,
            commands: command_rx,
            status: status_tx,
            bus: Arc::clone(&bus),
            subscriptions: SubscriptionSet::default(),
        };
        tokio::spawn(worker.run());

        Self {
            commands: command_tx,
            status: status_rx,
            bus,
        }
    }

    #[must_use]
    pub fn status(&self) -> StreamStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.status() == StreamStatus::Live
    }

    /// Begin connecting. No-op while already connected or reconnecting.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.send_command(StreamCommand::Connect).await
    }

    /// Close the connection and cancel any pending reconnect; idempotent.
    pub async fn disconnect(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .send_command(StreamCommand::Disconnect { ack: ack_tx })
            .await
            .is_ok()
        {
            let _ = ack_rx.await;
        }
    }

    /// Add `(channel, symbol)` to the subscription set. Sends a subscribe
    /// message immediately when Live and membership changed; otherwise the
    /// change is staged and applied on the next successful authentication.
    pub async fn subscribe(
        &self,
        channel: Channel,
        symbol: Option<&str>,
    ) -> Result<(), ClientError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send_command(StreamCommand::Subscribe {
            subscription: Subscription::new(channel, symbol.map(str::to_string)),
            ack: ack_tx,
        })
        .await?;
        ack_rx
            .await
            .map_err(|_| ClientError::Transport("stream worker stopped".to_string()))?
    }

    /// Remove `(channel, symbol)` from the subscription set.
    pub async fn unsubscribe(
        &self,
        channel: Channel,
        symbol: Option<&str>,
    ) -> Result<(), ClientError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send_command(StreamCommand::Unsubscribe {
            subscription: Subscription::new(channel, symbol.map(str::to_string)),
            ack: ack_tx,
        })
        .await?;
        ack_rx
            .await
            .map_err(|_| ClientError::Transport("stream worker stopped".to_string()))?
    }

    /// Register a listener for one event kind.
    pub fn listen(&self, kind: EventKind) -> (ListenerId, mpsc::Receiver<StreamEvent>) {
        self.bus.lock().expect("event bus lock poisoned").attach(kind)
    }

    /// Remove a previously registered listener.
    pub fn remove_listener(&self, id: ListenerId) {
        self.bus.lock().expect("event bus lock poisoned").detach(id);
    }

    async fn send_command(&self, command: StreamCommand) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Transport("stream worker stopped".to_string()))
    }
}

enum CycleEnd {
    /// Carries the disconnect ack so it can be sent only after the status
    /// actually reads Disconnected.
    UserDisconnect(oneshot::Sender<()>),
    ChannelClosed,
    ConnectionLost,
}

enum BackoffOutcome {
    Elapsed,
    Abort(Option<oneshot::Sender<()>>),
}

struct StreamWorker {
    url: String,
    api_key: Secret<String>,
    config: StreamConfig,
    commands: mpsc::Receiver<StreamCommand>,
    status: watch::Sender<StreamStatus>,
    bus: Arc<Mutex<EventBus>>,
    subscriptions: SubscriptionSet,
}

impl StreamWorker {
    async fn run(mut self) {
        // Parked: mutations are staged into the set until a connect arrives.
        while let Some(command) = self.commands.recv().await {
            match command {
                StreamCommand::Connect => self.run_connection_cycle().await,
                StreamCommand::Subscribe { subscription, ack } => {
                    self.subscriptions.insert(subscription);
                    let _ = ack.send(Ok(()));
                }
                StreamCommand::Unsubscribe { subscription, ack } => {
                    self.subscriptions.remove(&subscription);
                    let _ = ack.send(Ok(()));
                }
                StreamCommand::Disconnect { ack } => {
                    let _ = ack.send(());
                }
            }
        }
    }

    /// One full connected lifetime, reconnects included. Returns with the
    /// client Disconnected and the attempt counter reset.
    #[instrument(skip(self), fields(service = "hydromancer"))]
    async fn run_connection_cycle(&mut self) {
        let mut attempt: u32 = 0;
        loop {
            self.set_status(StreamStatus::Connecting);
            match self.establish().await {
                Ok(Some(mut ws)) => {
                    attempt = 0;
                    self.set_status(StreamStatus::Live);
                    self.publish(&StreamEvent::Live);
                    info!("Stream live");

                    match self.drive(&mut ws).await {
                        CycleEnd::UserDisconnect(ack) => {
                            ws.close().await;
                            self.set_status(StreamStatus::Disconnected);
                            let _ = ack.send(());
                            return;
                        }
                        CycleEnd::ChannelClosed => {
                            ws.close().await;
                            self.set_status(StreamStatus::Disconnected);
                            return;
                        }
                        CycleEnd::ConnectionLost => {
                            self.publish(&StreamEvent::ConnectionLost);
                        }
                    }
                }
                // Authentication was explicitly rejected; retrying cannot help.
                Ok(None) => {
                    self.set_status(StreamStatus::Disconnected);
                    return;
                }
                Err(e) => {
                    warn!("Connection attempt failed: {}", e);
                }
            }

            attempt += 1;
            if attempt > self.config.max_reconnect_attempts {
                self.set_status(StreamStatus::Disconnected);
                self.publish(&StreamEvent::ReconnectExhausted);
                warn!("Reconnect attempts exhausted");
                return;
            }
            self.set_status(StreamStatus::Reconnecting);
            let delay = backoff_delay(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
            match self.wait_backoff(delay).await {
                BackoffOutcome::Elapsed => {}
                BackoffOutcome::Abort(ack) => {
                    self.set_status(StreamStatus::Disconnected);
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                    return;
                }
            }
        }
    }

    /// Open the transport, authenticate, and replay the subscription set.
    ///
    /// `Ok(None)` means the server rejected the credentials. The replay
    /// completes before this returns, so no subscribe/unsubscribe command can
    /// interleave with it.
    async fn establish(&mut self) -> Result<Option<TungsteniteWs<HydromancerCodec>>, ClientError> {
        let mut ws = TungsteniteWs::new(
            self.url.clone(),
            "hydromancer".to_string(),
            HydromancerCodec::new(),
        );
        ws.connect().await?;

        self.set_status(StreamStatus::Authenticating);
        let auth_frame = ws.codec().encode_auth(self.api_key.expose_secret())?;
        ws.send(auth_frame).await?;

        let auth_timeout = Duration::from_millis(self.config.auth_timeout_ms);
        let authenticated = tokio::time::timeout(auth_timeout, async {
            loop {
                match ws.next_message().await {
                    Some(Ok(StreamMessage::Auth { success })) => return Ok(success),
                    // Anything before the auth ack is noise.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(ClientError::Transport(
                            "connection closed during authentication".to_string(),
                        ))
                    }
                }
            }
        })
        .await
        .map_err(|_| ClientError::RequestTimeout)??;

        if !authenticated {
            warn!("Stream authentication rejected");
            self.publish(&StreamEvent::AuthRejected);
            ws.close().await;
            return Ok(None);
        }
        self.publish(&StreamEvent::AuthAccepted);

        for subscription in self.subscriptions.iter() {
            let frame = ws.codec().encode_subscribe(subscription)?;
            ws.send(frame).await?;
        }
        Ok(Some(ws))
    }

    /// Live phase: interleave commands with inbound frames until the
    /// connection drops or the user disconnects.
    async fn drive(&mut self, ws: &mut TungsteniteWs<HydromancerCodec>) -> CycleEnd {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None => return CycleEnd::ChannelClosed,
                    Some(StreamCommand::Connect) => {}
                    Some(StreamCommand::Disconnect { ack }) => {
                        return CycleEnd::UserDisconnect(ack);
                    }
                    Some(StreamCommand::Subscribe { subscription, ack }) => {
                        if self.subscriptions.insert(subscription.clone()) {
                            let frame = match ws.codec().encode_subscribe(&subscription) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    let _ = ack.send(Err(e));
                                    continue;
                                }
                            };
                            if let Err(e) = ws.send(frame).await {
                                let _ = ack.send(Err(e));
                                return CycleEnd::ConnectionLost;
                            }
                        }
                        let _ = ack.send(Ok(()));
                    }
                    Some(StreamCommand::Unsubscribe { subscription, ack }) => {
                        if self.subscriptions.remove(&subscription) {
                            let frame = match ws.codec().encode_unsubscribe(&subscription) {
                                Ok(frame) => frame,
                                Err(e) => {
                                    let _ = ack.send(Err(e));
                                    continue;
                                }
                            };
                            if let Err(e) = ws.send(frame).await {
                                let _ = ack.send(Err(e));
                                return CycleEnd::ConnectionLost;
                            }
                        }
                        let _ = ack.send(Ok(()));
                    }
                },
                inbound = ws.next_message() => match inbound {
                    Some(Ok(message)) => self.publish(&StreamEvent::from(message)),
                    Some(Err(e)) => {
                        warn!("Stream read failed: {}", e);
                        return CycleEnd::ConnectionLost;
                    }
                    None => return CycleEnd::ConnectionLost,
                },
            }
        }
    }

    /// Sleep out the backoff while still staging set mutations.
    async fn wait_backoff(&mut self, delay: Duration) -> BackoffOutcome {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return BackoffOutcome::Elapsed,
                command = self.commands.recv() => match command {
                    None => return BackoffOutcome::Abort(None),
                    Some(StreamCommand::Connect) => {}
                    Some(StreamCommand::Disconnect { ack }) => {
                        return BackoffOutcome::Abort(Some(ack));
                    }
                    Some(StreamCommand::Subscribe { subscription, ack }) => {
                        self.subscriptions.insert(subscription);
                        let _ = ack.send(Ok(()));
                    }
                    Some(StreamCommand::Unsubscribe { subscription, ack }) => {
                        self.subscriptions.remove(&subscription);
                        let _ = ack.send(Ok(()));
                    }
                },
            }
        }
    }

    fn set_status(&self, status: StreamStatus) {
        let _ = self.status.send(status);
    }

    fn publish(&self, event: &StreamEvent) {
        self.bus
            .lock()
            .expect("event bus lock poisoned")
            .publish(event);
    }
}

impl From<StreamMessage> for StreamEvent {
    fn from(message: StreamMessage) -> Self {
        match message {
            StreamMessage::Auth { success: true } => Self::AuthAccepted,
            StreamMessage::Auth { success: false } => Self::AuthRejected,
            StreamMessage::Markets(markets) => Self::Markets(markets),
            StreamMessage::Ticker(update) => Self::Ticker(update),
            StreamMessage::OrderBook(book) => Self::OrderBook(book),
            StreamMessage::Trade(update) => Self::Trade(update),
            StreamMessage::Disconnect { reason } => Self::ServerDisconnect { reason },
        }
    }
}
