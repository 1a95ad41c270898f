use crate::core::errors::ClientError;
use crate::core::kernel::codec::WsCodec;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{instrument, warn};

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsStream = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Tungstenite-backed WebSocket session paired with a protocol codec.
///
/// Pure transport: connect, send encoded frames, surface decoded frames.
/// Reconnection policy and subscription bookkeeping live with the caller.
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    service: String,
    codec: C,
    write: Option<WsSink>,
    read: Option<WsStream>,
    connected: bool,
}

impl<C: WsCodec> TungsteniteWs<C> {
    pub fn new(url: String, service: String, codec: C) -> Self {
        Self {
            url,
            service,
            codec,
            write: None,
            read: None,
            connected: false,
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Open the connection. The dial is bounded by a connect timeout so a
    /// black-holed endpoint fails instead of hanging.
    #[instrument(skip(self), fields(service = %self.service, url = %self.url))]
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let (ws_stream, _) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&self.url))
            .await
            .map_err(|_| ClientError::RequestTimeout)?
            .map_err(|e| ClientError::Transport(format!("WebSocket connection failed: {}", e)))?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;
        Ok(())
    }

    pub async fn send(&mut self, msg: Message) -> Result<(), ClientError> {
        let write = self
            .write
            .as_mut()
            .filter(|_| self.connected)
            .ok_or_else(|| ClientError::Transport("WebSocket not connected".to_string()))?;

        write.send(msg).await.map_err(|e| {
            self.connected = false;
            ClientError::Transport(format!("Failed to send WebSocket message: {}", e))
        })
    }

    /// Receive the next raw data frame.
    ///
    /// Pings are answered and pongs swallowed here; `None` means the peer
    /// closed the connection.
    async fn next_raw(&mut self) -> Option<Result<Message, ClientError>> {
        loop {
            let read = self.read.as_mut()?;
            match read.next().await {
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.send(Message::Pong(data)).await {
                        warn!(service = %self.service, "Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    self.connected = false;
                    return None;
                }
                Some(Ok(message)) => return Some(Ok(message)),
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ClientError::Transport(format!(
                        "WebSocket error: {}",
                        e
                    ))));
                }
            }
        }
    }

    /// Receive the next decoded message. Frames the codec rejects are dropped
    /// with a diagnostic and reading continues.
    pub async fn next_message(&mut self) -> Option<Result<C::Message, ClientError>> {
        loop {
            match self.next_raw().await? {
                Ok(raw) => match self.codec.decode(&raw) {
                    Some(decoded) => return Some(Ok(decoded)),
                    None => {
                        warn!(service = %self.service, "Dropping undecodable frame");
                    }
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }

    /// Close the connection; idempotent.
    pub async fn close(&mut self) {
        if let Some(write) = self.write.as_mut() {
            let _ = write.send(Message::Close(None)).await;
        }
        self.connected = false;
        self.write = None;
        self.read = None;
    }
}
