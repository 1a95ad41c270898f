use crate::core::errors::ClientError;
use crate::core::types::Subscription;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for a streaming service's wire protocol.
///
/// Implementations translate between raw WebSocket frames and the service's
/// typed messages. Control frames (ping, pong, close) never reach the codec;
/// they are handled at the transport level.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this service
    type Message: Send;

    /// Encode the post-open authentication message.
    fn encode_auth(&self, api_key: &str) -> Result<Message, ClientError>;

    /// Encode a subscription request for one channel/symbol pair.
    fn encode_subscribe(&self, subscription: &Subscription) -> Result<Message, ClientError>;

    /// Encode an unsubscription request for one channel/symbol pair.
    fn encode_unsubscribe(&self, subscription: &Subscription) -> Result<Message, ClientError>;

    /// Decode a raw data frame into a typed message.
    ///
    /// Returns `None` for frames the codec cannot or chooses not to parse;
    /// malformed payloads are dropped with a local diagnostic rather than
    /// surfaced as connection errors.
    fn decode(&self, message: &Message) -> Option<Self::Message>;
}
