use super::types::{RawOrderBook, TickerUpdate, TradeUpdate};
use crate::core::errors::ClientError;
use crate::core::kernel::WsCodec;
use crate::core::types::{Market, OrderBookSnapshot, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Typed inbound message from the streaming feed.
#[derive(Debug, Clone)]
pub enum StreamMessage {
    Auth { success: bool },
    Markets(Vec<Market>),
    Ticker(TickerUpdate),
    OrderBook(OrderBookSnapshot),
    Trade(TradeUpdate),
    Disconnect { reason: Option<String> },
}

/// Inbound frames as they appear on the wire, discriminated by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum InboundFrame {
    Auth {
        success: bool,
    },
    Markets {
        data: Vec<Market>,
    },
    Ticker(TickerUpdate),
    OrderBook {
        symbol: String,
        #[serde(flatten)]
        book: RawOrderBook,
    },
    Trades(TradeUpdate),
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Outbound control messages.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OutboundFrame<'a> {
    Subscribe {
        channel: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        symbol: Option<&'a str>,
    },
    Unsubscribe {
        channel: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        symbol: Option<&'a str>,
    },
}

/// Codec for the streaming feed's JSON protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct HydromancerCodec;

impl HydromancerCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode(frame: &OutboundFrame<'_>) -> Result<Message, ClientError> {
        Ok(Message::Text(serde_json::to_string(frame)?))
    }
}

impl WsCodec for HydromancerCodec {
    type Message = StreamMessage;

    fn encode_auth(&self, api_key: &str) -> Result<Message, ClientError> {
        // Hand-rolled rather than an OutboundFrame variant: the key must not
        // pass through any Debug/Serialize surface that could log it.
        let frame = json!({ "type": "auth", "apiKey": api_key });
        Ok(Message::Text(frame.to_string()))
    }

    fn encode_subscribe(&self, subscription: &Subscription) -> Result<Message, ClientError> {
        Self::encode(&OutboundFrame::Subscribe {
            channel: subscription.channel.as_str(),
            symbol: subscription.symbol.as_deref(),
        })
    }

    fn encode_unsubscribe(&self, subscription: &Subscription) -> Result<Message, ClientError> {
        Self::encode(&OutboundFrame::Unsubscribe {
            channel: subscription.channel.as_str(),
            symbol: subscription.symbol.as_deref(),
        })
    }

    fn decode(&self, message: &Message) -> Option<StreamMessage> {
        let text = match message {
            Message::Text(text) => text,
            // The feed is text-only; anything else is dropped.
            _ => return None,
        };

        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(service = "hydromancer", "Dropping malformed frame: {}", e);
                return None;
            }
        };

        Some(match frame {
            InboundFrame::Auth { success } => StreamMessage::Auth { success },
            InboundFrame::Markets { data } => StreamMessage::Markets(data),
            InboundFrame::Ticker(update) => StreamMessage::Ticker(update),
            InboundFrame::OrderBook { symbol, book } => {
                let snapshot = book.into_snapshot(&symbol);
                if let Err(e) = snapshot.validate() {
                    debug!(service = "hydromancer", symbol = %symbol, "Dropping invalid book: {}", e);
                    return None;
                }
                StreamMessage::OrderBook(snapshot)
            }
            InboundFrame::Trades(update) => StreamMessage::Trade(update),
            InboundFrame::Disconnect { reason } => StreamMessage::Disconnect { reason },
        })
    }
}
