use thiserror::Error;

/// Unified error type for every client operation.
///
/// Validation failures are returned before any network I/O; exchange and
/// transport failures carry the server-provided reason where one exists.
/// Trading submissions are never retried automatically.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("wallet not connected")]
    NotConnected,

    #[error("signing identity not initialized")]
    NotInitialized,

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("no market price available for {0}")]
    NoMarketPrice(String),

    #[error("exchange rejected nonce as stale")]
    StaleNonce,

    #[error("exchange rejected action: {0}")]
    ExchangeRejected(String),

    #[error("cancel failed: {0}")]
    CancelFailed(String),

    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,

    #[error("request timed out")]
    RequestTimeout,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::RequestTimeout
        } else {
            Self::Http(err)
        }
    }
}

impl ClientError {
    /// Classify an exchange rejection string, surfacing nonce staleness as its
    /// own variant so callers can distinguish it from ordinary rejections.
    pub fn from_exchange_reason(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.to_ascii_lowercase().contains("nonce") {
            Self::StaleNonce
        } else {
            Self::ExchangeRejected(reason)
        }
    }
}
