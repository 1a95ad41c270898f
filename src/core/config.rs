use secrecy::{ExposeSecret, Secret};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::env;

const DEFAULT_API_URL: &str = "https://api.hydromancer.xyz";
const DEFAULT_WS_URL: &str = "wss://ws.hydromancer.xyz";

/// Configuration surface consumed by the client: the market-data base URL and
/// streaming URL, the market-data API key, the exchange endpoint, and an
/// optional signing key. Nothing else is recognized.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub ws_url: String,
    pub api_key: Secret<String>,
    pub private_key: Option<Secret<String>>,
    pub testnet: bool,
    pub exchange_url: Option<String>,
}

// Never expose secrets in serialization.
impl Serialize for ClientConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ClientConfig", 6)?;
        state.serialize_field("api_url", &self.api_url)?;
        state.serialize_field("ws_url", &self.ws_url)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field(
            "private_key",
            if self.private_key.is_some() {
                "[REDACTED]"
            } else {
                "[UNSET]"
            },
        )?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("exchange_url", &self.exchange_url)?;
        state.end()
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            api_key: Secret::new(api_key),
            private_key: None,
            testnet: true,
            exchange_url: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `RIPTIDE_API_KEY` (required)
    /// - `RIPTIDE_API_URL` (optional)
    /// - `RIPTIDE_WS_URL` (optional)
    /// - `RIPTIDE_PRIVATE_KEY` (optional)
    /// - `RIPTIDE_TESTNET` (optional, defaults to true)
    /// - `RIPTIDE_EXCHANGE_URL` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("RIPTIDE_API_KEY")
            .map_err(|_| ConfigError::MissingEnvironmentVariable("RIPTIDE_API_KEY".to_string()))?;

        let mut config = Self::new(api_key);
        if let Ok(url) = env::var("RIPTIDE_API_URL") {
            config.api_url = url;
        }
        if let Ok(url) = env::var("RIPTIDE_WS_URL") {
            config.ws_url = url;
        }
        if let Ok(key) = env::var("RIPTIDE_PRIVATE_KEY") {
            if !key.is_empty() {
                config.private_key = Some(Secret::new(key));
            }
        }
        if let Ok(testnet) = env::var("RIPTIDE_TESTNET") {
            config.testnet = testnet.parse::<bool>().unwrap_or(true);
        }
        if let Ok(url) = env::var("RIPTIDE_EXCHANGE_URL") {
            config.exchange_url = Some(url);
        }

        Ok(config)
    }

    /// Load configuration from a .env file (if present) and the environment.
    ///
    /// **Security warning**: never commit .env files to version control.
    #[cfg(feature = "env-file")]
    pub fn from_env_file() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file: {}",
                    e
                )));
            }
        }
        Self::from_env()
    }

    #[must_use]
    pub fn api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    #[must_use]
    pub fn ws_url(mut self, ws_url: String) -> Self {
        self.ws_url = ws_url;
        self
    }

    #[must_use]
    pub fn private_key(mut self, private_key: String) -> Self {
        self.private_key = Some(Secret::new(private_key));
        self
    }

    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    #[must_use]
    pub fn exchange_url(mut self, exchange_url: String) -> Self {
        self.exchange_url = Some(exchange_url);
        self
    }

    /// Whether a signing key was provided for trading operations.
    #[must_use]
    pub fn has_signing_key(&self) -> bool {
        self.private_key
            .as_ref()
            .map_or(false, |k| !k.expose_secret().is_empty())
    }

    /// Get the API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
