use crate::core::errors::ClientError;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{instrument, trace};

/// Minimal typed HTTP interface used by the service clients.
///
/// Keeping this behind a trait lets tests substitute a scripted transport for
/// the real one without touching any client logic.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// GET an endpoint and deserialize the JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, ClientError>;

    /// POST a JSON body to an endpoint and deserialize the JSON response.
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ClientError>;
}

/// Configuration for the REST client.
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Service name for logging and tracing
    pub service: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, service: String) -> Self {
        Self {
            base_url,
            service,
            timeout_seconds: 30,
            user_agent: "riptide/0.1".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }
}

/// Builder for [`ReqwestRest`] instances.
pub struct RestClientBuilder {
    config: RestClientConfig,
    bearer_token: Option<Secret<String>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            bearer_token: None,
        }
    }

    /// Authenticate every request with a bearer token.
    pub fn with_bearer_token(mut self, token: Secret<String>) -> Self {
        self.bearer_token = Some(token);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ClientError::Transport(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            bearer_token: self.bearer_token,
        })
    }
}

/// Production [`RestClient`] backed by reqwest with a hard request timeout.
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    bearer_token: Option<Secret<String>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_bearer_token", &self.bearer_token.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn new(base_url: String, service: String) -> Result<Self, ClientError> {
        RestClientBuilder::new(RestClientConfig::new(base_url, service)).build()
    }

    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    #[instrument(skip(self, response), fields(service = %self.config.service, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ClientError> {
        let status = response.status();
        let text = response.text().await.map_err(ClientError::from)?;

        trace!("Response body: {}", text);

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                ClientError::MalformedResponse(format!("Failed to parse JSON response: {}", e))
            })
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        query_params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.build_url(endpoint);
        let mut request = self.client.request(method, &url);

        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token.expose_secret());
        }
        for (key, value) in query_params {
            request = request.query(&[(key, value)]);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ClientError::from)?;
        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query_params), fields(service = %self.config.service, endpoint = %endpoint))]
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let value = self
            .make_request(Method::GET, endpoint, query_params, None)
            .await?;
        serde_json::from_value(value).map_err(|e| {
            ClientError::MalformedResponse(format!("Failed to deserialize JSON: {}", e))
        })
    }

    #[instrument(skip(self, body), fields(service = %self.config.service, endpoint = %endpoint))]
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ClientError> {
        let value = self.make_request(Method::POST, endpoint, &[], Some(body)).await?;
        serde_json::from_value(value).map_err(|e| {
            ClientError::MalformedResponse(format!("Failed to deserialize JSON: {}", e))
        })
    }
}
