#![allow(dead_code)]

use async_trait::async_trait;
use riptide::core::errors::ClientError;
use riptide::core::kernel::RestClient;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

/// Scripted REST transport for driving clients without a network.
///
/// Responses are stubbed per route key: plain endpoints use the path, POSTs
/// with a `type` discriminator (top level or under `action`) use
/// `"{path}:{type}"`. The last stub for a key is sticky; earlier ones are
/// consumed in order. Every request is recorded for assertions.
#[derive(Clone, Default)]
pub struct MockRest {
    state: Arc<Mutex<MockState>>,
    gate: Option<Arc<Semaphore>>,
    arrival: Option<Arc<Notify>>,
}

#[derive(Default)]
struct MockState {
    responses: HashMap<String, VecDeque<Value>>,
    requests: Vec<(String, Value)>,
}

impl MockRest {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose requests block on `gate` after signalling `arrival`,
    /// for tests that need a response to resolve at a chosen moment.
    pub fn gated(gate: Arc<Semaphore>, arrival: Arc<Notify>) -> Self {
        Self {
            state: Arc::default(),
            gate: Some(gate),
            arrival: Some(arrival),
        }
    }

    pub fn stub(&self, route: &str, response: Value) {
        self.state
            .lock()
            .unwrap()
            .responses
            .entry(route.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_for(&self, route: &str) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|(key, _)| key == route)
            .map(|(_, body)| body)
            .collect()
    }

    fn route_key(endpoint: &str, body: Option<&Value>) -> String {
        let discriminator = body.and_then(|body| {
            body.get("type")
                .or_else(|| body.get("action").and_then(|action| action.get("type")))
                .and_then(Value::as_str)
        });
        match discriminator {
            Some(kind) => format!("{}:{}", endpoint, kind),
            None => endpoint.to_string(),
        }
    }

    async fn respond(&self, endpoint: &str, body: Option<&Value>) -> Result<Value, ClientError> {
        let key = Self::route_key(endpoint, body);
        {
            let mut state = self.state.lock().unwrap();
            state
                .requests
                .push((key.clone(), body.cloned().unwrap_or(Value::Null)));
        }

        if let Some(arrival) = &self.arrival {
            arrival.notify_one();
        }
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| ClientError::Transport("mock gate closed".to_string()))?;
            permit.forget();
        }

        let mut state = self.state.lock().unwrap();
        let queue = state.responses.get_mut(&key).ok_or_else(|| ClientError::Api {
            status: 404,
            message: format!("no stub for route {}", key),
        })?;
        let response = if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().ok_or_else(|| ClientError::Api {
                status: 404,
                message: format!("stub queue drained for route {}", key),
            })?
        };
        Ok(response)
    }
}

#[async_trait]
impl RestClient for MockRest {
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        _query_params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let value = self.respond(endpoint, None).await?;
        serde_json::from_value(value).map_err(ClientError::from)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ClientError> {
        let value = self.respond(endpoint, Some(body)).await?;
        serde_json::from_value(value).map_err(ClientError::from)
    }
}

/// Well-known test key (address 0x7e5f4552091a69125d5dfcb7b8c2659029395bdf).
pub const TEST_PRIVATE_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000001";

pub fn user_state_json() -> Value {
    serde_json::json!({
        "assetPositions": [
            {
                "position": {
                    "coin": "BTC-USD",
                    "entryPx": "50000",
                    "leverage": {"type": "isolated", "value": 10},
                    "liquidationPx": "45500",
                    "marginUsed": "5000",
                    "positionValue": "51000",
                    "returnOnEquity": "0.2",
                    "szi": "1",
                    "unrealizedPnl": "1000"
                },
                "type": "oneWay"
            }
        ],
        "marginSummary": {"accountValue": "12000", "totalMarginUsed": "5000"},
        "withdrawable": "7000"
    })
}

pub fn open_orders_json() -> Value {
    serde_json::json!([
        {
            "coin": "BTC-USD",
            "limitPx": "49000",
            "oid": 42,
            "side": "A",
            "sz": "0.5",
            "timestamp": 1_700_000_000_000u64
        }
    ])
}

pub fn order_accepted_json(oid: u64) -> Value {
    serde_json::json!({
        "status": "ok",
        "response": {"type": "order", "data": {"statuses": [{"resting": {"oid": oid}}]}}
    })
}

pub fn action_success_json(kind: &str) -> Value {
    serde_json::json!({
        "status": "ok",
        "response": {"type": kind, "data": {"statuses": ["success"]}}
    })
}
