use crate::wallet::EcdsaSignature;
use serde::{Deserialize, Serialize};

// Exchange endpoint types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub coin: String,
    pub is_buy: bool,
    pub sz: String,
    pub limit_px: String,
    pub order_type: OrderType,
    pub reduce_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderType {
    Limit { limit: LimitOrder },
    Trigger { trigger: TriggerOrder },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitOrder {
    pub tif: TimeInForce,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerOrder {
    #[serde(rename = "triggerPx")]
    pub trigger_px: String,
    #[serde(rename = "isMarket")]
    pub is_market: bool,
    pub tpsl: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Alo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub coin: String,
    pub oid: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelByCloidRequest {
    pub coin: String,
    pub cloid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyRequest {
    pub oid: u64,
    pub order: OrderRequest,
}

/// The signed envelope submitted to the exchange endpoint. `vaultAddress` is
/// serialized as an explicit null when unset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    pub action: serde_json::Value,
    pub nonce: u64,
    pub signature: EcdsaSignature,
    pub vault_address: Option<String>,
}

/// Response envelope for signed actions.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    pub status: String,
    #[serde(default)]
    pub response: Option<ActionResponseBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionResponseBody {
    /// Bare rejection message.
    Message(String),
    Data(ActionResponseData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponseData {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<ActionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionData {
    #[serde(default)]
    pub statuses: Vec<ActionStatus>,
}

/// First status entry of an action response; the shape varies by outcome.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionStatus {
    Resting { resting: RestingOrder },
    Filled { filled: FilledOrder },
    Error { error: String },
    Plain(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestingOrder {
    pub oid: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilledOrder {
    #[serde(rename = "avgPx")]
    pub avg_px: String,
    pub oid: u64,
    #[serde(rename = "totalSz")]
    pub total_sz: String,
}

impl ActionResponse {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    #[must_use]
    pub fn first_status(&self) -> Option<&ActionStatus> {
        match self.response.as_ref()? {
            ActionResponseBody::Data(data) => data.data.as_ref()?.statuses.first(),
            ActionResponseBody::Message(_) => None,
        }
    }

    /// Best-effort rejection reason for non-ok or errored responses.
    #[must_use]
    pub fn rejection_reason(&self) -> String {
        if let Some(ActionStatus::Error { error }) = self.first_status() {
            return error.clone();
        }
        match &self.response {
            Some(ActionResponseBody::Message(message)) => message.clone(),
            _ => format!("action returned status {}", self.status),
        }
    }
}

// Info endpoint types

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InfoRequest {
    #[serde(rename = "allMids")]
    AllMids,
    #[serde(rename = "userState")]
    UserState { user: String },
    #[serde(rename = "openOrders")]
    OpenOrders { user: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserState {
    #[serde(rename = "assetPositions", default)]
    pub asset_positions: Vec<AssetPosition>,
    #[serde(rename = "marginSummary")]
    pub margin_summary: MarginSummary,
    #[serde(rename = "withdrawable")]
    pub withdrawable: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPosition {
    pub position: PositionData,
    #[serde(rename = "type")]
    pub position_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionData {
    pub coin: String,
    #[serde(rename = "entryPx")]
    pub entry_px: Option<String>,
    pub leverage: LeverageData,
    #[serde(rename = "liquidationPx")]
    pub liquidation_px: Option<String>,
    #[serde(rename = "marginUsed")]
    pub margin_used: String,
    #[serde(rename = "positionValue")]
    pub position_value: String,
    #[serde(rename = "returnOnEquity")]
    pub return_on_equity: String,
    pub szi: String,
    #[serde(rename = "unrealizedPnl")]
    pub unrealized_pnl: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeverageData {
    #[serde(rename = "type")]
    pub leverage_type: String,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginSummary {
    #[serde(rename = "accountValue")]
    pub account_value: String,
    #[serde(rename = "totalMarginUsed")]
    pub total_margin_used: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub coin: String,
    #[serde(rename = "limitPx")]
    pub limit_px: String,
    pub oid: u64,
    pub side: String,
    pub sz: String,
    pub timestamp: u64,
}
