use paymatch_engine::db_types::{Order, PaymentMethod};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

//--------------------------------------       Requests        ---------------------------------------------------------
/// `POST /order/create`
///
/// The fields are signed as they are serialized here, so `payment_method` takes part in the signature even when the
/// merchant omitted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub ak: String,
    pub sign: String,
    pub price: f64,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub notify_url: String,
}

/// `GET /order/check`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOrderRequest {
    pub ak: String,
    pub sign: String,
    pub order_number: String,
}

/// `POST /order/notify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyRequest {
    pub ak: String,
    pub sign: String,
    pub msg: String,
    /// The channel the forwarding device reports. Informational only.
    #[serde(rename = "type", default)]
    pub channel: Option<Value>,
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a string or a number, got {other}"))),
    }
}

//--------------------------------------       Responses       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseCode {
    Success,
    Error,
    ParamsError,
    ServiceError,
}

/// The envelope every merchant API response is wrapped in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: ResponseCode,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { code: ResponseCode::Success, message: "success".to_string(), data: Some(data) }
    }
}

impl ApiResponse<Value> {
    pub fn failure<S: Into<String>>(code: ResponseCode, message: S, data: Option<Value>) -> Self {
        Self { code, message: message.into(), data }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub pay_url: String,
}

/// The plain-string replies of `POST /order/notify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The message does not report credited funds, or carries no amount.
    Ignored,
    /// No pending order has the amount, or another notification paid it first.
    OrderNotFound,
    Paid,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Ignored => "error",
            NotifyOutcome::OrderNotFound => "未找到对应订单",
            NotifyOutcome::Paid => "success",
        }
    }
}
