use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use pmg_common::Cents;
use pmg_common::Secret;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {0} value: {1}")]
pub struct ConversionError(&'static str, String);

/// Implements integer (de)serialization for the `#[repr(i32)]` enums below, since both the database and the JSON
/// representations of these fields are plain integers.
macro_rules! int_enum_serde {
    ($type:ty) => {
        impl Serialize for $type {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_i32(*self as i32)
            }
        }

        impl<'de> Deserialize<'de> for $type {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = i32::deserialize(deserializer)?;
                Self::try_from(value).map_err(de::Error::custom)
            }
        }
    };
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type)]
#[repr(i32)]
pub enum OrderStatusType {
    /// The order has been created and is waiting for a matching payment notification.
    Pending = 0,
    /// A payment notification was matched to the order.
    Paid = 1,
    /// The order was not paid within the expiry window.
    Expired = 2,
}

int_enum_serde!(OrderStatusType);

impl TryFrom<i32> for OrderStatusType {
    type Error = ConversionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Paid),
            2 => Ok(Self::Expired),
            v => Err(ConversionError("order status", v.to_string())),
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
/// The channel the payer uses to remit the order amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type)]
#[repr(i32)]
pub enum PaymentMethod {
    #[default]
    WeChatPay = 1,
    AliPay = 2,
}

int_enum_serde!(PaymentMethod);

impl TryFrom<i32> for PaymentMethod {
    type Error = ConversionError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::WeChatPay),
            2 => Ok(Self::AliPay),
            v => Err(ConversionError("payment method", v.to_string())),
        }
    }
}

impl PaymentMethod {
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::WeChatPay => write!(f, "WeChatPay"),
            PaymentMethod::AliPay => write!(f, "AliPay"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "wechatpay" | "wechat" => Ok(Self::WeChatPay),
            "2" | "alipay" => Ok(Self::AliPay),
            _ => Err(ConversionError("payment method", s.to_string())),
        }
    }
}

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// The externally visible order identifier. See [`crate::helpers::new_order_number`] for the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        ApiKey         ---------------------------------------------------------
/// A merchant credential pair. The access key identifies the merchant on every call; the secret key signs and
/// verifies payloads and never leaves the server.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ApiKey {
    pub id: i64,
    pub name: String,
    pub access_key: String,
    #[serde(skip_serializing)]
    pub secret_key: Secret<String>,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PartialEq for ApiKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id &&
            self.access_key == other.access_key &&
            self.secret_key.reveal() == other.secret_key.reveal()
    }
}

impl Eq for ApiKey {}

//--------------------------------------       NewApiKey       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub name: String,
    pub access_key: String,
    pub secret_key: Secret<String>,
    pub remark: String,
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub payment_method: PaymentMethod,
    pub status: OrderStatusType,
    /// The amount the payer must remit. May be higher than the requested amount if other pending orders already
    /// claimed it.
    pub price: Cents,
    /// The amount reported by the matching payment notification.
    pub amount: Option<Cents>,
    pub notify_url: String,
    pub api_key_id: i64,
    pub create_time: DateTime<Utc>,
    pub pay_time: Option<DateTime<Utc>>,
    pub update_time: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The amount the merchant asked for. The stored price is the first free amount at or above this value.
    pub requested_price: Cents,
    pub payment_method: PaymentMethod,
    pub notify_url: String,
    pub api_key_id: i64,
}

impl NewOrder {
    pub fn new(api_key_id: i64, requested_price: Cents, notify_url: &str) -> Self {
        Self {
            requested_price,
            payment_method: PaymentMethod::default(),
            notify_url: notify_url.to_string(),
            api_key_id,
        }
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }
}
