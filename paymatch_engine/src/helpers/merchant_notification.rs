use pmg_common::Secret;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{ApiKey, Order},
    helpers::signatures::{ApiSignature, SignatureError},
};

/// The webhook body sent to a merchant's `notify_url` once one of their orders is paid.
///
/// Amounts are JSON numbers here (not strings), and `sign` is the [`ApiSignature`] of the other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantNotification {
    pub ak: String,
    pub pay_id: String,
    pub pay_type: i32,
    pub price: f64,
    pub really_price: f64,
    pub sign: String,
}

impl MerchantNotification {
    /// Builds and signs the notification for a paid order, using the owner's credentials.
    pub fn for_paid_order(order: &Order, owner: &ApiKey) -> Result<Self, SignatureError> {
        let really_price = order.amount.ok_or_else(|| {
            SignatureError::UnsignablePayload(format!("order {} has no paid amount", order.order_number))
        })?;
        let mut notification = Self {
            ak: owner.access_key.clone(),
            pay_id: order.order_number.to_string(),
            pay_type: order.payment_method.code(),
            price: order.price.as_f64(),
            really_price: really_price.as_f64(),
            sign: String::default(),
        };
        notification.sign = ApiSignature::sign_payload(&notification, &owner.secret_key)?;
        Ok(notification)
    }

    pub fn verify(&self, secret: &Secret<String>) -> Result<(), SignatureError> {
        ApiSignature::verify_payload(self, secret)
    }
}
