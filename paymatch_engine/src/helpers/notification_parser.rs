//! Free-text payment notification parsing.
//!
//! Payment notifications arrive as the text of a "funds credited" message forwarded from the payee's device, e.g.
//! `微信支付收款到账10.01元`. The only correlation key they carry is the amount, so parsing is reduced to two questions:
//! does this message report credited funds, and how much?
use std::sync::Arc;

use log::trace;
use regex::Regex;
use thiserror::Error;

use crate::db_types::{Cents, PaymentMethod};

/// The marker that credited-funds messages carry by default.
pub const DEFAULT_CREDIT_MARKER: &str = "到账";
const WECHAT_MARKER: &str = "微信支付";
const ALIPAY_MARKER: &str = "支付宝";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("The message does not report credited funds")]
    NoMatch,
    #[error("No two-decimal amount found in \"{0}\"")]
    AmountUnparseable(String),
}

/// Extracts the credited amount from a notification message.
///
/// Implementations must not touch storage. They are handed the raw message and either return an amount or explain
/// why they cannot.
pub trait NotificationParser: Send + Sync {
    fn parse_amount(&self, message: &str) -> Result<Cents, MatchError>;

    /// The payment channel the message came from, if the message says so. Used for logging only.
    fn payment_method_hint(&self, _message: &str) -> Option<PaymentMethod> {
        None
    }
}

/// Recognises messages containing a credited-funds marker and reads the first amount with exactly two decimals.
#[derive(Debug, Clone)]
pub struct CreditedFundsParser {
    marker: String,
    amount: Regex,
}

impl Default for CreditedFundsParser {
    fn default() -> Self {
        Self::new(DEFAULT_CREDIT_MARKER)
    }
}

impl CreditedFundsParser {
    pub fn new(marker: &str) -> Self {
        // An optional unit may follow the amount
        let amount = Regex::new(r"(\d+\.\d{2})(?:\s*元)?").unwrap();
        Self { marker: marker.to_string(), amount }
    }

    pub fn into_shared(self) -> Arc<dyn NotificationParser> {
        Arc::new(self)
    }
}

impl NotificationParser for CreditedFundsParser {
    fn parse_amount(&self, message: &str) -> Result<Cents, MatchError> {
        if !message.contains(&self.marker) {
            trace!("🧾️ No '{}' marker in notification", self.marker);
            return Err(MatchError::NoMatch);
        }
        let amount = self
            .amount
            .captures(message)
            .and_then(|c| c.get(1))
            .ok_or_else(|| MatchError::AmountUnparseable(message.to_string()))?;
        amount.as_str().parse::<Cents>().map_err(|_| MatchError::AmountUnparseable(message.to_string()))
    }

    fn payment_method_hint(&self, message: &str) -> Option<PaymentMethod> {
        if message.contains(WECHAT_MARKER) {
            Some(PaymentMethod::WeChatPay)
        } else if message.contains(ALIPAY_MARKER) {
            Some(PaymentMethod::AliPay)
        } else {
            None
        }
    }
}
