//! Merchant webhook delivery.
//!
//! Once an order is paid, the merchant is told by a signed `POST` to the order's `notify_url` (see
//! [`MerchantNotification`]). Delivery hangs off the engine's `OrderPaidEvent`, so the notification request that paid
//! the order never waits for it.
//!
//! Delivery is best-effort with retries. Transport errors and non-2xx responses are retried with exponential backoff
//! until the attempt limit is reached. Deliveries that ultimately fail, or that are dropped because the delivery queue
//! is full, are logged at `error` level on the `pmg::webhook` target, which is the only record of them. The queue is
//! held in memory, so a restart between an order being paid and its webhook being accepted loses the webhook.
use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use log::*;
use paymatch_engine::{
    events::{
        EventHandlers,
        EventHooks,
        HandlerOptions,
        OrderPaidEvent,
        DEFAULT_EVENT_BUFFER_SIZE,
        WEBHOOK_LOG_TARGET,
    },
    helpers::MerchantNotification,
};
use reqwest::Client;
use thiserror::Error;

use crate::config::WebhookConfig;

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("Could not create the webhook client. {0}")]
    Initialization(String),
    #[error("The merchant responded with status {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("Could not reach the merchant. {0}")]
    Transport(String),
    #[error("Gave up after {attempts} attempts. Last error: {last}")]
    Exhausted { attempts: u32, last: Box<WebhookError> },
}

#[derive(Clone)]
pub struct MerchantWebhookClient {
    config: WebhookConfig,
    client: Arc<Client>,
}

impl MerchantWebhookClient {
    pub fn new(config: WebhookConfig) -> Result<Self, WebhookError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WebhookError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// The delay before retry number `retry` (starting at 1): the initial backoff doubled for each earlier retry,
    /// capped at the configured maximum.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(20);
        self.config.initial_backoff.saturating_mul(factor).min(self.config.max_backoff)
    }

    /// Sends the notification once.
    pub async fn send(&self, url: &str, notification: &MerchantNotification) -> Result<(), WebhookError> {
        trace!("🪝️ POST {url}");
        let response = self
            .client
            .post(url)
            .json(notification)
            .send()
            .await
            .map_err(|e| WebhookError::Transport(e.to_string()))?;
        if response.status().is_success() {
            trace!("🪝️ {url} accepted the notification. {}", response.status());
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(WebhookError::Rejected { status, message })
        }
    }

    /// Sends the notification, retrying until it is accepted or the attempt limit is reached. Returns the number of
    /// attempts used.
    pub async fn deliver(&self, url: &str, notification: &MerchantNotification) -> Result<u32, WebhookError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.send(url, notification).await {
                Ok(()) => return Ok(attempt),
                Err(e) if attempt >= max_attempts => {
                    return Err(WebhookError::Exhausted { attempts: attempt, last: Box::new(e) });
                },
                Err(e) => {
                    let delay = self.backoff(attempt);
                    debug!(
                        "🪝️ Webhook for {} failed on attempt {attempt}/{max_attempts}. {e}. Retrying in {}ms",
                        notification.pay_id,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
            }
        }
    }
}

/// Builds the event handlers that deliver a webhook for every paid order.
pub fn create_webhook_event_handlers(config: WebhookConfig) -> Result<EventHandlers, WebhookError> {
    let concurrency = config.concurrency;
    let client = MerchantWebhookClient::new(config)?;
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let OrderPaidEvent { order, api_key } = ev;
        let notification = match MerchantNotification::for_paid_order(&order, &api_key) {
            Ok(n) => n,
            Err(e) => {
                error!(target: WEBHOOK_LOG_TARGET, "🪝️ Cannot build the webhook for order {}. {e}", order.order_number);
                return no_op();
            },
        };
        let client = client.clone();
        Box::pin(async move {
            let url = order.notify_url.as_str();
            info!("🪝️ Notifying {url} that order {} is paid", order.order_number);
            match client.deliver(url, &notification).await {
                Ok(attempts) => info!("🪝️ Order {} webhook delivered after {attempts} attempt(s)", order.order_number),
                Err(e) => error!(
                    target: WEBHOOK_LOG_TARGET,
                    "🪝️ Webhook for order {} to {url} was not delivered. {e}. Payload: {}",
                    order.order_number,
                    serde_json::to_string(&notification).unwrap_or_default()
                ),
            }
        })
    });
    Ok(EventHandlers::new(HandlerOptions::new(DEFAULT_EVENT_BUFFER_SIZE, concurrency), hooks))
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
