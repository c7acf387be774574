use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{ApiKey, Cents, NewOrder, Order, OrderNumber, PaymentMethod},
    events::{EventProducers, OrderPaidEvent, WEBHOOK_LOG_TARGET},
    helpers::{CreditedFundsParser, NotificationParser},
    traits::{ApiKeyManagement, OrderFlowError, OrderManagement},
};

pub const DEFAULT_ORDER_EXPIRY_SECONDS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFlowConfig {
    /// How long an order stays payable. Older pending orders are neither matched nor counted as holding a price.
    pub expiry: Duration,
}

impl Default for OrderFlowConfig {
    fn default() -> Self {
        Self { expiry: Duration::seconds(DEFAULT_ORDER_EXPIRY_SECONDS) }
    }
}

impl OrderFlowConfig {
    pub fn new(expiry: Duration) -> Self {
        Self { expiry }
    }
}

/// `OrderFlowApi` is the primary API for the order ledger. Merchant order requests come in through
/// [`Self::create_order`] and payment notifications through [`Self::process_notification`].
pub struct OrderFlowApi<B> {
    db: B,
    config: OrderFlowConfig,
    producers: EventProducers,
    parser: Arc<dyn NotificationParser>,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi (expiry: {}s)", self.config.expiry.num_seconds())
    }
}

impl<B> OrderFlowApi<B> {
    /// Creates the API with the default notification parser.
    pub fn new(db: B, config: OrderFlowConfig, producers: EventProducers) -> Self {
        Self { db, config, producers, parser: CreditedFundsParser::default().into_shared() }
    }

    pub fn with_parser(mut self, parser: Arc<dyn NotificationParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &OrderFlowConfig {
        &self.config
    }

    /// Orders created at or before this instant are stale.
    pub fn cutoff(&self) -> DateTime<Utc> {
        Utc::now() - self.config.expiry
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + ApiKeyManagement
{
    /// Creates a pending order for the merchant.
    ///
    /// The stored price is the first amount at or above `requested_price` (in one cent steps) not held by any other
    /// pending order, so that an incoming payment amount identifies exactly one order. Check the returned
    /// `price`; it is what the payer must remit.
    pub async fn create_order(
        &self,
        merchant: &ApiKey,
        requested_price: Cents,
        payment_method: PaymentMethod,
        notify_url: &str,
    ) -> Result<Order, OrderFlowError> {
        if !requested_price.is_positive() {
            return Err(OrderFlowError::InvalidPrice(format!("{requested_price} is not a positive amount")));
        }
        let order = NewOrder::new(merchant.id, requested_price, notify_url).with_payment_method(payment_method);
        let order = self.db.insert_order(order, self.cutoff()).await?;
        info!(
            "🔄️📦️ Order {} created for api key #{}. Payable amount is {} via {}",
            order.order_number, merchant.id, order.price, order.payment_method
        );
        Ok(order)
    }

    /// Point lookup by order number. Ownership is not checked here.
    pub async fn order_status(&self, order_number: &OrderNumber) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order_by_order_number(order_number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_number.clone()))
    }

    /// Finds the pending order that a free-text payment notification refers to. Nothing is modified.
    pub async fn match_notification(&self, message: &str) -> Result<Order, OrderFlowError> {
        let amount = self.parser.parse_amount(message)?;
        trace!("🔄️💰️ Notification reports {amount} credited");
        let order = self.db.fetch_pending_order_for_price(amount, self.cutoff()).await?.ok_or_else(|| {
            debug!("🔄️💰️ No pending order for {amount}");
            OrderFlowError::NoMatchingOrder(amount)
        })?;
        if let Some(hint) = self.parser.payment_method_hint(message) {
            if hint != order.payment_method {
                debug!(
                    "🔄️💰️ Notification looks like {hint} but order {} expects {}. Matching on amount regardless.",
                    order.order_number, order.payment_method
                );
            }
        }
        Ok(order)
    }

    /// Moves `order` from `Pending` to `Paid` with the observed `amount`, and notifies the order paid subscribers.
    ///
    /// Fails with [`OrderFlowError::AlreadyPaid`] if the order is no longer pending, for example because a concurrent
    /// notification got there first.
    pub async fn mark_paid(&self, order: &Order, amount: Cents) -> Result<Order, OrderFlowError> {
        let owner = self
            .db
            .fetch_api_key(order.api_key_id)
            .await
            .map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?
            .ok_or(OrderFlowError::OrderOwnerNotFound(order.api_key_id))?;
        let paid = self.db.mark_order_paid(order.id, amount).await?.ok_or_else(|| {
            debug!("🔄️💰️ Order {} was no longer pending when it was marked paid", order.order_number);
            OrderFlowError::AlreadyPaid(order.order_number.clone())
        })?;
        info!("🔄️💰️ Order {} is paid ({amount})", paid.order_number);
        self.call_order_paid_hook(&paid, &owner);
        Ok(paid)
    }

    /// Matches a notification and marks the order paid.
    pub async fn process_notification(&self, message: &str) -> Result<Order, OrderFlowError> {
        let order = self.match_notification(message).await?;
        let amount = order.price;
        self.mark_paid(&order, amount).await
    }

    /// Moves every stale pending order to `Expired`.
    pub async fn expire_stale_orders(&self) -> Result<Vec<Order>, OrderFlowError> {
        let expired = self.db.expire_orders(self.cutoff()).await?;
        for order in &expired {
            debug!("🔄️🕰️ Order {} ({}) expired", order.order_number, order.price);
        }
        Ok(expired)
    }

    /// Hands the paid order to the subscribers without waiting for them. If a queue is full the notification is
    /// lost, and the order stays paid.
    fn call_order_paid_hook(&self, order: &Order, owner: &ApiKey) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone(), owner.clone());
            if let Err(e) = emitter.publish_event(event) {
                error!(
                    target: WEBHOOK_LOG_TARGET,
                    "🔄️📦️ Order {} ({}) is paid but its notification was dropped. {e}",
                    order.order_number,
                    order.price
                );
            }
        }
    }
}
