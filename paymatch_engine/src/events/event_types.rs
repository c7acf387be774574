use crate::db_types::{ApiKey, Order};

/// Published once an order has moved to `Paid`. Carries the owning merchant's key so that subscribers can sign
/// outbound notifications without another lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub api_key: ApiKey,
}

impl OrderPaidEvent {
    pub fn new(order: Order, api_key: ApiKey) -> Self {
        Self { order, api_key }
    }
}
