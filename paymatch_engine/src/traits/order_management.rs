use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Cents, NewOrder, Order, OrderNumber},
    helpers::MatchError,
};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The notification does not report credited funds")]
    NoMatch,
    #[error("No amount could be read from the notification: {0}")]
    AmountUnparseable(String),
    #[error("No pending order for {0}")]
    NoMatchingOrder(Cents),
    #[error("Order {0} not found")]
    OrderNotFound(OrderNumber),
    #[error("Order {0} is no longer pending")]
    AlreadyPaid(OrderNumber),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("The order owner (api key #{0}) no longer exists")]
    OrderOwnerNotFound(i64),
    #[error("Could not store the order after {0} attempts")]
    InsertConflict(usize),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<MatchError> for OrderFlowError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::NoMatch => Self::NoMatch,
            MatchError::AmountUnparseable(s) => Self::AmountUnparseable(s),
        }
    }
}

/// The order ledger.
///
/// Every method that takes a `since` argument treats orders created at or before that instant as stale. Callers
/// compute it as `now - expiry window`.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new pending order in a single atomic transaction:
    ///
    /// * pending orders created at or before `since` are moved to `Expired`,
    /// * the order's price is set to the first amount at or above `order.requested_price`, in one cent steps, that is
    ///   not held by another pending order (of any merchant),
    /// * a fresh order number is generated.
    ///
    /// Pending prices and order numbers are both unique in storage. A conflict rolls the transaction back and the
    /// whole step is retried a bounded number of times.
    async fn insert_order(&self, order: NewOrder, since: DateTime<Utc>) -> Result<Order, OrderFlowError>;

    /// Point lookup by order number. No status or owner filtering is applied.
    async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;

    /// The oldest pending order created after `since` whose price is exactly `price`.
    async fn fetch_pending_order_for_price(
        &self,
        price: Cents,
        since: DateTime<Utc>,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Atomically moves the order from `Pending` to `Paid`, setting `amount` and `pay_time`.
    ///
    /// Returns `None` if the order is no longer pending, in which case nothing is modified.
    async fn mark_order_paid(&self, id: i64, amount: Cents) -> Result<Option<Order>, OrderFlowError>;

    /// Moves every pending order created at or before `since` to `Expired` and returns them.
    async fn expire_orders(&self, since: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError>;
}
