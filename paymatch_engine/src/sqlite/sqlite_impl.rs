//! `SqliteDatabase` is the concrete PayMatch backend.
//!
//! It implements every trait in [`crate::traits`] on top of a SQLite connection pool. Multi-statement flows run in a
//! single transaction; the statements themselves live in [`super::db`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{api_keys, is_unique_violation, new_pool, orders, run_migrations};
use crate::{
    db_types::{ApiKey, Cents, NewApiKey, NewOrder, Order, OrderNumber},
    traits::{ApiKeyError, ApiKeyManagement, OrderFlowError, OrderManagement},
};

/// How many times order creation is retried after losing a race for a price or an order number.
pub const MAX_INSERT_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        run_migrations(&self.pool).await?;
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl ApiKeyManagement for SqliteDatabase {
    async fn fetch_api_key_by_access_key(&self, access_key: &str) -> Result<Option<ApiKey>, ApiKeyError> {
        let mut conn = self.pool.acquire().await?;
        let key = api_keys::fetch_api_key_by_access_key(access_key, &mut conn).await?;
        Ok(key)
    }

    async fn fetch_api_key(&self, id: i64) -> Result<Option<ApiKey>, ApiKeyError> {
        let mut conn = self.pool.acquire().await?;
        let key = api_keys::fetch_api_key(id, &mut conn).await?;
        Ok(key)
    }

    async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, ApiKeyError> {
        let mut conn = self.pool.acquire().await?;
        api_keys::insert_api_key(key, &mut conn).await
    }

    async fn update_api_key(&self, id: i64, name: &str, remark: &str) -> Result<ApiKey, ApiKeyError> {
        let mut conn = self.pool.acquire().await?;
        api_keys::update_api_key(id, name, remark, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder, since: DateTime<Utc>) -> Result<Order, OrderFlowError> {
        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let mut tx = self.pool.begin().await?;
            match orders::create_pending_order(&order, since, &mut tx).await {
                Ok(stored) => {
                    tx.commit().await?;
                    debug!(
                        "🗃️ Order {} saved for api key #{} at {} (requested {})",
                        stored.order_number, stored.api_key_id, stored.price, order.requested_price
                    );
                    return Ok(stored);
                },
                Err(e) if is_unique_violation(&e) => {
                    debug!("🗃️ Order insert attempt {attempt} collided with a concurrent order. {e}");
                    tx.rollback().await?;
                },
                Err(e) => return Err(e.into()),
            }
        }
        warn!("🗃️ Gave up storing an order for {} after {MAX_INSERT_ATTEMPTS} attempts", order.requested_price);
        Err(OrderFlowError::InsertConflict(MAX_INSERT_ATTEMPTS))
    }

    async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_pending_order_for_price(
        &self,
        price: Cents,
        since: DateTime<Utc>,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_pending_order_for_price(price, since, &mut conn).await?;
        Ok(order)
    }

    async fn mark_order_paid(&self, id: i64, amount: Cents) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_order_paid(id, amount, &mut conn).await?;
        Ok(order)
    }

    async fn expire_orders(&self, since: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let expired = orders::expire_orders(since, &mut conn).await?;
        Ok(expired)
    }
}
