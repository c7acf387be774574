use chrono::{DateTime, Utc};
use log::{debug, trace};
use pmg_common::ONE_CENT;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cents, NewOrder, Order, OrderNumber},
    helpers::new_order_number,
};

/// Moves every pending order created at or before `since` to `Expired`.
///
/// Inside a transaction this is the first statement of the order creation flow. Being a write, it takes the database
/// write lock before any prices are read, which serialises concurrent order creation.
pub async fn expire_orders(since: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let now = Utc::now();
    let orders: Vec<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = 2, update_time = $1
            WHERE status = 0 AND create_time <= $2
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(since)
    .fetch_all(conn)
    .await?;
    if !orders.is_empty() {
        debug!("🗃️ {} stale pending orders expired", orders.len());
    }
    Ok(orders)
}

/// Prices of all pending orders at or above `floor`, in ascending order.
pub async fn pending_prices_from(floor: Cents, conn: &mut SqliteConnection) -> Result<Vec<Cents>, sqlx::Error> {
    let prices: Vec<(Cents,)> =
        sqlx::query_as("SELECT price FROM orders WHERE status = 0 AND price >= $1 ORDER BY price ASC")
            .bind(floor)
            .fetch_all(conn)
            .await?;
    Ok(prices.into_iter().map(|(p,)| p).collect())
}

/// The first price at or above `requested`, in one cent steps, that is not in `taken`. `taken` must be sorted in
/// ascending order.
pub fn first_free_price(requested: Cents, taken: &[Cents]) -> Cents {
    let mut candidate = requested;
    for price in taken {
        if *price == candidate {
            candidate += ONE_CENT;
        } else if *price > candidate {
            break;
        }
    }
    candidate
}

/// Inserts a pending order at exactly `price` with a new order number. This is not atomic with respect to the
/// price selection. Run it inside the same transaction as [`pending_prices_from`].
pub async fn insert_order(
    order: &NewOrder,
    price: Cents,
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                payment_method,
                status,
                price,
                notify_url,
                api_key_id,
                create_time,
                update_time
            ) VALUES ($1, $2, 0, $3, $4, $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(order_number.as_str())
    .bind(order.payment_method)
    .bind(price)
    .bind(order.notify_url.as_str())
    .bind(order.api_key_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Runs the full creation step on one connection, which should be a fresh transaction: lazy expiry, price
/// selection and insert.
pub async fn create_pending_order(
    order: &NewOrder,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    expire_orders(since, &mut *conn).await?;
    let taken = pending_prices_from(order.requested_price, &mut *conn).await?;
    let price = first_free_price(order.requested_price, &taken);
    if price != order.requested_price {
        debug!(
            "🗃️ {} is held by a pending order. Using {price} for the new order instead.",
            order.requested_price
        );
    }
    let order_number = new_order_number(Utc::now());
    trace!("🗃️ Inserting order {order_number} at {price}");
    insert_order(order, price, &order_number, conn).await
}

pub async fn fetch_order_by_order_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// The oldest pending order at exactly `price` that was created after `since`.
pub async fn fetch_pending_order_for_price(
    price: Cents,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            SELECT * FROM orders
            WHERE status = 0 AND price = $1 AND create_time > $2
            ORDER BY create_time ASC, id ASC
            LIMIT 1;
        "#,
    )
    .bind(price)
    .bind(since)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Compare-and-set from `Pending` to `Paid`. Returns `None` without modifying anything if the order is not pending.
pub async fn mark_order_paid(
    id: i64,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let now = Utc::now();
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = 1, amount = $1, pay_time = $2, update_time = $2
            WHERE id = $3 AND status = 0
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(now)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
