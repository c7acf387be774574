use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use cucumber::{then, when};
use paymatch_engine::{
    db_types::{Cents, OrderNumber, OrderStatusType, PaymentMethod},
    OrderFlowError,
};

use crate::cucumber::PaymatchWorld;

fn cents(s: &str) -> Cents {
    s.parse().unwrap_or_else(|e| panic!("{s} is not an amount: {e}"))
}

fn error_name(e: &OrderFlowError) -> &'static str {
    match e {
        OrderFlowError::DatabaseError(_) => "DatabaseError",
        OrderFlowError::NoMatch => "NoMatch",
        OrderFlowError::AmountUnparseable(_) => "AmountUnparseable",
        OrderFlowError::NoMatchingOrder(_) => "NoMatchingOrder",
        OrderFlowError::OrderNotFound(_) => "OrderNotFound",
        OrderFlowError::AlreadyPaid(_) => "AlreadyPaid",
        OrderFlowError::InvalidPrice(_) => "InvalidPrice",
        OrderFlowError::OrderOwnerNotFound(_) => "OrderOwnerNotFound",
        OrderFlowError::InsertConflict(_) => "InsertConflict",
    }
}

#[when(expr = "'{word}' creates order '{word}' for {word}")]
async fn create_order(world: &mut PaymatchWorld, merchant: String, alias: String, price: String) {
    create_order_with_method(world, merchant, alias, price, PaymentMethod::WeChatPay).await;
}

#[when(expr = "'{word}' creates order '{word}' for {word} paid with {word}")]
async fn create_order_paid_with(world: &mut PaymatchWorld, merchant: String, alias: String, price: String, m: String) {
    let method = m.parse::<PaymentMethod>().expect("Unknown payment method");
    create_order_with_method(world, merchant, alias, price, method).await;
}

async fn create_order_with_method(
    world: &mut PaymatchWorld,
    merchant: String,
    alias: String,
    price: String,
    method: PaymentMethod,
) {
    let key = world.merchant(&merchant);
    let order = world
        .system()
        .orders
        .create_order(&key, cents(&price), method, "https://shop.example/notify")
        .await
        .expect("Error creating order");
    world.system_mut().created.insert(alias, order);
}

#[when(expr = "'{word}' tries to create an order for {word}")]
async fn create_invalid_order(world: &mut PaymatchWorld, merchant: String, price: String) {
    let key = world.merchant(&merchant);
    let result =
        world.system().orders.create_order(&key, cents(&price), PaymentMethod::default(), "https://x.example").await;
    assert!(matches!(result, Err(OrderFlowError::InvalidPrice(_))), "Expected InvalidPrice, got {result:?}");
}

#[when(expr = "order '{word}' was created {int} seconds ago")]
async fn backdate_order(world: &mut PaymatchWorld, alias: String, seconds: i64) {
    let order = world.order(&alias);
    let created = Utc::now() - Duration::seconds(seconds);
    sqlx::query("UPDATE orders SET create_time = $1 WHERE id = $2")
        .bind(created)
        .bind(order.id)
        .execute(world.system().orders.db().pool())
        .await
        .expect("Error backdating order");
}

#[when(expr = "the notification {string} arrives")]
async fn notification_arrives(world: &mut PaymatchWorld, message: String) {
    let result = world.system().orders.process_notification(&message).await;
    world.system_mut().last_notification = Some(result);
}

#[when("the expiry sweep runs")]
async fn expiry_sweep(world: &mut PaymatchWorld) {
    world.system().orders.expire_stale_orders().await.expect("Error expiring orders");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut PaymatchWorld, ms: u64) {
    tokio::time::sleep(StdDuration::from_millis(ms)).await;
}

#[then(expr = "order '{word}' has price {word}")]
async fn check_price(world: &mut PaymatchWorld, alias: String, price: String) {
    let order = world.order(&alias);
    assert_eq!(order.price, cents(&price), "Unexpected price for order {alias}");
}

#[then(expr = "order '{word}' is {word}")]
async fn check_status(world: &mut PaymatchWorld, alias: String, status: String) {
    let number = world.order(&alias).order_number;
    let order = world.system().orders.order_status(&number).await.expect("Error fetching order");
    let expected = status.parse::<OrderStatusType>().expect("Unknown status");
    assert_eq!(order.status, expected, "Unexpected status for order {alias}");
    match expected {
        OrderStatusType::Paid => assert!(order.pay_time.is_some() && order.amount.is_some()),
        _ => assert!(order.pay_time.is_none() && order.amount.is_none()),
    }
}

#[then(expr = "order '{word}' has paid amount {word}")]
async fn check_amount(world: &mut PaymatchWorld, alias: String, amount: String) {
    let number = world.order(&alias).order_number;
    let order = world.system().orders.order_status(&number).await.expect("Error fetching order");
    assert_eq!(order.amount, Some(cents(&amount)));
}

#[then(expr = "the notification matched order '{word}'")]
async fn check_matched(world: &mut PaymatchWorld, alias: String) {
    let expected = world.order(&alias);
    match world.system().last_notification.as_ref() {
        Some(Ok(order)) => assert_eq!(order.id, expected.id, "The notification matched the wrong order"),
        other => panic!("Expected a match, got {other:?}"),
    }
}

#[then(expr = "the notification was rejected with {word}")]
async fn check_rejected(world: &mut PaymatchWorld, error: String) {
    match world.system().last_notification.as_ref() {
        Some(Err(e)) => assert_eq!(error_name(e), error, "Unexpected error: {e}"),
        other => panic!("Expected {error}, got {other:?}"),
    }
}

#[then(expr = "order number '{word}' does not exist")]
async fn check_missing(world: &mut PaymatchWorld, number: String) {
    let result = world.system().orders.order_status(&OrderNumber::from(number)).await;
    assert!(matches!(result, Err(OrderFlowError::OrderNotFound(_))));
}

#[then(expr = "{int} order paid event(s) was/were published")]
async fn check_events(world: &mut PaymatchWorld, count: usize) {
    // The handler runs on its own task
    tokio::time::sleep(StdDuration::from_millis(100)).await;
    let events = world.system().paid_events.lock().expect("Poisoned event sink").clone();
    assert_eq!(events.len(), count);
    for ev in events {
        assert_eq!(ev.order.api_key_id, ev.api_key.id);
        assert_eq!(ev.order.status, OrderStatusType::Paid);
    }
}
