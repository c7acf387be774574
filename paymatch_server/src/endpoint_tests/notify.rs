use actix_web::{http::StatusCode, web::ServiceConfig};
use paymatch_engine::db_types::{Cents, Order};
use serde_json::json;

use super::{helpers::*, mocks::MockLedger};
use crate::{config::RouteOptions, routes::NotifyRoute};

fn configure(orders: MockLedger, keys: MockLedger) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        add_apis(cfg, orders, keys, RouteOptions::default());
        cfg.service(NotifyRoute::<MockLedger>::new());
    }
}

/// A ledger holding a single pending order at `price`. `wins_race` decides whether marking it paid succeeds.
fn ledger_with_pending(price: i64, wins_race: bool) -> MockLedger {
    let order = pending_order(price);
    let mut orders = MockLedger::new();
    let pending = order.clone();
    orders
        .expect_fetch_pending_order_for_price()
        .returning(move |p, _| Ok((p == pending.price).then(|| pending.clone())));
    orders.expect_fetch_api_key().returning(|id| Ok(Some(merchant(id))));
    let settled = paid(&order);
    orders
        .expect_mark_order_paid()
        .withf(move |id, amount| *id == 7 && *amount == Cents::from(price))
        .returning(move |_, _| Ok(wins_race.then(|| settled.clone())));
    orders
}

fn ledger_without_lookups() -> MockLedger {
    let mut orders = MockLedger::new();
    orders.expect_fetch_pending_order_for_price().never();
    orders.expect_mark_order_paid().never();
    orders
}

#[actix_web::test]
async fn notification_pays_the_matching_order() {
    let _ = env_logger::try_init().ok();
    let req = signed_notification("微信支付收款10.01元到账");
    let (status, body) =
        post_request("/order/notify", &req, configure(ledger_with_pending(1001, true), known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""success""#);
}

#[actix_web::test]
async fn numeric_timestamps_are_accepted() {
    let _ = env_logger::try_init().ok();
    let req = signed_notification("到账10.01元");
    let body = json!({ "ak": req.ak, "sign": req.sign, "msg": req.msg, "type": 1, "timestamp": 1717243200000u64 });
    let (status, body) =
        post_request("/order/notify", &body, configure(ledger_with_pending(1001, true), known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""success""#);
}

#[actix_web::test]
async fn notification_without_marker_is_ignored() {
    let _ = env_logger::try_init().ok();
    let req = signed_notification("微信支付收款10.01元");
    let (status, body) =
        post_request("/order/notify", &req, configure(ledger_without_lookups(), known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""error""#);
}

#[actix_web::test]
async fn notification_without_amount_is_ignored() {
    let _ = env_logger::try_init().ok();
    let req = signed_notification("支付宝到账十元");
    let (status, body) =
        post_request("/order/notify", &req, configure(ledger_without_lookups(), known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""error""#);
}

#[actix_web::test]
async fn notification_for_unknown_amount() {
    let _ = env_logger::try_init().ok();
    let req = signed_notification("到账10.02元");
    let (status, body) =
        post_request("/order/notify", &req, configure(ledger_with_pending(1001, true), known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""未找到对应订单""#);
}

#[actix_web::test]
async fn notification_that_loses_the_race() {
    let _ = env_logger::try_init().ok();
    let req = signed_notification("到账10.01元");
    let (status, body) =
        post_request("/order/notify", &req, configure(ledger_with_pending(1001, false), known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""未找到对应订单""#);
}

#[actix_web::test]
async fn notification_with_bad_signature() {
    let _ = env_logger::try_init().ok();
    let mut req = signed_notification("到账10.01元");
    req.timestamp = "1717243200001".into();
    let (status, body) =
        post_request("/order/notify", &req, configure(ledger_without_lookups(), known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"code":"ERROR","message":"sign error","data":null}"#);
}

#[actix_web::test]
async fn notification_for_deleted_owner_is_a_fault() {
    let _ = env_logger::try_init().ok();
    let order: Order = pending_order(1001);
    let mut orders = MockLedger::new();
    orders.expect_fetch_pending_order_for_price().returning(move |_, _| Ok(Some(order.clone())));
    orders.expect_fetch_api_key().returning(|_| Ok(None));
    orders.expect_mark_order_paid().never();
    let req = signed_notification("到账10.01元");
    let (status, body) = post_request("/order/notify", &req, configure(orders, known_merchant())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"code":"SERVICE_ERROR","message":"service error","data":null}"#);
}
