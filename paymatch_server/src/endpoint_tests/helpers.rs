use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use paymatch_engine::{
    db_types::{ApiKey, Cents, Order, OrderNumber, OrderStatusType, PaymentMethod},
    events::EventProducers,
    helpers::{ApiSignature, CallbackSignature},
    ApiKeyApi,
    OrderFlowApi,
    OrderFlowConfig,
};
use pmg_common::Secret;
use serde::Serialize;

use super::mocks::MockLedger;
use crate::{
    config::RouteOptions,
    data_objects::{CheckOrderRequest, CreateOrderRequest, NotifyRequest},
    routes::json_config,
};

pub const ACCESS_KEY: &str = "6f1c0d3e9a2b4c5d8e7f6a5b4c3d2e1f";
pub const ORDER_NUMBER: &str = "20240601120000123456";

// Test credentials. DO NOT re-use this secret anywhere.
pub fn secret() -> Secret<String> {
    Secret::new("Ys7u8oRkTQ1kPn3HgvVr0ZxLmBcW2eJ5aFdXiNq9tKjS4hUyE6pGzO8lCwDbMrIv".to_string())
}

pub fn merchant(id: i64) -> ApiKey {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
    ApiKey {
        id,
        name: format!("shop-{id}"),
        access_key: ACCESS_KEY.to_string(),
        secret_key: secret(),
        remark: String::default(),
        created_at: ts,
        updated_at: ts,
    }
}

pub fn pending_order(price: i64) -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Order {
        id: 7,
        order_number: OrderNumber(ORDER_NUMBER.into()),
        payment_method: PaymentMethod::WeChatPay,
        status: OrderStatusType::Pending,
        price: Cents::from(price),
        amount: None,
        notify_url: "https://shop.example/notify".into(),
        api_key_id: 1,
        create_time: ts,
        pay_time: None,
        update_time: ts,
    }
}

pub fn paid(order: &Order) -> Order {
    let mut order = order.clone();
    order.status = OrderStatusType::Paid;
    order.amount = Some(order.price);
    order.pay_time = Some(order.create_time);
    order
}

pub fn signed_create_request(price: f64) -> CreateOrderRequest {
    let mut req = CreateOrderRequest {
        ak: ACCESS_KEY.into(),
        sign: String::default(),
        price,
        payment_method: PaymentMethod::WeChatPay,
        notify_url: "https://shop.example/notify".into(),
    };
    req.sign = ApiSignature::sign_payload(&req, &secret()).unwrap();
    req
}

pub fn signed_check_request(order_number: &str) -> CheckOrderRequest {
    let mut req =
        CheckOrderRequest { ak: ACCESS_KEY.into(), sign: String::default(), order_number: order_number.into() };
    req.sign = ApiSignature::sign_payload(&req, &secret()).unwrap();
    req
}

pub fn signed_notification(msg: &str) -> NotifyRequest {
    let timestamp = "1717243200000".to_string();
    NotifyRequest {
        ak: ACCESS_KEY.into(),
        sign: CallbackSignature::sign(&timestamp, &secret()),
        msg: msg.into(),
        channel: None,
        timestamp,
    }
}

/// Registers the API objects the merchant routes need. The two mocks stand in for the same store.
pub fn add_apis(cfg: &mut ServiceConfig, orders: MockLedger, keys: MockLedger, options: RouteOptions) {
    let orders_api = OrderFlowApi::new(orders, OrderFlowConfig::default(), EventProducers::default());
    cfg.app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(ApiKeyApi::new(keys)))
        .app_data(web::Data::new(options));
}

/// A key store that knows the test merchant (id 1).
pub fn known_merchant() -> MockLedger {
    let mut keys = MockLedger::new();
    keys.expect_fetch_api_key_by_access_key().returning(|ak: &str| Ok((ak == ACCESS_KEY).then(|| merchant(1))));
    keys
}

pub async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().app_data(json_config()).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

pub async fn post_request<T: Serialize>(
    path: &str,
    body: &T,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    send(TestRequest::post().uri(path).set_json(body), configure).await
}

pub async fn get_request(path: &str, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    send(TestRequest::get().uri(path), configure).await
}
