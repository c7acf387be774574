//! Create, pay and check an order through the HTTP routes against a real SQLite database.
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use paymatch_engine::{
    db_types::{ApiKey, OrderNumber, OrderStatusType},
    events::{EventHandlers, EventHooks, HandlerOptions, OrderPaidEvent},
    helpers::{ApiSignature, CallbackSignature},
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    ApiKeyApi,
    OrderFlowApi,
    OrderFlowConfig,
    SqliteDatabase,
};
use serde_json::Value;

use super::helpers::send;
use crate::{
    config::RouteOptions,
    data_objects::{CheckOrderRequest, CreateOrderRequest, NotifyRequest},
    routes::{json_config, CheckOrderRoute, CreateOrderRoute, NotifyRoute},
};

type PaidEvents = Arc<Mutex<Vec<OrderPaidEvent>>>;

async fn setup(url: &str) -> (SqliteDatabase, ApiKey, EventHandlers, PaidEvents) {
    prepare_test_env(url).await;
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating database");
    let merchant = ApiKeyApi::new(db.clone()).create_api_key("shop", "full flow").await.expect("Error creating key");
    let events = PaidEvents::default();
    let sink = events.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let sink = sink.clone();
        Box::pin(async move {
            sink.lock().unwrap().push(ev);
        })
    });
    (db, merchant, EventHandlers::new(HandlerOptions::new(8, 1), hooks), events)
}

fn configure(db: SqliteDatabase, handlers: &EventHandlers) -> impl FnOnce(&mut ServiceConfig) {
    let producers = handlers.producers();
    move |cfg| {
        cfg.app_data(web::Data::new(OrderFlowApi::new(db.clone(), OrderFlowConfig::default(), producers)))
            .app_data(web::Data::new(ApiKeyApi::new(db)))
            .app_data(web::Data::new(RouteOptions::default()))
            .app_data(json_config())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(CheckOrderRoute::<SqliteDatabase>::new())
            .service(NotifyRoute::<SqliteDatabase>::new());
    }
}

async fn call(req: TestRequest, db: &SqliteDatabase, handlers: &EventHandlers) -> (StatusCode, String) {
    send(req, configure(db.clone(), handlers)).await
}

#[actix_web::test]
async fn order_lifecycle() {
    let url = random_db_path();
    let (db, merchant, handlers, events) = setup(&url).await;

    // Two orders for 10.00 are told to pay different amounts
    let mut prices = vec![];
    let mut order_numbers = vec![];
    for _ in 0..2 {
        let mut req = CreateOrderRequest {
            ak: merchant.access_key.clone(),
            sign: String::default(),
            price: 10.0,
            payment_method: Default::default(),
            notify_url: "https://shop.example/notify".into(),
        };
        req.sign = ApiSignature::sign_payload(&req, &merchant.secret_key).unwrap();
        let (status, body) = call(TestRequest::post().uri("/order/create").set_json(&req), &db, &handlers).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["code"], "SUCCESS", "{body}");
        prices.push(body["data"]["price"].as_str().unwrap().to_string());
        order_numbers.push(body["data"]["order_number"].as_str().unwrap().to_string());
    }
    assert_eq!(prices, ["10.00", "10.01"]);

    // The payer of the second order remits 10.01
    let timestamp = "1717243200000".to_string();
    let notification = NotifyRequest {
        ak: merchant.access_key.clone(),
        sign: CallbackSignature::sign(&timestamp, &merchant.secret_key),
        msg: "微信支付收款10.01元到账".into(),
        channel: None,
        timestamp,
    };
    let req = TestRequest::post().uri("/order/notify").set_json(&notification);
    let (status, body) = call(req, &db, &handlers).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#""success""#);

    // A repeated notification finds nothing left to pay
    let req = TestRequest::post().uri("/order/notify").set_json(&notification);
    let (_, body) = call(req, &db, &handlers).await;
    assert_eq!(body, r#""未找到对应订单""#);

    let mut req = CheckOrderRequest {
        ak: merchant.access_key.clone(),
        sign: String::default(),
        order_number: order_numbers[1].clone(),
    };
    req.sign = ApiSignature::sign_payload(&req, &merchant.secret_key).unwrap();
    let (status, body) = call(TestRequest::get().uri("/order/check").set_json(&req), &db, &handlers).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["data"]["status"], 1);
    assert_eq!(body["data"]["amount"], "10.01");

    // The first order is untouched
    assert_eq!(db_order_status(&db, &order_numbers[0]).await, OrderStatusType::Pending);

    let _ = handlers.start_handlers();
    let mut delivered = 0;
    for _ in 0..50 {
        delivered = events.lock().unwrap().len();
        if delivered > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(delivered, 1);
    let event = events.lock().unwrap().remove(0);
    assert_eq!(event.order.order_number.as_str(), order_numbers[1]);
    assert_eq!(event.api_key.id, merchant.id);

    db.close().await;
    drop_database(&url).await;
}

async fn db_order_status(db: &SqliteDatabase, order_number: &str) -> OrderStatusType {
    let api = OrderFlowApi::new(db.clone(), OrderFlowConfig::default(), Default::default());
    api.order_status(&OrderNumber(order_number.to_string())).await.expect("order exists").status
}
