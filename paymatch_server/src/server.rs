use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use paymatch_engine::{events::EventProducers, helpers::CreditedFundsParser, ApiKeyApi, OrderFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::merchant_webhook::create_webhook_event_handlers,
    routes::{health, json_config, CheckOrderRoute, CreateOrderRoute, NotifyRoute},
};

/// The SQLite pool size. Writes are serialised by SQLite anyway, so this mostly bounds concurrent readers.
const DB_MAX_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_MAX_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    info!("🚀️ Connected to {}", db.url());
    let handlers = create_webhook_event_handlers(config.webhook.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let producers = handlers.producers();
    let _ = handlers.start_handlers();
    let _expiry = start_expiry_worker(db.clone(), config.order_flow_config(), config.expiry_sweep_interval);
    info!("🚀️ Listening on {}:{}", config.host, config.port);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let address = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let parser = CreditedFundsParser::new(&config.credit_marker).into_shared();
        let orders_api =
            OrderFlowApi::new(db.clone(), config.order_flow_config(), producers.clone()).with_parser(parser);
        let keys_api = ApiKeyApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pmg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(keys_api))
            .app_data(web::Data::new(config.routes.clone()))
            .app_data(json_config())
            .service(health)
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(CheckOrderRoute::<SqliteDatabase>::new())
            .service(NotifyRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(address)?
    .run();
    Ok(srv)
}
