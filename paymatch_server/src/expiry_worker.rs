use std::time::Duration;

use log::*;
use paymatch_engine::{db_types::Order, events::EventProducers, OrderFlowApi, OrderFlowConfig, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Order creation also expires stale orders lazily, so the sweep only keeps the `Expired` status timely for status
/// checks.
pub fn start_expiry_worker(db: SqliteDatabase, config: OrderFlowConfig, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        let api = OrderFlowApi::new(db, config, EventProducers::default());
        info!("🕰️ Order expiry worker started. Sweeping every {}s", period.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running order expiry job");
            match api.expire_stale_orders().await {
                Ok(expired) if expired.is_empty() => trace!("🕰️ No orders expired"),
                Ok(expired) => {
                    info!("🕰️ {} orders expired", expired.len());
                    debug!("🕰️ Expired orders: {}", order_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] {} ({})", o.id, o.order_number, o.price))
        .collect::<Vec<String>>()
        .join(", ")
}
