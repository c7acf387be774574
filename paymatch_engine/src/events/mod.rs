mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler, PublishError, DEFAULT_CONCURRENCY};
pub use event_types::OrderPaidEvent;
pub use hooks::{EventHandlers, EventHooks, EventProducers, HandlerOptions, DEFAULT_EVENT_BUFFER_SIZE};

/// Log target for paid-order notifications that never reach the merchant.
pub const WEBHOOK_LOG_TARGET: &str = "pmg::webhook";
