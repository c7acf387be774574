//! Wiring between hook closures and the handlers that run them.
//!
//! Register closures on [`EventHooks`], turn them into [`EventHandlers`], hand the [`EventProducers`] to every
//! [`crate::OrderFlowApi`] instance and finally start the handlers.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::task::JoinHandle;

use crate::events::{EventHandler, EventProducer, Handler, OrderPaidEvent, DEFAULT_CONCURRENCY};

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Sizing of each event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Events queued before new events are dropped.
    pub buffer_size: usize,
    /// Events of one kind handled at the same time.
    pub concurrency: usize,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self { buffer_size: DEFAULT_EVENT_BUFFER_SIZE, concurrency: DEFAULT_CONCURRENCY }
    }
}

impl HandlerOptions {
    pub fn new(buffer_size: usize, concurrency: usize) -> Self {
        Self { buffer_size, concurrency }
    }
}

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
}

impl EventProducers {
    /// True if nobody is listening, in which case publishing is a no-op.
    pub fn is_empty(&self) -> bool {
        self.order_paid_producer.is_empty()
    }
}

pub struct EventHandlers {
    on_order_paid: Option<EventHandler<OrderPaidEvent>>,
}

impl EventHandlers {
    pub fn new(options: HandlerOptions, hooks: EventHooks) -> Self {
        let on_order_paid =
            hooks.on_order_paid.map(|f| EventHandler::with_concurrency(options.buffer_size, options.concurrency, f));
        Self { on_order_paid }
    }

    /// Hands out a fresh set of producers. Call this before [`Self::start_handlers`], which consumes the handlers.
    pub fn producers(&self) -> EventProducers {
        EventProducers { order_paid_producer: self.on_order_paid.iter().map(EventHandler::subscribe).collect() }
    }

    /// Spawns a task for every registered hook. A task finishes once all of its producers are dropped and the queued
    /// events have been handled.
    pub fn start_handlers(self) -> Vec<JoinHandle<()>> {
        self.on_order_paid
            .into_iter()
            .map(|handler| {
                debug!("📬️ Starting the order paid event handler");
                tokio::spawn(handler.start_handler())
            })
            .collect()
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }
}
