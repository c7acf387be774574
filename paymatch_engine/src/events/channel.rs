//! Simple stateless pub-sub event handler
//!
//! Components subscribe to engine events through [`EventProducer`]s handed out by an [`EventHandler`]. The handler
//! is stateless: it only ever sees the event itself. Handlers are async, and each event is handled on its own task.
//!
//! The number of events being handled at once is bounded by a semaphore, so a burst of events queues up instead of
//! spawning an unbounded number of tasks. Publishing never waits: when the queue is full the event is rejected with
//! [`PublishError::QueueFull`] and the publisher carries on.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::*;
use thiserror::Error;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Semaphore,
};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub const DEFAULT_CONCURRENCY: usize = 16;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
    permits: Arc<Semaphore>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        Self::with_concurrency(buffer_size, DEFAULT_CONCURRENCY, handler)
    }

    /// At most `concurrency` events are handled at the same time. A value of zero is treated as one.
    pub fn with_concurrency(buffer_size: usize, concurrency: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        Self { listener: receiver, sender, handler, permits }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // drop the internal sender so that when the last subscriber is dropped, we can automatically shut down the
        // handler
        drop(self.sender);
        let jobs = Arc::new(AtomicI64::new(0));
        while let Some(ev) = self.listener.recv().await {
            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(p) => p,
                Err(e) => {
                    error!("📬️ Event handler semaphore closed: {e}. Dropping event.");
                    continue;
                },
            };
            trace!("📬️ Handling event");
            let handler = Arc::clone(&self.handler);
            jobs.fetch_add(1, Ordering::SeqCst);
            let job = jobs.clone();
            tokio::spawn(async move {
                (handler)(ev).await;
                drop(permit);
                job.fetch_sub(1, Ordering::SeqCst);
                trace!("📬️ Event handled");
            });
        }
        while jobs.load(Ordering::SeqCst) > 0 {
            debug!("📬️ Waiting for {} jobs to complete", jobs.load(Ordering::SeqCst));
            tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("The event queue is full")]
    QueueFull,
    #[error("The event handler has shut down")]
    Closed,
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event without waiting. The event is dropped if the queue is full or the handler has stopped.
    pub fn publish_event(&self, event: E) -> Result<(), PublishError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => PublishError::QueueFull,
            TrySendError::Closed(_) => PublishError::Closed,
        })
    }
}
