//! # PayMatch server
//! This crate hosts the HTTP surface of the PayMatch gateway. It is responsible for:
//! * Accepting signed order requests from merchants and reporting order status back to them.
//! * Receiving forwarded payment notifications and settling the matching order.
//! * Delivering signed webhooks to merchants when their orders are paid.
//! * Sweeping stale pending orders to `Expired` in the background.
//! * Issuing and editing merchant api keys from the command line (`paymatch_server keys --help`).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/order/create`: Creates a pending order at the first free amount at or above the requested price.
//! * `/order/check`: Returns one of the merchant's orders.
//! * `/order/notify`: Receives payment notifications.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
