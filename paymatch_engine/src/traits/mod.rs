//! # Storage contracts
//!
//! This module defines the behaviour that a database backend needs to expose in order to serve the PayMatch engine.
//!
//! * [`ApiKeyManagement`] looks up (and issues) merchant credentials.
//! * [`OrderManagement`] owns the order ledger: creation with collision-free pricing, matching lookups, the
//!   compare-and-set transition to `Paid`, and expiry.
//!
//! The public API structs ([`crate::ApiKeyApi`], [`crate::OrderFlowApi`]) are generic over these traits, so the HTTP
//! layer can be tested against mocks and the SQLite backend can be swapped out without touching any flow logic.
mod api_key_management;
mod order_management;

pub use api_key_management::{ApiKeyError, ApiKeyManagement};
pub use order_management::{OrderFlowError, OrderManagement};

/// Everything a backend must provide to run the whole gateway. Implemented automatically.
pub trait PaymatchDatabase: OrderManagement + ApiKeyManagement {}

impl<T: OrderManagement + ApiKeyManagement> PaymatchDatabase for T {}
