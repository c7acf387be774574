//! # PayMatch engine public API
//!
//! * [`api_key_api`] looks up merchant credentials and verifies both signature schemes against them.
//! * [`order_flow_api`] is the order ledger: creation with collision-free pricing, status lookups, notification
//!   matching, the transition to `Paid` and expiry.
//!
//! Both APIs are created by supplying a backend that implements the traits in [`crate::traits`]:
//!
//! ```rust,ignore
//! use paymatch_engine::{events::EventProducers, OrderFlowApi, OrderFlowConfig, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/paymatch.db", 25).await?;
//! let api = OrderFlowApi::new(db, OrderFlowConfig::default(), EventProducers::default());
//! let order = api.order_status(&order_number).await?;
//! ```
pub mod api_key_api;
pub mod order_flow_api;
