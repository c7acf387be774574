//! PayMatch engine
//!
//! The PayMatch engine reconciles free-text payment notifications against pending merchant orders. Merchants create
//! orders through a signed API call; when the payer's funds arrive, a notification such as "微信支付收款10.01元到账"
//! is matched to the one pending order with that exact amount, the order is marked paid and the merchant is told.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`traits`]) and the SQLite backend ([`SqliteDatabase`]). You should never need to access the
//!    database directly; use the public API instead. The data types used in the database are defined in [`db_types`].
//! 2. The public API ([`ApiKeyApi`], [`OrderFlowApi`]), generic over the storage traits.
//! 3. Signing, parsing and payload helpers in [`helpers`].
//!
//! The engine emits an [`events::OrderPaidEvent`] whenever an order is paid. Subscribe to it through
//! [`events::EventHooks`] to deliver merchant webhooks or perform other custom actions.
pub mod db_types;
pub mod events;
pub mod helpers;
mod pme_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use pme_api::{
    api_key_api::ApiKeyApi,
    order_flow_api::{OrderFlowApi, OrderFlowConfig, DEFAULT_ORDER_EXPIRY_SECONDS},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{ApiKeyError, ApiKeyManagement, OrderFlowError, OrderManagement, PaymatchDatabase};
