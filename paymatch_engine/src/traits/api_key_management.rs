use thiserror::Error;

use crate::db_types::{ApiKey, NewApiKey};

#[derive(Debug, Clone, Error)]
pub enum ApiKeyError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("api key not found")]
    ApiKeyNotFound,
    #[error("An API key with the name {0} already exists")]
    ApiKeyNameExists(String),
    #[error("sign error")]
    SignatureInvalid,
}

impl From<sqlx::Error> for ApiKeyError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Merchant credential storage.
///
/// Lookups are never cached: a key may be renamed or removed between two requests from the same merchant.
#[allow(async_fn_in_trait)]
pub trait ApiKeyManagement {
    /// Fetches the key whose public access key is `access_key`.
    async fn fetch_api_key_by_access_key(&self, access_key: &str) -> Result<Option<ApiKey>, ApiKeyError>;

    /// Fetches a key by its internal id. Orders reference their owner this way.
    async fn fetch_api_key(&self, id: i64) -> Result<Option<ApiKey>, ApiKeyError>;

    /// Stores a freshly generated key. Fails with [`ApiKeyError::ApiKeyNameExists`] if the name is taken.
    async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, ApiKeyError>;

    /// Renames a key and replaces its remark. The key pair itself never changes.
    async fn update_api_key(&self, id: i64, name: &str, remark: &str) -> Result<ApiKey, ApiKeyError>;
}
