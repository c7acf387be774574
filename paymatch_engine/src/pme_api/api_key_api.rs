//! Merchant credential lookups and request authentication.
use std::fmt::Debug;

use log::*;
use pmg_common::Secret;
use serde::Serialize;

use crate::{
    db_types::{ApiKey, NewApiKey},
    helpers::{generate_access_key, generate_secret_key, ApiSignature, CallbackSignature},
    traits::{ApiKeyError, ApiKeyManagement},
};

pub struct ApiKeyApi<B> {
    db: B,
}

impl<B: Debug> Debug for ApiKeyApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKeyApi ({:?})", self.db)
    }
}

impl<B> ApiKeyApi<B>
where B: ApiKeyManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the key for `access_key`, failing with [`ApiKeyError::ApiKeyNotFound`] if there is none.
    pub async fn lookup(&self, access_key: &str) -> Result<ApiKey, ApiKeyError> {
        self.db.fetch_api_key_by_access_key(access_key).await?.ok_or_else(|| {
            debug!("🔐️ No api key matches access key {access_key}");
            ApiKeyError::ApiKeyNotFound
        })
    }

    pub async fn fetch_api_key(&self, id: i64) -> Result<Option<ApiKey>, ApiKeyError> {
        self.db.fetch_api_key(id).await
    }

    /// Issues a new key pair for a merchant.
    pub async fn create_api_key(&self, name: &str, remark: &str) -> Result<ApiKey, ApiKeyError> {
        let key = NewApiKey {
            name: name.to_string(),
            access_key: generate_access_key(),
            secret_key: Secret::new(generate_secret_key()),
            remark: remark.to_string(),
        };
        let key = self.db.insert_api_key(key).await?;
        info!("🔐️ Issued api key #{} for {}", key.id, key.name);
        Ok(key)
    }

    /// Changes the name and/or remark of key `id`. Fields left as `None` keep their current value.
    pub async fn update_api_key(
        &self,
        id: i64,
        name: Option<&str>,
        remark: Option<&str>,
    ) -> Result<ApiKey, ApiKeyError> {
        let current = self.db.fetch_api_key(id).await?.ok_or(ApiKeyError::ApiKeyNotFound)?;
        let name = name.unwrap_or(current.name.as_str());
        let remark = remark.unwrap_or(current.remark.as_str());
        let key = self.db.update_api_key(id, name, remark).await?;
        info!("🔐️ Updated api key #{} ({})", key.id, key.name);
        Ok(key)
    }

    /// Authenticates a merchant API call: looks up `access_key` and checks the payload's `sign` field with the
    /// sorted key concatenation scheme.
    pub async fn authorize_api_call<T: Serialize>(&self, access_key: &str, payload: &T) -> Result<ApiKey, ApiKeyError> {
        let key = self.lookup(access_key).await?;
        ApiSignature::verify_payload(payload, &key.secret_key).map_err(|e| {
            debug!("🔐️ API call signature rejected for api key #{}. {e}", key.id);
            ApiKeyError::SignatureInvalid
        })?;
        Ok(key)
    }

    /// Authenticates a payment notification callback with the timestamp scheme.
    pub async fn authorize_callback(
        &self,
        access_key: &str,
        timestamp: &str,
        sign: &str,
    ) -> Result<ApiKey, ApiKeyError> {
        let key = self.lookup(access_key).await?;
        CallbackSignature::verify(timestamp, sign, &key.secret_key).map_err(|e| {
            debug!("🔐️ Callback signature rejected for api key #{}. {e}", key.id);
            ApiKeyError::SignatureInvalid
        })?;
        Ok(key)
    }
}
