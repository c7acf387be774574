use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ApiKey, NewApiKey},
    sqlite::db::is_unique_violation,
    traits::ApiKeyError,
};

pub async fn fetch_api_key_by_access_key(
    access_key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ApiKey>, sqlx::Error> {
    let key =
        sqlx::query_as("SELECT * FROM api_keys WHERE access_key = $1").bind(access_key).fetch_optional(conn).await?;
    Ok(key)
}

pub async fn fetch_api_key(id: i64, conn: &mut SqliteConnection) -> Result<Option<ApiKey>, sqlx::Error> {
    let key = sqlx::query_as("SELECT * FROM api_keys WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(key)
}

/// Inserts a new API key. The name and access key must both be unused.
pub async fn insert_api_key(key: NewApiKey, conn: &mut SqliteConnection) -> Result<ApiKey, ApiKeyError> {
    let now = Utc::now();
    let name = key.name.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO api_keys (name, access_key, secret_key, remark, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(key.name)
    .bind(key.access_key)
    .bind(key.secret_key)
    .bind(key.remark)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(key) => {
            let key: ApiKey = key;
            debug!("🗃️ API key #{} ({}) created", key.id, key.name);
            Ok(key)
        },
        Err(e) if is_unique_violation(&e) => Err(ApiKeyError::ApiKeyNameExists(name)),
        Err(e) => Err(e.into()),
    }
}

/// Sets the name and remark of key `id`. Fails with [`ApiKeyError::ApiKeyNotFound`] if there is no such key.
pub async fn update_api_key(
    id: i64,
    name: &str,
    remark: &str,
    conn: &mut SqliteConnection,
) -> Result<ApiKey, ApiKeyError> {
    let result = sqlx::query_as(
        r#"
            UPDATE api_keys SET name = $1, remark = $2, updated_at = $3
            WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(name)
    .bind(remark)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(Some(key)) => {
            let key: ApiKey = key;
            debug!("🗃️ API key #{} is now named {}", key.id, key.name);
            Ok(key)
        },
        Ok(None) => Err(ApiKeyError::ApiKeyNotFound),
        Err(e) if is_unique_violation(&e) => Err(ApiKeyError::ApiKeyNameExists(name.to_string())),
        Err(e) => Err(e.into()),
    }
}
