use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;

use crate::cache::metric_names::{
    METRIC_TRANSIENT_DELETE, METRIC_TRANSIENT_HIT, METRIC_TRANSIENT_MISS,
};
use crate::cache::{
    CacheError, TransientKey, TransientStore, decode_ids, encode_ids, expires_after,
};
use crate::domain::types::ProductId;

use super::PostgresRepositories;

/// Transient store over the `transients` table. Expired rows read as absent.
#[derive(Clone)]
pub struct PostgresTransientStore {
    repositories: PostgresRepositories,
}

impl PostgresTransientStore {
    pub fn new(repositories: PostgresRepositories) -> Self {
        Self { repositories }
    }

    /// Remove expired rows, returning how many were deleted.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM transients WHERE expires_at <= now()")
            .execute(self.repositories.pool())
            .await
            .map_err(CacheError::backend)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TransientStore for PostgresTransientStore {
    async fn get(&self, key: &TransientKey) -> Result<Option<Vec<ProductId>>, CacheError> {
        let value = sqlx::query_scalar::<_, Value>(
            "SELECT value FROM transients WHERE key = $1 AND expires_at > now()",
        )
        .bind(key.as_str())
        .fetch_optional(self.repositories.pool())
        .await
        .map_err(CacheError::backend)?;

        match value {
            Some(value) => {
                counter!(METRIC_TRANSIENT_HIT, "backend" => "postgres").increment(1);
                decode_ids(key, &value).map(Some)
            }
            None => {
                counter!(METRIC_TRANSIENT_MISS, "backend" => "postgres").increment(1);
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &TransientKey,
        ids: &[ProductId],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let expires_at = expires_after(ttl)?;
        sqlx::query(
            r#"
            INSERT INTO transients (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key.as_str())
        .bind(encode_ids(ids))
        .bind(expires_at)
        .execute(self.repositories.pool())
        .await
        .map_err(CacheError::backend)?;
        Ok(())
    }

    async fn delete(&self, key: &TransientKey) -> Result<bool, CacheError> {
        let result = sqlx::query("DELETE FROM transients WHERE key = $1")
            .bind(key.as_str())
            .execute(self.repositories.pool())
            .await
            .map_err(CacheError::backend)?;
        counter!(METRIC_TRANSIENT_DELETE, "backend" => "postgres").increment(1);
        Ok(result.rows_affected() > 0)
    }
}
