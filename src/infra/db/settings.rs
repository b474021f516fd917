use async_trait::async_trait;

use crate::application::repos::{RepoError, StoreSettingsRepo};

use super::{PostgresRepositories, map_sqlx_error};

const STOCK_THRESHOLD_OPTION: &str = "notify_no_stock_amount";
const COMMERCE_EXTENSION: &str = "woocommerce";

#[async_trait]
impl StoreSettingsRepo for PostgresRepositories {
    /// A missing or non-numeric option reads as zero.
    async fn stock_threshold(&self) -> Result<i64, RepoError> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM store_options WHERE name = $1",
        )
        .bind(STOCK_THRESHOLD_OPTION)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(value
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0))
    }

    async fn is_commerce_active(&self) -> Result<bool, RepoError> {
        let active = sqlx::query_scalar::<_, bool>(
            "SELECT active FROM extensions WHERE name = $1",
        )
        .bind(COMMERCE_EXTENSION)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(active.unwrap_or(false))
    }
}
