use std::fmt::Debug;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::quota::{Tier, TierDirectory, UserId};
use crate::domain::DomainError;

const DEFAULT_TABLE: &str = "user_tiers";

/// Tier assignments in a `user_id -> tier` table
pub struct PostgresTierDirectory {
    pool: PgPool,
    table_name: String,
}

impl Debug for PostgresTierDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresTierDirectory")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl PostgresTierDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: DEFAULT_TABLE.to_string(),
        }
    }

    /// Ensures the tier table exists
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                user_id VARCHAR(128) PRIMARY KEY,
                tier VARCHAR(32) NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table_name
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to create table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl TierDirectory for PostgresTierDirectory {
    async fn tier_for(&self, user_id: &UserId) -> Result<Option<Tier>, DomainError> {
        let query = format!("SELECT tier FROM {} WHERE user_id = $1", self.table_name);

        let row = sqlx::query(&query)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read tier: {}", e)))?;

        match row {
            Some(row) => {
                let tier: String = row.try_get("tier").map_err(|e| {
                    DomainError::storage(format!("Failed to decode tier row: {}", e))
                })?;
                Ok(Some(tier.parse()?))
            }
            None => Ok(None),
        }
    }

    async fn set_tier(&self, user_id: &UserId, tier: Tier) -> Result<(), DomainError> {
        let query = format!(
            "INSERT INTO {} (user_id, tier, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (user_id) DO UPDATE SET tier = EXCLUDED.tier, updated_at = NOW()",
            self.table_name
        );

        sqlx::query(&query)
            .bind(user_id.as_str())
            .bind(tier.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to write tier: {}", e)))?;

        Ok(())
    }
}
