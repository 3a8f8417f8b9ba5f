//! PostgreSQL usage ledger

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::domain::quota::{Identity, Tier, UsageLedger, UsageRecord, WindowFrame};
use crate::domain::DomainError;

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/guidance".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Open a pool with these settings
    pub async fn connect(&self) -> Result<PgPool, DomainError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.connect_timeout_secs))
            .connect(&self.url)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to PostgreSQL: {}", e)))
    }
}

const DEFAULT_TABLE: &str = "usage_ledger";

/// Ledger stored in one row per identity.
///
/// Increments are a single `INSERT .. ON CONFLICT DO UPDATE` statement, so
/// the row lock makes concurrent increments for one identity serialize and
/// the window rollover happens inside the same statement.
pub struct PostgresUsageLedger {
    pool: PgPool,
    table_name: String,
}

impl Debug for PostgresUsageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresUsageLedger")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl PostgresUsageLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ensures the ledger table exists
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                identity_key VARCHAR(160) PRIMARY KEY,
                count INTEGER NOT NULL,
                window_start TIMESTAMPTZ NOT NULL,
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

    fn increment_sql(&self) -> String {
        format!(
            r#"
            INSERT INTO {t} (identity_key, count, window_start, tier, updated_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (identity_key) DO UPDATE SET
                count = CASE WHEN {t}.window_start > $5
                    THEN {t}.count + EXCLUDED.count
                    ELSE EXCLUDED.count END,
                window_start = CASE WHEN {t}.window_start > $5
                    THEN {t}.window_start
                    ELSE EXCLUDED.window_start END,
                tier = EXCLUDED.tier,
                updated_at = NOW()
            RETURNING identity_key, count, window_start, tier
            "#,
            t = self.table_name
        )
    }
}

fn record_from_row(row: &PgRow) -> Result<UsageRecord, DomainError> {
    let decode = |e: sqlx::Error| DomainError::storage(format!("Failed to decode ledger row: {}", e));

    let identity_key: String = row.try_get("identity_key").map_err(decode)?;
    let count: i32 = row.try_get("count").map_err(decode)?;
    let window_start: DateTime<Utc> = row.try_get("window_start").map_err(decode)?;
    let tier: String = row.try_get("tier").map_err(decode)?;

    let count = u32::try_from(count).map_err(|_| {
        DomainError::storage(format!("Negative count stored for '{}'", identity_key))
    })?;

    Ok(UsageRecord {
        identity_key,
        count,
        window_start,
        tier: tier.parse()?,
    })
}

#[async_trait]
impl UsageLedger for PostgresUsageLedger {
    async fn get_record(
        &self,
        identity: &Identity,
        frame: &WindowFrame,
    ) -> Result<Option<UsageRecord>, DomainError> {
        let query = format!(
            "SELECT identity_key, count, window_start, tier FROM {} \
             WHERE identity_key = $1 AND window_start > $2",
            self.table_name
        );

        let row = sqlx::query(&query)
            .bind(identity.ledger_key())
            .bind(frame.stale_cutoff)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read ledger: {}", e)))?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn increment(
        &self,
        identity: &Identity,
        tier: Tier,
        frame: &WindowFrame,
        amount: u32,
    ) -> Result<UsageRecord, DomainError> {
        let amount = i32::try_from(amount)
            .map_err(|_| DomainError::validation(format!("Increment of {} is too large", amount)))?;

        let row = sqlx::query(&self.increment_sql())
            .bind(identity.ledger_key())
            .bind(amount)
            .bind(frame.fresh_start)
            .bind(tier.as_str())
            .bind(frame.stale_cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to increment ledger: {}", e)))?;

        record_from_row(&row)
    }

    async fn reset(&self, identity: &Identity) -> Result<bool, DomainError> {
        let query = format!("DELETE FROM {} WHERE identity_key = $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(identity.ledger_key())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to reset ledger: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
