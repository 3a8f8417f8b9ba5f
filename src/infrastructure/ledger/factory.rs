//! Ledger backend selection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use super::{
    InMemoryUsageLedger, PostgresUsageLedger, RedisLedgerConfig, RedisUsageLedger,
};
use crate::config::{LedgerBackend, StorageConfig};
use crate::domain::{DomainError, UsageLedger};

/// Build the configured ledger. `pool` must be present for the Postgres backend.
pub async fn create_usage_ledger(
    config: &StorageConfig,
    pool: Option<&PgPool>,
) -> Result<Arc<dyn UsageLedger>, DomainError> {
    let ledger: Arc<dyn UsageLedger> = match config.ledger {
        LedgerBackend::Memory => Arc::new(InMemoryUsageLedger::new(config.memory_max_records)),
        LedgerBackend::Postgres => {
            let pool = pool.ok_or_else(|| {
                DomainError::configuration("storage.postgres_url is required for the postgres ledger")
            })?;
            let ledger = PostgresUsageLedger::new(pool.clone());
            if config.auto_migrate {
                ledger.ensure_table().await?;
            }
            Arc::new(ledger)
        }
        LedgerBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                DomainError::configuration("storage.redis_url is required for the redis ledger")
            })?;
            let redis_config =
                RedisLedgerConfig::new(url).with_key_prefix(config.redis_key_prefix.clone());
            Arc::new(RedisUsageLedger::new(redis_config).await?)
        }
    };

    info!(backend = ledger.backend_name(), "Usage ledger ready");

    Ok(ledger)
}
