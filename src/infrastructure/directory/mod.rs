//! Tier directory implementations

mod in_memory;
mod postgres;

use std::sync::Arc;

use sqlx::PgPool;

pub use in_memory::InMemoryTierDirectory;
pub use postgres::PostgresTierDirectory;

use crate::config::{DirectoryBackend, StorageConfig};
use crate::domain::{DomainError, TierDirectory};

/// Build the configured directory. `pool` must be present for the Postgres backend.
pub async fn create_tier_directory(
    config: &StorageConfig,
    pool: Option<&PgPool>,
) -> Result<Arc<dyn TierDirectory>, DomainError> {
    match config.directory {
        DirectoryBackend::Memory => Ok(Arc::new(InMemoryTierDirectory::with_seed(
            &config.seed_tiers,
        )?)),
        DirectoryBackend::Postgres => {
            let pool = pool.ok_or_else(|| {
                DomainError::configuration(
                    "storage.postgres_url is required for the postgres tier directory",
                )
            })?;
            let directory = PostgresTierDirectory::new(pool.clone());
            if config.auto_migrate {
                directory.ensure_table().await?;
            }
            Ok(Arc::new(directory))
        }
    }
}
