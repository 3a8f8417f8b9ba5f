//! Usage ledger implementations

mod factory;
mod in_memory;
mod postgres;
mod redis;

pub use factory::create_usage_ledger;
pub use in_memory::InMemoryUsageLedger;
pub use postgres::{PostgresConfig, PostgresUsageLedger};
pub use redis::{RedisLedgerConfig, RedisUsageLedger};
