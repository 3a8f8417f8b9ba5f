//! Redis usage ledger

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use crate::domain::quota::{Identity, Tier, UsageLedger, UsageRecord, WindowFrame};
use crate::domain::DomainError;

/// Keys outlive their window by a full day so that expired records are
/// still visible as stale rather than vanishing mid-rollover.
const KEY_TTL_SECS: i64 = 2 * 24 * 60 * 60;

/// Read-or-rollover-then-add, atomically on the Redis server.
///
/// KEYS[1] record hash; ARGV amount, fresh start ms, stale cutoff ms, tier, ttl
const INCREMENT_SCRIPT: &str = r#"
local start = redis.call('HGET', KEYS[1], 'window_start')
local count
if start and tonumber(start) > tonumber(ARGV[3]) then
  count = redis.call('HINCRBY', KEYS[1], 'count', ARGV[1])
else
  start = ARGV[2]
  redis.call('HSET', KEYS[1], 'window_start', start, 'count', ARGV[1])
  count = tonumber(ARGV[1])
end
redis.call('HSET', KEYS[1], 'tier', ARGV[4])
redis.call('EXPIRE', KEYS[1], ARGV[5])
return {count, start}
"#;

/// Configuration for the Redis ledger
#[derive(Debug, Clone)]
pub struct RedisLedgerConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: String,
}

impl Default for RedisLedgerConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "guidance:ledger".to_string(),
        }
    }
}

impl RedisLedgerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

/// Ledger stored as one hash per identity (`count`, `window_start`, `tier`)
#[derive(Clone)]
pub struct RedisUsageLedger {
    connection: ConnectionManager,
    config: RedisLedgerConfig,
    script: Script,
}

impl fmt::Debug for RedisUsageLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisUsageLedger")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisUsageLedger {
    pub async fn new(config: RedisLedgerConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::storage(format!("Failed to create Redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self {
            connection,
            config,
            script: Script::new(INCREMENT_SCRIPT),
        })
    }

    fn record_key(&self, identity: &Identity) -> String {
        prefixed(&self.config.key_prefix, &identity.ledger_key())
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}:{}", prefix, key)
    }
}

fn instant_from_millis(ms: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DomainError::storage(format!("Invalid window start '{}'", ms)))
}

fn count_from_reply(count: i64) -> Result<u32, DomainError> {
    u32::try_from(count).map_err(|_| DomainError::storage(format!("Invalid count '{}'", count)))
}

#[async_trait]
impl UsageLedger for RedisUsageLedger {
    async fn get_record(
        &self,
        identity: &Identity,
        frame: &WindowFrame,
    ) -> Result<Option<UsageRecord>, DomainError> {
        let key = self.record_key(identity);
        let mut conn = self.connection.clone();

        let (count, start, tier): (Option<i64>, Option<i64>, Option<String>) = conn
            .hget(&key, &["count", "window_start", "tier"])
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read ledger: {}", e)))?;

        let (Some(count), Some(start), Some(tier)) = (count, start, tier) else {
            return Ok(None);
        };

        let window_start = instant_from_millis(start)?;
        if !frame.is_current(window_start) {
            return Ok(None);
        }

        Ok(Some(UsageRecord {
            identity_key: identity.ledger_key(),
            count: count_from_reply(count)?,
            window_start,
            tier: tier.parse()?,
        }))
    }

    async fn increment(
        &self,
        identity: &Identity,
        tier: Tier,
        frame: &WindowFrame,
        amount: u32,
    ) -> Result<UsageRecord, DomainError> {
        let key = self.record_key(identity);
        let mut conn = self.connection.clone();

        let (count, start): (i64, String) = self
            .script
            .key(&key)
            .arg(amount)
            .arg(frame.fresh_start.timestamp_millis())
            .arg(frame.stale_cutoff.timestamp_millis())
            .arg(tier.as_str())
            .arg(KEY_TTL_SECS)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to increment ledger: {}", e)))?;

        let start: i64 = start
            .parse()
            .map_err(|_| DomainError::storage(format!("Invalid window start '{}'", start)))?;

        Ok(UsageRecord {
            identity_key: identity.ledger_key(),
            count: count_from_reply(count)?,
            window_start: instant_from_millis(start)?,
            tier,
        })
    }

    async fn reset(&self, identity: &Identity) -> Result<bool, DomainError> {
        let key = self.record_key(identity);
        let mut conn = self.connection.clone();

        let deleted: i64 = conn
            .del(&key)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to reset ledger: {}", e)))?;

        Ok(deleted > 0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
