//! Per-identity turn serialization inside one process

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::Identity;

/// Hands out one async mutex per identity so that two turns of the same
/// identity evaluate, generate and commit one after the other.
#[derive(Clone)]
pub struct TurnLocks {
    locks: Option<Cache<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for TurnLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnLocks")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Slack on top of generation for history trimming, the ledger commit and
/// side-effect dispatch
const TURN_OVERHEAD: Duration = Duration::from_secs(60);

impl TurnLocks {
    pub const DEFAULT_CAPACITY: u64 = 100_000;

    /// Locks idle for `idle` are dropped.
    ///
    /// A lock evicted while held stops serializing its identity, so `idle`
    /// must exceed the longest turn and `capacity` the number of identities
    /// with a turn in flight. Prefer [`TurnLocks::for_turns`].
    pub fn new(capacity: u64, idle: Duration) -> Self {
        Self {
            locks: Some(
                Cache::builder()
                    .max_capacity(capacity)
                    .time_to_idle(idle)
                    .build(),
            ),
        }
    }

    /// Locks sized for turns bounded by `generation_timeout`
    pub fn for_turns(capacity: u64, generation_timeout: Duration) -> Self {
        Self::new(capacity, Self::idle_for(generation_timeout))
    }

    fn idle_for(generation_timeout: Duration) -> Duration {
        generation_timeout
            .saturating_mul(2)
            .saturating_add(TURN_OVERHEAD)
    }

    pub fn disabled() -> Self {
        Self { locks: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.locks.is_some()
    }

    /// Wait for the identity's lock; `None` when serialization is disabled
    pub async fn acquire(&self, identity: &Identity) -> Option<OwnedMutexGuard<()>> {
        let locks = self.locks.as_ref()?;
        let lock = locks
            .get_with(identity.ledger_key(), async { Arc::new(Mutex::new(())) })
            .await;

        Some(lock.lock_owned().await)
    }
}

impl Default for TurnLocks {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Duration::from_secs(600))
    }
}
