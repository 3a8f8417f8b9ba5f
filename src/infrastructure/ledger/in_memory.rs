//! In-memory usage ledger

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::quota::{Identity, Tier, UsageLedger, UsageRecord, WindowFrame};
use crate::domain::DomainError;

/// Process-local ledger; increments are serialized by the write lock
#[derive(Debug)]
pub struct InMemoryUsageLedger {
    records: RwLock<HashMap<String, UsageRecord>>,
    max_records: usize,
}

impl InMemoryUsageLedger {
    /// Create a ledger holding at most `max_records` identities
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            max_records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict the records with the oldest windows if over capacity
    fn evict_if_needed(&self, records: &mut HashMap<String, UsageRecord>) {
        if records.len() <= self.max_records {
            return;
        }

        let mut entries: Vec<_> = records
            .iter()
            .map(|(k, v)| (k.clone(), v.window_start))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1));

        let to_remove = records.len() - self.max_records;
        for (key, _) in entries.into_iter().take(to_remove) {
            records.remove(&key);
        }
    }
}

impl Default for InMemoryUsageLedger {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn get_record(
        &self,
        identity: &Identity,
        frame: &WindowFrame,
    ) -> Result<Option<UsageRecord>, DomainError> {
        let records = self.records.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(records
            .get(&identity.ledger_key())
            .filter(|r| frame.is_current(r.window_start))
            .cloned())
    }

    async fn increment(
        &self,
        identity: &Identity,
        tier: Tier,
        frame: &WindowFrame,
        amount: u32,
    ) -> Result<UsageRecord, DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let key = identity.ledger_key();
        let next = match records.get(&key) {
            Some(existing) => existing.advanced(tier, frame, amount),
            None => UsageRecord::opened(key.clone(), tier, frame.fresh_start).with_count(amount),
        };

        records.insert(key, next.clone());
        self.evict_if_needed(&mut records);

        Ok(next)
    }

    async fn reset(&self, identity: &Identity) -> Result<bool, DomainError> {
        let mut records = self.records.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(records.remove(&identity.ledger_key()).is_some())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
