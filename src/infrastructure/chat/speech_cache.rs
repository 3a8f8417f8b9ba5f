//! Short-lived store for synthesized turn audio

use std::time::Duration;

use moka::future::Cache;
use uuid::Uuid;

use crate::domain::SpeechAudio;

/// Synthesis state of one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEntry {
    Pending,
    Ready(SpeechAudio),
    Failed,
}

#[derive(Clone)]
pub struct SpeechCache {
    entries: Cache<Uuid, SpeechEntry>,
}

impl std::fmt::Debug for SpeechCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl SpeechCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn mark_pending(&self, turn_id: Uuid) {
        self.entries.insert(turn_id, SpeechEntry::Pending).await;
    }

    pub async fn complete(&self, turn_id: Uuid, audio: SpeechAudio) {
        self.entries.insert(turn_id, SpeechEntry::Ready(audio)).await;
    }

    pub async fn fail(&self, turn_id: Uuid) {
        self.entries.insert(turn_id, SpeechEntry::Failed).await;
    }

    pub async fn get(&self, turn_id: &Uuid) -> Option<SpeechEntry> {
        self.entries.get(turn_id).await
    }
}

impl Default for SpeechCache {
    fn default() -> Self {
        Self::new(1_000, Duration::from_secs(600))
    }
}
