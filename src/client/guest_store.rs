//! Client-side persistence of the guest counter
//!
//! The counter and the fingerprint it belongs to live only on the client.
//! Deleting the store is the only way to reset them.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, GuestCounterState};

/// What a guest client remembers between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestProfile {
    /// Fingerprint minted by the server on the first request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub counter: GuestCounterState,
}

#[async_trait]
pub trait GuestCounterStore: Send + Sync {
    /// Stored profile, or a fresh one when nothing was saved yet
    async fn load(&self) -> Result<GuestProfile, DomainError>;

    async fn save(&self, profile: &GuestProfile) -> Result<(), DomainError>;
}

/// JSON file store used by the terminal client
#[derive(Debug, Clone)]
pub struct FileGuestStore {
    path: PathBuf,
}

impl FileGuestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl GuestCounterStore for FileGuestStore {
    async fn load(&self) -> Result<GuestProfile, DomainError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                DomainError::storage(format!(
                    "Corrupt guest state in {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(GuestProfile::default()),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn save(&self, profile: &GuestProfile) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec_pretty(profile)
            .map_err(|e| DomainError::internal(format!("Failed to encode guest state: {}", e)))?;

        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            DomainError::storage(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryGuestStore {
    profile: Mutex<GuestProfile>,
}

impl InMemoryGuestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GuestCounterStore for InMemoryGuestStore {
    async fn load(&self) -> Result<GuestProfile, DomainError> {
        self.profile
            .lock()
            .map(|p| p.clone())
            .map_err(|e| DomainError::internal(format!("Lock poisoned: {}", e)))
    }

    async fn save(&self, profile: &GuestProfile) -> Result<(), DomainError> {
        let mut stored = self
            .profile
            .lock()
            .map_err(|e| DomainError::internal(format!("Lock poisoned: {}", e)))?;
        *stored = profile.clone();
        Ok(())
    }
}
