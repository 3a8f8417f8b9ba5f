//! Contracts for the post-turn collaborators: CRM contact sync and speech
//! synthesis. Both run after a chat turn has been decided and their
//! outcome never influences quota accounting.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::quota::{Tier, UserId};
use crate::domain::DomainError;

/// Contact as known to the CRM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub tier: Tier,
}

impl Contact {
    pub fn new(user_id: &UserId, tier: Tier) -> Self {
        Self {
            external_id: user_id.as_str().to_string(),
            email: None,
            tier,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Tag naming the contact's current tier
pub fn tier_tag(tier: Tier) -> String {
    format!("tier:{}", tier.as_str())
}

/// Tag applied when a contact has used up its quota
pub const EXHAUSTED_TAG: &str = "quota:exhausted";

/// Marketing/CRM platform
#[async_trait]
pub trait ContactSync: Send + Sync + Debug {
    /// Create or update the contact, returning the CRM's contact id
    async fn upsert_contact(&self, contact: &Contact) -> Result<String, DomainError>;

    /// Attach `tag` to the contact
    async fn add_tag(&self, contact_id: &str, tag: &str) -> Result<(), DomainError>;
}

/// Synthesized audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Text-to-speech provider
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + Debug {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, DomainError>;
}
