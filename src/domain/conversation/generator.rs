use async_trait::async_trait;
use std::fmt::Debug;

use super::context::ConversationContext;
use crate::domain::DomainError;

/// A generated assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub content: String,
    pub model: String,
}

impl GeneratedReply {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
        }
    }
}

/// Produces the assistant reply for a conversation (the LLM provider)
#[async_trait]
pub trait ReplyGenerator: Send + Sync + Debug {
    async fn generate(&self, context: &ConversationContext) -> Result<GeneratedReply, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
