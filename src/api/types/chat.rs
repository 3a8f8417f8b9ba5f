//! Chat turn payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{GuestCounterState, LimitDecision, Message};
use crate::infrastructure::chat::CompletedTurn;

/// Author of a prior message; clients cannot inject system messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

impl From<HistoryEntry> for Message {
    fn from(entry: HistoryEntry) -> Self {
        match entry.role {
            HistoryRole::User => Message::user(entry.content),
            HistoryRole::Assistant => Message::assistant(entry.content),
        }
    }
}

/// POST /v1/chat body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000, message = "message must be 1 to 4000 characters"))]
    pub message: String,
    #[serde(default)]
    #[validate(length(max = 50, message = "history is limited to 50 entries"))]
    pub history: Vec<HistoryEntry>,
    /// Client-held guest counter; ignored for signed-in callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<u32>,
    /// Also synthesize the reply as audio
    #[serde(default)]
    pub speak: bool,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            guest_count: None,
            speak: false,
        }
    }

    pub fn guest_state(&self) -> Option<GuestCounterState> {
        self.guest_count.map(GuestCounterState::with_count)
    }

    pub fn history_messages(&self) -> Vec<Message> {
        self.history.iter().cloned().map(Message::from).collect()
    }
}

/// Successful chat turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub turn_id: Uuid,
    pub reply: String,
    pub quota: LimitDecision,
    /// Advanced guest counter the client must store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl From<CompletedTurn> for ChatResponse {
    fn from(turn: CompletedTurn) -> Self {
        let audio_url = turn
            .speech_pending
            .then(|| format!("/v1/speech/{}", turn.turn_id));

        Self {
            turn_id: turn.turn_id,
            reply: turn.reply,
            quota: turn.decision,
            guest_count: turn.guest.map(|g| g.get()),
            audio_url,
        }
    }
}
