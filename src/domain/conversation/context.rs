//! Conversation context handed to the reply generator

use super::message::{Message, MessageRole};

/// Everything the reply generator sees for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    system_prompt: Option<String>,
    history: Vec<Message>,
    message: String,
}

impl ConversationContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            history: Vec::new(),
            message: message.into(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Prior turns, oldest first. System messages from the client are dropped
    /// so callers cannot replace the guidance persona.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history
            .into_iter()
            .filter(|m| m.role != MessageRole::System)
            .collect();
        self
    }

    /// Keep only the most recent `max` history messages
    pub fn truncate_history(mut self, max: usize) -> Self {
        if self.history.len() > max {
            let excess = self.history.len() - max;
            self.history.drain(..excess);
        }
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Flatten into the message list sent to the provider
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);

        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }

        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(self.message.clone()));
        messages
    }
}
