//! Conversation domain models and the reply-generation contract

mod context;
mod generator;
mod message;

pub use context::ConversationContext;
pub use generator::{GeneratedReply, ReplyGenerator};
pub use message::{Message, MessageRole};

#[cfg(test)]
pub use generator::mock::MockReplyGenerator;
