//! Infrastructure layer - External service implementations

pub mod auth;
pub mod chat;
pub mod crm;
pub mod directory;
pub mod http_client;
pub mod ledger;
pub mod llm;
pub mod logging;
pub mod observability;
pub mod quota;
pub mod tts;
