//! Request and response types of the HTTP API

pub mod chat;
pub mod error;
pub mod json;
pub mod quota;

pub use chat::{ChatRequest, ChatResponse, HistoryEntry, HistoryRole};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::{Json, ValidatedJson};
pub use quota::{TierEntry, TiersResponse};
