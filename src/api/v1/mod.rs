//! Public v1 API

pub mod chat;
pub mod quota;
pub mod speech;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::create_chat_turn))
        .route("/quota", get(quota::get_quota))
        .route("/tiers", get(quota::list_tiers))
        .route("/speech/{turn_id}", get(speech::get_speech))
}
