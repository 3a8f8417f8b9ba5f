//! Admin API, guarded by the `X-Admin-Key` shared secret

pub mod usage;
pub mod users;

use axum::{
    routing::{post, put},
    Router,
};

use super::state::AppState;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route("/usage/reset", post(usage::reset_usage))
        .route("/users/{user_id}/tier", put(users::set_user_tier))
}
