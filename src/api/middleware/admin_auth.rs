//! Admin authentication via the `X-Admin-Key` shared secret

use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::api::state::AppState;
use crate::api::types::ApiError;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Extractor that requires the admin key
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_key.as_deref() else {
            return Err(ApiError::forbidden("Admin API is disabled"));
        };

        let provided = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Admin access requires the X-Admin-Key header"))?;

        if !keys_match(provided, expected) {
            warn!("Rejected admin request with an invalid key");
            return Err(ApiError::unauthorized("Invalid admin key"));
        }

        debug!("Admin access granted");
        Ok(RequireAdmin)
    }
}

/// Compares digests so the comparison time does not depend on the key prefix
fn keys_match(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}
