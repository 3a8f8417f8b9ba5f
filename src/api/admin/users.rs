//! Tier assignment

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Tier, UserId};

#[derive(Debug, Deserialize)]
pub struct SetTierRequest {
    pub tier: Tier,
}

#[derive(Debug, Serialize)]
pub struct UserTierResponse {
    pub user_id: String,
    pub tier: Tier,
}

/// PUT /admin/users/{user_id}/tier
pub async fn set_user_tier(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(user_id): Path<String>,
    Json(request): Json<SetTierRequest>,
) -> Result<Json<UserTierResponse>, ApiError> {
    let user_id = UserId::new(user_id)?;

    if request.tier == Tier::Guest {
        return Err(
            ApiError::bad_request("Signed-in users cannot be assigned the guest tier")
                .with_param("tier"),
        );
    }

    state.directory.set_tier(&user_id, request.tier).await?;
    info!(user_id = %user_id, tier = %request.tier, "User tier updated");

    Ok(Json(UserTierResponse {
        user_id: user_id.to_string(),
        tier: request.tier,
    }))
}
