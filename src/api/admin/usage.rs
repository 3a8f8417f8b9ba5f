//! Ledger maintenance

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{Fingerprint, Identity, UserId};

/// Exactly one of the two fields selects the ledger record
#[derive(Debug, Deserialize)]
pub struct ResetUsageRequest {
    pub user_id: Option<String>,
    pub fingerprint: Option<String>,
}

impl ResetUsageRequest {
    fn identity(&self) -> Result<Identity, ApiError> {
        match (&self.user_id, &self.fingerprint) {
            (Some(user_id), None) => Ok(Identity::Authenticated(UserId::new(user_id.as_str())?)),
            (None, Some(fingerprint)) => {
                Ok(Identity::Anonymous(Fingerprint::new(fingerprint.as_str())?))
            }
            _ => Err(ApiError::bad_request(
                "Provide exactly one of 'user_id' or 'fingerprint'",
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResetUsageResponse {
    pub identity: String,
    /// False when there was nothing on record
    pub removed: bool,
}

/// POST /admin/usage/reset
pub async fn reset_usage(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<ResetUsageRequest>,
) -> Result<Json<ResetUsageResponse>, ApiError> {
    let identity = request.identity()?;
    let removed = state.evaluator.ledger().reset(&identity).await?;

    info!(identity = %identity.redacted(), removed, "Usage ledger record reset");

    Ok(Json(ResetUsageResponse {
        identity: identity.redacted(),
        removed,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::router::create_router_with_state;
    use crate::api::state::test_support::{app, body_json, token_for, ADMIN_KEY};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn reset(body: serde_json::Value, key: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/admin/usage/reset")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-admin-key", key)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn chat_as(user_id: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token_for(user_id)))
            .body(Body::from(r#"{"message":"Hello"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_reset_restores_the_full_allowance() {
        let test = app();
        let router = create_router_with_state(test.state.clone());

        let response = router.clone().oneshot(chat_as("u-1")).await.unwrap();
        assert_eq!(body_json(response).await["quota"]["remaining"], 4);

        let response = router
            .clone()
            .oneshot(reset(serde_json::json!({ "user_id": "u-1" }), ADMIN_KEY))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["removed"], true);
        assert!(test.ledger.is_empty());

        let response = router.oneshot(chat_as("u-1")).await.unwrap();
        assert_eq!(body_json(response).await["quota"]["remaining"], 4);
    }

    #[tokio::test]
    async fn test_reset_requires_exactly_one_selector() {
        let test = app();
        let response = create_router_with_state(test.state)
            .oneshot(reset(
                serde_json::json!({ "user_id": "u-1", "fingerprint": "fp" }),
                ADMIN_KEY,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reset_requires_the_admin_key() {
        let test = app();
        let response = create_router_with_state(test.state)
            .oneshot(reset(serde_json::json!({ "user_id": "u-1" }), "nope"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
