//! Quota query and policy table endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::middleware::Caller;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, TiersResponse};
use crate::domain::{GuestCounterState, Tier};

pub const QUOTA_DEGRADED_HEADER: &str = "x-quota-degraded";

#[derive(Debug, Default, Deserialize)]
pub struct QuotaParams {
    /// Client-held guest counter; ignored for signed-in callers
    pub guest_count: Option<u32>,
}

/// GET /v1/quota
///
/// Answers 200 while the caller may send another message and 429 once the
/// limit is reached; both carry the same decision payload.
pub async fn get_quota(
    State(state): State<AppState>,
    caller: Caller,
    params: Result<Query<QuotaParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) =
        params.map_err(|e| ApiError::bad_request(e.body_text()).with_param("guest_count"))?;

    let resolution = state.tiers.resolve(&caller.identity).await?;
    let tier = resolution.tier;
    let guest = match tier {
        Tier::Guest => Some(GuestCounterState::with_count(params.guest_count.unwrap_or(0))),
        _ => None,
    };

    let evaluation = if resolution.degraded {
        state.evaluator.fail_open(&caller.identity, tier)?
    } else {
        state
            .evaluator
            .evaluate(&caller.identity, tier, guest.as_ref())
            .await?
    };

    let mut response = if evaluation.decision.allowed {
        Json(evaluation.decision).into_response()
    } else {
        ApiError::limit_reached(evaluation.decision).into_response()
    };
    if evaluation.degraded {
        mark_degraded(&mut response);
    }

    Ok(caller.respond(response))
}

/// Flag a response whose quota numbers were not confirmed by storage
pub(super) fn mark_degraded(response: &mut Response) {
    response
        .headers_mut()
        .insert(QUOTA_DEGRADED_HEADER, HeaderValue::from_static("true"));
}

/// GET /v1/tiers
pub async fn list_tiers(State(state): State<AppState>) -> Json<TiersResponse> {
    Json(TiersResponse::from_table(
        state.evaluator.policies(),
        state.utc_offset_minutes,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::router::create_router_with_state;
    use crate::api::state::test_support::{app, body_json, token_for};
    use crate::domain::quota::{MockTierDirectory, ReferenceZone};
    use crate::domain::{
        Clock, DomainError, Identity, Tier, TierDirectory, UsageLedger, UserId, WindowFrame,
        WindowKind,
    };
    use crate::infrastructure::quota::TierResolver;
    use std::sync::Arc;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn get(uri: &str) -> axum::http::request::Builder {
        Request::builder().method("GET").uri(uri)
    }

    #[tokio::test]
    async fn test_fresh_free_user() {
        let test = app();
        let response = create_router_with_state(test.state)
            .oneshot(
                get("/v1/quota")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u-1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tier"], "free");
        assert_eq!(json["remaining"], 5);
        assert_eq!(json["daily_limit"], 5);
        assert_eq!(json["allowed"], true);
        assert_eq!(json["reset_time"], "2026-03-11T00:00:00Z");
    }

    #[tokio::test]
    async fn test_exhausted_user_gets_429_with_decision() {
        let test = app();
        let identity = Identity::Authenticated(UserId::new("u-1").unwrap());
        let frame = WindowFrame::at(
            WindowKind::CalendarDay,
            test.clock.now(),
            &ReferenceZone::utc(),
        )
        .unwrap();
        test.ledger
            .increment(&identity, Tier::Free, &frame, 5)
            .await
            .unwrap();

        let response = create_router_with_state(test.state)
            .oneshot(
                get("/v1/quota")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u-1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(response).await;
        assert_eq!(json["quota"]["remaining"], 0);
        assert_eq!(json["quota"]["allowed"], false);
    }

    #[tokio::test]
    async fn test_directory_outage_answers_open_and_flagged() {
        let mut test = app();
        let mut directory = MockTierDirectory::new();
        directory
            .expect_tier_for()
            .returning(|_| Err(DomainError::storage("db down")));
        test.state.tiers = TierResolver::new(Arc::new(directory));

        let response = create_router_with_state(test.state)
            .oneshot(
                get("/v1/quota")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u-1")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(super::QUOTA_DEGRADED_HEADER).unwrap(),
            "true"
        );
        let json = body_json(response).await;
        assert_eq!(json["allowed"], true);
        assert_eq!(json["remaining"], 5);
    }

    #[tokio::test]
    async fn test_transformation_is_unlimited() {
        let test = app();
        test.directory
            .set_tier(&UserId::new("u-9").unwrap(), Tier::Transformation)
            .await
            .unwrap();

        let response = create_router_with_state(test.state)
            .oneshot(
                get("/v1/quota")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u-9")))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["remaining"], "unlimited");
        assert!(json["reset_time"].is_null());
    }

    #[tokio::test]
    async fn test_guest_uses_query_counter() {
        let test = app();
        let response = create_router_with_state(test.state)
            .oneshot(
                get("/v1/quota?guest_count=1")
                    .header("x-client-fingerprint", "fp-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tier"], "guest");
        assert_eq!(json["remaining"], 1);
    }

    #[tokio::test]
    async fn test_list_tiers() {
        let test = app();
        let response = create_router_with_state(test.state)
            .oneshot(get("/v1/tiers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["tiers"].as_array().unwrap().len(), 4);
        assert_eq!(json["tiers"][1]["window_kind"], "calendar-day");
    }
}
