//! Chat turn endpoint

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::api::middleware::Caller;
use crate::api::state::AppState;
use crate::api::types::{ApiError, ChatRequest, ChatResponse, Json, ValidatedJson};
use crate::infrastructure::chat::{ChatTurnOutcome, ChatTurnRequest};

use super::quota::mark_degraded;

/// POST /v1/chat
pub async fn create_chat_turn(
    State(state): State<AppState>,
    caller: Caller,
    ValidatedJson(body): ValidatedJson<ChatRequest>,
) -> Result<Response, ApiError> {
    let mut request = ChatTurnRequest::new(caller.identity.clone(), body.message.as_str())
        .with_history(body.history_messages())
        .with_speech(body.speak);
    if let Some(guest) = body.guest_state() {
        request = request.with_guest(guest);
    }

    match state.chat.handle(request).await? {
        ChatTurnOutcome::Completed(turn) => {
            let degraded = turn.degraded;
            let mut response = Json(ChatResponse::from(turn)).into_response();
            if degraded {
                mark_degraded(&mut response);
            }
            Ok(caller.respond(response))
        }
        ChatTurnOutcome::LimitReached(decision) => {
            info!(
                identity = %caller.identity.redacted(),
                tier = %decision.tier,
                "Chat turn refused at the limit"
            );
            Ok(caller.respond(ApiError::limit_reached(decision)))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::router::create_router_with_state;
    use crate::api::state::test_support::{app, app_with, body_json, token_for};
    use crate::domain::conversation::MockReplyGenerator;
    use crate::domain::{Tier, TierDirectory, UserId};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn chat_request() -> axum::http::request::Builder {
        Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header(header::CONTENT_TYPE, "application/json")
    }

    fn send(builder: axum::http::request::Builder, body: serde_json::Value) -> Request<Body> {
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_guest_turns_until_the_cap() {
        let test = app();
        let router = create_router_with_state(test.state.clone());

        let body = serde_json::json!({ "message": "Where do I start?", "guest_count": 0 });
        let response = router
            .clone()
            .oneshot(send(
                chat_request().header("x-client-fingerprint", "fp-1"),
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["reply"], "Be still and listen.");
        assert_eq!(json["guest_count"], 1);
        assert_eq!(json["quota"]["tier"], "guest");
        assert_eq!(json["quota"]["remaining"], 1);
        assert!(json["quota"]["reset_time"].is_null());

        let body = serde_json::json!({ "message": "And then?", "guest_count": 2 });
        let response = router
            .oneshot(send(
                chat_request().header("x-client-fingerprint", "fp-1"),
                body,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "limit_reached");
        assert_eq!(json["quota"]["allowed"], false);
        assert_eq!(json["quota"]["remaining"], 0);
    }

    #[tokio::test]
    async fn test_new_guest_receives_a_fingerprint() {
        let test = app();
        let body = serde_json::json!({ "message": "Hello" });

        let response = create_router_with_state(test.state)
            .oneshot(send(chat_request(), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-client-fingerprint"));
    }

    #[tokio::test]
    async fn test_signed_in_user_is_charged_on_the_ledger() {
        let test = app();
        test.directory
            .set_tier(&UserId::new("u-1").unwrap(), Tier::Premium)
            .await
            .unwrap();
        let body = serde_json::json!({ "message": "Teach me patience", "guest_count": 99 });

        let response = create_router_with_state(test.state)
            .oneshot(send(
                chat_request()
                    .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u-1"))),
                body,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["quota"]["tier"], "premium");
        assert_eq!(json["quota"]["remaining"], 9);
        assert!(json.get("guest_count").is_none());
        assert_eq!(test.ledger.len(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_is_503_and_not_charged() {
        let test = app_with(MockReplyGenerator::failing("upstream down"));
        let body = serde_json::json!({ "message": "Are you there?" });

        let response = create_router_with_state(test.state)
            .oneshot(send(
                chat_request()
                    .header(header::AUTHORIZATION, format!("Bearer {}", token_for("u-2"))),
                body,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "generation_failed");
        assert!(test.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected_before_the_quota() {
        let test = app();
        let body = serde_json::json!({ "message": "" });

        let response = create_router_with_state(test.state)
            .oneshot(send(chat_request(), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["param"], "message");
    }
}
