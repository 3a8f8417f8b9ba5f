//! Synthesized audio for chat turns

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::infrastructure::chat::SpeechEntry;

/// GET /v1/speech/{turn_id}
///
/// 200 with the audio once synthesis finished, 202 while it is running,
/// 404 for unknown or expired turns.
pub async fn get_speech(
    State(state): State<AppState>,
    turn_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(turn_id) =
        turn_id.map_err(|_| ApiError::bad_request("Invalid turn id").with_param("turn_id"))?;

    match state.speech.get(&turn_id).await {
        Some(SpeechEntry::Ready(audio)) => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, audio.content_type)],
            audio.bytes,
        )
            .into_response()),
        Some(SpeechEntry::Pending) => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "turn_id": turn_id, "status": "pending" })),
        )
            .into_response()),
        Some(SpeechEntry::Failed) => {
            Err(ApiError::unavailable("Speech synthesis failed for this turn")
                .with_code("speech_failed"))
        }
        None => Err(ApiError::not_found(format!("No audio for turn '{}'", turn_id))),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::router::create_router_with_state;
    use crate::api::state::test_support::app;
    use crate::domain::SpeechAudio;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use bytes::Bytes;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn get(turn_id: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/v1/speech/{}", turn_id))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_speech_lifecycle() {
        let test = app();
        let router = create_router_with_state(test.state.clone());
        let turn_id = Uuid::new_v4();

        let response = router.clone().oneshot(get(&turn_id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        test.state.speech.mark_pending(turn_id).await;
        let response = router.clone().oneshot(get(&turn_id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        test.state
            .speech
            .complete(
                turn_id,
                SpeechAudio {
                    bytes: Bytes::from_static(&[1, 2, 3]),
                    content_type: "audio/mpeg".to_string(),
                },
            )
            .await;
        let response = router.oneshot(get(&turn_id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_failed_synthesis() {
        let test = app();
        let turn_id = Uuid::new_v4();
        test.state.speech.fail(turn_id).await;

        let response = create_router_with_state(test.state)
            .oneshot(get(&turn_id.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_malformed_turn_id() {
        let test = app();
        let response = create_router_with_state(test.state)
            .oneshot(get("not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
