//! Caller identity extraction
//!
//! Resolution order:
//! 1. `Authorization: Bearer <jwt>` validated against the shared secret
//! 2. `X-Client-Fingerprint` sent by the client
//! 3. a freshly minted fingerprint, echoed back in the same header

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::{Fingerprint, Identity};

pub static FINGERPRINT_HEADER: HeaderName = HeaderName::from_static("x-client-fingerprint");

/// The identity a request is accounted to
#[derive(Debug, Clone)]
pub struct Caller {
    pub identity: Identity,
    /// The fingerprint was minted for this request and must be returned
    pub minted: bool,
}

impl Caller {
    /// Attach the minted fingerprint, if any, to `response`
    pub fn respond(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();

        if let (true, Identity::Anonymous(fingerprint)) = (self.minted, &self.identity) {
            if let Ok(value) = HeaderValue::from_str(fingerprint.as_str()) {
                response
                    .headers_mut()
                    .insert(FINGERPRINT_HEADER.clone(), value);
            }
        }

        response
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let (Some(token), Some(jwt)) = (bearer_token(&parts.headers)?, &state.jwt) {
            let claims = jwt.validate(&token)?;
            let user_id = claims
                .user_id()
                .map_err(|e| ApiError::unauthorized(format!("Invalid token subject: {}", e)))?;

            debug!(user_id = %user_id, "Authenticated caller");
            return Ok(Self {
                identity: Identity::Authenticated(user_id),
                minted: false,
            });
        }

        match parts.headers.get(&FINGERPRINT_HEADER) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| ApiError::bad_request("Invalid X-Client-Fingerprint encoding"))?;
                let fingerprint = Fingerprint::new(raw.trim())
                    .map_err(|e| ApiError::from(e).with_param("X-Client-Fingerprint"))?;

                Ok(Self {
                    identity: Identity::Anonymous(fingerprint),
                    minted: false,
                })
            }
            None => Ok(Self {
                identity: Identity::Anonymous(Fingerprint::generate()),
                minted: true,
            }),
        }
    }
}

/// Bearer token from the Authorization header, if one was sent
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

    Ok(raw
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty()))
}
