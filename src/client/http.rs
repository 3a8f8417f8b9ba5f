//! HTTP client for the chat and quota endpoints

use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::api::middleware::FINGERPRINT_HEADER;
use crate::api::types::{ApiErrorResponse, ChatRequest, ChatResponse};
use crate::domain::{DomainError, LimitDecision};

/// Answer to a chat request
#[derive(Debug, Clone)]
pub enum ChatReply {
    Answered(ChatResponse),
    LimitReached(LimitDecision),
}

#[derive(Debug, Clone)]
pub struct QuotaApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    fingerprint: Option<String>,
}

impl QuotaApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DomainError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            fingerprint: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Fingerprint in use, including one minted by the server
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub async fn chat(&mut self, request: &ChatRequest) -> Result<ChatReply, DomainError> {
        let url = format!("{}/v1/chat", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| DomainError::provider("gateway", e.to_string()))?;
        self.remember_fingerprint(&response);

        match response.status() {
            status if status.is_success() => response
                .json::<ChatResponse>()
                .await
                .map(ChatReply::Answered)
                .map_err(|e| DomainError::provider("gateway", format!("Bad chat response: {}", e))),
            StatusCode::TOO_MANY_REQUESTS => Ok(ChatReply::LimitReached(limit_from(response).await?)),
            _ => Err(error_from(response).await),
        }
    }

    /// Current decision; `Ok` for both allowed and exhausted callers
    pub async fn quota(&mut self, guest_count: Option<u32>) -> Result<LimitDecision, DomainError> {
        let url = format!("{}/v1/quota", self.base_url);
        let mut builder = self.authorize(self.client.get(&url));
        if let Some(count) = guest_count {
            builder = builder.query(&[("guest_count", count)]);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::provider("gateway", e.to_string()))?;
        self.remember_fingerprint(&response);

        match response.status() {
            status if status.is_success() => response
                .json::<LimitDecision>()
                .await
                .map_err(|e| DomainError::provider("gateway", format!("Bad quota response: {}", e))),
            StatusCode::TOO_MANY_REQUESTS => limit_from(response).await,
            _ => Err(error_from(response).await),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.token, &self.fingerprint) {
            (Some(token), _) => builder.bearer_auth(token),
            (None, Some(fingerprint)) => builder.header(FINGERPRINT_HEADER.as_str(), fingerprint),
            (None, None) => builder,
        }
    }

    fn remember_fingerprint(&mut self, response: &Response) {
        if self.token.is_some() || self.fingerprint.is_some() {
            return;
        }
        if let Some(value) = response
            .headers()
            .get(FINGERPRINT_HEADER.as_str())
            .and_then(|v| v.to_str().ok())
        {
            self.fingerprint = Some(value.to_string());
        }
    }
}

async fn limit_from(response: Response) -> Result<LimitDecision, DomainError> {
    let body: ApiErrorResponse = response
        .json()
        .await
        .map_err(|e| DomainError::provider("gateway", format!("Bad limit response: {}", e)))?;

    body.quota
        .ok_or_else(|| DomainError::provider("gateway", "Limit response without quota"))
}

async fn error_from(response: Response) -> DomainError {
    let status = response.status();
    let message = match response.json::<ApiErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => format!("HTTP {}", status),
    };

    match status {
        StatusCode::UNAUTHORIZED => DomainError::authentication(message),
        s if s.is_client_error() => DomainError::validation(message),
        _ => DomainError::provider("gateway", message),
    }
}
