//! Speech synthesis over an OpenAI-compatible `audio/speech` endpoint

use async_trait::async_trait;

use crate::domain::{DomainError, SpeechAudio, SpeechSynthesizer};
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Debug)]
pub struct OpenAiSpeechSynthesizer<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    model: String,
    voice: String,
}

impl<C: HttpClientTrait> OpenAiSpeechSynthesizer<C> {
    pub fn new(client: C, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
        }
    }

    pub fn with_voice(mut self, model: impl Into<String>, voice: impl Into<String>) -> Self {
        self.model = model.into();
        self.voice = voice.into();
        self
    }
}

#[async_trait]
impl<C: HttpClientTrait> SpeechSynthesizer for OpenAiSpeechSynthesizer<C> {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, DomainError> {
        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "voice": self.voice,
            "input": text,
            "response_format": "mp3",
        });
        let headers = vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        let response = self.client.post_json_for_bytes(&url, headers, &body).await?;
        if response.bytes.is_empty() {
            return Err(DomainError::provider("tts", "Empty audio response"));
        }

        Ok(SpeechAudio {
            bytes: response.bytes,
            content_type: response
                .content_type
                .filter(|ct| ct.starts_with("audio/"))
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        })
    }
}
