use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ConversationContext, DomainError, GeneratedReply, Message, ReplyGenerator};
use crate::infrastructure::http_client::HttpClientTrait;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Model parameters sent with every completion
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 600,
            temperature: 0.7,
        }
    }
}

/// Reply generation over an OpenAI-compatible chat completions API
#[derive(Debug)]
pub struct OpenAiReplyGenerator<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
    settings: OpenAiSettings,
}

impl<C: HttpClientTrait> OpenAiReplyGenerator<C> {
    pub fn new(client: C, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, api_key, DEFAULT_OPENAI_BASE_URL)
    }

    pub fn with_base_url(
        client: C,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            settings: OpenAiSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OpenAiSettings) -> Self {
        self.settings = settings;
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, context: &ConversationContext) -> serde_json::Value {
        let messages: Vec<OpenAiMessage> = context
            .to_messages()
            .iter()
            .map(OpenAiMessage::from_domain)
            .collect();

        serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "stream": false,
        })
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<GeneratedReply, DomainError> {
        let response: OpenAiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("openai", format!("Failed to parse response: {}", e))
        })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| DomainError::provider("openai", "Response contained no reply"))?;

        Ok(GeneratedReply::new(content, response.model))
    }
}

#[async_trait]
impl<C: HttpClientTrait> ReplyGenerator for OpenAiReplyGenerator<C> {
    async fn generate(&self, context: &ConversationContext) -> Result<GeneratedReply, DomainError> {
        let url = self.chat_completions_url();
        let body = self.build_request(context);
        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl OpenAiMessage {
    fn from_domain(message: &Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_client::mock::MockHttpClient;

    const TEST_URL: &str = "https://api.openai.com/v1/chat/completions";

    fn completion(content: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o-mini",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18 }
        })
    }

    #[tokio::test]
    async fn test_generate_reply() {
        let client = MockHttpClient::new()
            .with_response(TEST_URL, completion(serde_json::json!("Rest in the present moment.")));
        let generator = OpenAiReplyGenerator::new(client, "test-api-key");

        let context = ConversationContext::new("How do I find peace?")
            .with_system_prompt("You are a gentle guide.");
        let reply = generator.generate(&context).await.unwrap();

        assert_eq!(reply.content, "Rest in the present moment.");
        assert_eq!(reply.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_request_carries_persona_and_history() {
        let client = MockHttpClient::new().with_response(TEST_URL, completion(serde_json::json!("ok")));
        let generator = OpenAiReplyGenerator::new(client, "k").with_settings(OpenAiSettings {
            model: "gpt-4o".to_string(),
            max_tokens: 100,
            temperature: 0.2,
        });

        let context = ConversationContext::new("And now?")
            .with_system_prompt("Guide persona")
            .with_history(vec![Message::user("Hi"), Message::assistant("Welcome")]);
        generator.generate(&context).await.unwrap();

        let body = generator.client.last_request(TEST_URL).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 100);

        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(body["messages"][3]["content"], "And now?");
    }

    #[tokio::test]
    async fn test_empty_reply_is_an_error() {
        let client = MockHttpClient::new().with_response(TEST_URL, completion(serde_json::Value::Null));
        let generator = OpenAiReplyGenerator::new(client, "k");

        let err = generator
            .generate(&ConversationContext::new("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let client = MockHttpClient::new().with_error(TEST_URL, "API key invalid");
        let generator = OpenAiReplyGenerator::new(client, "invalid-key");

        assert!(generator.generate(&ConversationContext::new("hi")).await.is_err());
    }

    #[tokio::test]
    async fn test_custom_base_url() {
        let custom_url = "http://localhost:8080/v1/chat/completions";
        let client = MockHttpClient::new().with_response(custom_url, completion(serde_json::json!("Custom")));
        let generator = OpenAiReplyGenerator::with_base_url(client, "k", "http://localhost:8080/");

        let reply = generator.generate(&ConversationContext::new("hi")).await.unwrap();
        assert_eq!(reply.content, "Custom");
    }
}
