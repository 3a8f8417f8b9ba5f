//! CRM contact sync over HTTP

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Contact, ContactSync, DomainError};
use crate::infrastructure::http_client::HttpClientTrait;

/// Contact sync against a REST CRM exposing `contacts/upsert` and
/// `contacts/{id}/tags`
#[derive(Debug)]
pub struct HttpContactSync<C: HttpClientTrait> {
    client: C,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> HttpContactSync<C> {
    pub fn new(client: C, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            auth_header: format!("Bearer {}", api_key.into()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    contact: UpsertedContact,
}

#[derive(Debug, Deserialize)]
struct UpsertedContact {
    id: String,
}

#[async_trait]
impl<C: HttpClientTrait> ContactSync for HttpContactSync<C> {
    async fn upsert_contact(&self, contact: &Contact) -> Result<String, DomainError> {
        let url = format!("{}/contacts/upsert", self.base_url);
        let mut body = serde_json::json!({
            "externalId": contact.external_id,
            "customFields": { "tier": contact.tier.as_str() },
        });
        if let Some(email) = &contact.email {
            body["email"] = serde_json::json!(email);
        }

        let response = self.client.post_json(&url, self.headers(), &body).await?;
        let parsed: UpsertResponse = serde_json::from_value(response).map_err(|e| {
            DomainError::provider("crm", format!("Failed to parse upsert response: {}", e))
        })?;

        Ok(parsed.contact.id)
    }

    async fn add_tag(&self, contact_id: &str, tag: &str) -> Result<(), DomainError> {
        let url = format!("{}/contacts/{}/tags", self.base_url, contact_id);
        let body = serde_json::json!({ "tags": [tag] });

        self.client.post_json(&url, self.headers(), &body).await?;
        Ok(())
    }
}
