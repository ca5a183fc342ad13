//! WhatsApp delivery through the Cloud API
//!
//! Sending a document is two calls: upload the file to `/{phone_id}/media`,
//! then post a `document` message referencing the returned media id.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use so_core::config::WhatsAppConfig;
use tracing::{debug, info};

use crate::error::{ReportError, ReportResult};

/// Digits of a phone number, prefixed with the country code when missing
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    if digits.starts_with(country_code) {
        Some(digits)
    } else {
        Some(format!("{}{}", country_code, digits))
    }
}

#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Upload a PDF; returns the provider's media id
    async fn upload_document(&self, content: Vec<u8>, filename: &str) -> ReportResult<String>;

    /// Send an uploaded document to a normalized phone number
    async fn send_document(
        &self,
        to: &str,
        media_id: &str,
        filename: &str,
        caption: &str,
    ) -> ReportResult<()>;

    /// Country code prepended to numbers without one
    fn country_code(&self) -> &str;
}

pub struct WhatsAppCloudClient {
    client: reqwest::Client,
    config: WhatsAppConfig,
}

impl WhatsAppCloudClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, resource: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.api_version,
            self.config.phone_number_id,
            resource
        )
    }
}

fn document_message(to: &str, media_id: &str, filename: &str, caption: &str) -> Value {
    json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "document",
        "document": {
            "id": media_id,
            "filename": filename,
            "caption": caption,
        }
    })
}

fn media_id(response: &Value) -> ReportResult<String> {
    response
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(ReportError::MissingMediaId)
}

#[async_trait]
impl MessagingClient for WhatsAppCloudClient {
    async fn upload_document(&self, content: Vec<u8>, filename: &str) -> ReportResult<String> {
        let file = Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ReportError::MediaUpload(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("messaging_product", "whatsapp")
            .text("type", "application/pdf");

        let response = self
            .client
            .post(self.url("media"))
            .bearer_auth(&self.config.access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ReportError::MediaUpload(e.to_string()))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(ReportError::MediaUpload(format!("{}: {}", status, body)));
        }
        let id = media_id(&body)?;
        debug!(media_id = %id, "document uploaded");
        Ok(id)
    }

    async fn send_document(
        &self,
        to: &str,
        media_id: &str,
        filename: &str,
        caption: &str,
    ) -> ReportResult<()> {
        let response = self
            .client
            .post(self.url("messages"))
            .bearer_auth(&self.config.access_token)
            .json(&document_message(to, media_id, filename, caption))
            .send()
            .await
            .map_err(|e| ReportError::MessageSend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::MessageSend(format!("{}: {}", status, body)));
        }
        info!(to, filename, "document message sent");
        Ok(())
    }

    fn country_code(&self) -> &str {
        &self.config.default_country_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(11) 98765-4321", "55").as_deref(), Some("5511987654321"));
        assert_eq!(normalize_phone("+55 11 98765-4321", "55").as_deref(), Some("5511987654321"));
        assert_eq!(normalize_phone("abc", "55"), None);
    }

    #[test]
    fn test_urls() {
        let client = WhatsAppCloudClient::new(WhatsAppConfig {
            phone_number_id: "1234".to_string(),
            access_token: "token".to_string(),
            api_version: "v18.0".to_string(),
            api_base_url: "https://graph.facebook.com".to_string(),
            default_country_code: "55".to_string(),
        });
        assert_eq!(client.url("media"), "https://graph.facebook.com/v18.0/1234/media");
        assert_eq!(client.url("messages"), "https://graph.facebook.com/v18.0/1234/messages");
    }

    #[test]
    fn test_document_message_shape() {
        let message = document_message("5511987654321", "m-1", "servico-3.pdf", "Relatório do Serviço #3");
        assert_eq!(message["type"], "document");
        assert_eq!(message["document"]["id"], "m-1");
        assert_eq!(message["document"]["filename"], "servico-3.pdf");
    }

    #[test]
    fn test_missing_media_id() {
        assert_eq!(media_id(&json!({ "id": "m-9" })).unwrap(), "m-9");
        assert!(matches!(media_id(&json!({})), Err(ReportError::MissingMediaId)));
        assert!(matches!(media_id(&json!({ "id": "" })), Err(ReportError::MissingMediaId)));
    }
}
