//! Webhook fallback transport.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::warn;

use super::WebhookTransport;
use crate::notification::payload::MessagePayload;
use crate::{Error, Result};

/// Plain POST webhook transport.
pub struct HttpWebhookTransport {
    client: Client,
}

impl HttpWebhookTransport {
    pub fn new() -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            client: Client::new(),
        }
    }

    fn build_body(payload: &MessagePayload) -> serde_json::Value {
        let mut body = json!({
            "embeds": [{
                "title": payload.title,
                "description": payload.description,
                "fields": payload.fields.iter().map(|f| json!({
                    "name": f.name,
                    "value": f.value,
                })).collect::<Vec<_>>(),
            }]
        });

        if let Some(link) = &payload.link {
            body["components"] = json!([{
                "type": "link_button",
                "label": link.label,
                "url": link.url,
            }]);
        }

        body
    }

    async fn send(&self, url: &str, body: &serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("webhook request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        warn!("Webhook post failed: {} - {}", status, text);
        Err(Error::transport(format!(
            "webhook post failed: {} - {}",
            status, text
        )))
    }
}

impl Default for HttpWebhookTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookTransport {
    async fn post(&self, url: &str, payload: &MessagePayload) -> Result<()> {
        self.send(url, &Self::build_body(payload)).await
    }

    async fn post_without_components(&self, url: &str, payload: &MessagePayload) -> Result<()> {
        self.send(url, &Self::build_body(&payload.without_components()))
            .await
    }
}
