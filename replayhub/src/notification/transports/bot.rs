//! Bot channel-post transport.
//!
//! Implements the chat platform's recommended rate limit handling:
//! - No hardcoded rate limits
//! - Retries on 429 responses respecting the Retry-After header

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::ChannelTransport;
use crate::notification::payload::MessagePayload;
use crate::{Error, Result};

/// Maximum number of retries for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Authenticated channel-post transport.
pub struct BotApiTransport {
    /// Chat platform API base, e.g. `https://chat.example/api/v1`
    api_base: String,
    client: Client,
}

impl BotApiTransport {
    pub fn new(api_base: impl Into<String>) -> Self {
        crate::utils::http_client::install_rustls_provider();
        Self {
            api_base: api_base.into(),
            client: Client::new(),
        }
    }

    /// Build the channel-message body for a payload.
    fn build_body(payload: &MessagePayload) -> serde_json::Value {
        let embed = json!({
            "title": payload.title,
            "description": payload.description,
            "fields": payload.fields.iter().map(|f| json!({
                "name": f.name,
                "value": f.value,
            })).collect::<Vec<_>>(),
        });

        let mut body = json!({
            "embeds": [embed]
        });

        if let Some(link) = &payload.link {
            body["components"] = json!([{
                "type": "link_button",
                "label": link.label,
                "url": link.url,
            }]);
        }

        if !payload.mentions.is_empty() {
            let content = payload
                .mentions
                .iter()
                .map(|id| format!("<@{}>", id))
                .collect::<Vec<_>>()
                .join(" ");
            body["content"] = json!(content);
        }

        body
    }

    /// Send request with rate limit handling.
    async fn send_with_retry(
        &self,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<()> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = self
                .client
                .post(url)
                .header("Authorization", format!("Bot {}", token))
                .json(body)
                .send()
                .await
                .map_err(|e| Error::transport(format!("channel post failed: {}", e)))?;

            let status = response.status();

            if status.is_success() {
                return Ok(());
            }

            if status.as_u16() == 429 {
                let retry_after = parse_retry_after(&response);

                if attempts >= MAX_RATE_LIMIT_RETRIES {
                    warn!(
                        "Rate limit: max retries ({}) exceeded, last retry_after was {:?}",
                        MAX_RATE_LIMIT_RETRIES, retry_after
                    );
                    return Err(Error::transport(format!(
                        "rate limit exceeded after {} retries",
                        MAX_RATE_LIMIT_RETRIES
                    )));
                }

                let wait_duration = retry_after.unwrap_or(Duration::from_secs(1));
                debug!(
                    "Rate limited (429), waiting {:?} before retry (attempt {}/{})",
                    wait_duration, attempts, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(wait_duration).await;
                continue;
            }

            // Other error - don't retry
            let text = response.text().await.unwrap_or_default();
            warn!("Channel post failed: {} - {}", status, text);
            return Err(Error::transport(format!(
                "channel post failed: {} - {}",
                status, text
            )));
        }
    }
}

/// Parse the Retry-After duration from a 429 response.
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    if let Some(retry_after) = response.headers().get("Retry-After")
        && let Ok(secs) = retry_after.to_str().ok()?.parse::<f64>()
    {
        return Some(Duration::from_secs_f64(secs));
    }
    None
}

#[async_trait]
impl ChannelTransport for BotApiTransport {
    async fn post(&self, token: &str, channel_id: &str, payload: &MessagePayload) -> Result<()> {
        if token.is_empty() {
            return Err(Error::config("bot token not configured"));
        }

        let url = format!(
            "{}/channels/{}/messages",
            self.api_base.trim_end_matches('/'),
            channel_id
        );
        let body = Self::build_body(payload);
        self.send_with_retry(&url, token, &body).await?;

        debug!(channel_id, "channel post sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::notification::events::NotificationEvent;

    fn sample_payload() -> MessagePayload {
        MessagePayload::from_event(&NotificationEvent::Published {
            video_id: "v-1".to_string(),
            title: "Grand final".to_string(),
            owner_name: "Kael".to_string(),
            duration_secs: Some(310.0),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_build_body_embed() {
        let body = BotApiTransport::build_body(&sample_payload());
        assert!(body["embeds"].is_array());
        assert!(
            body["embeds"][0]["title"]
                .as_str()
                .unwrap()
                .contains("Grand final")
        );
        assert!(body.get("components").is_none());
    }

    #[test]
    fn test_build_body_with_link_and_mentions() {
        let payload = sample_payload()
            .with_link("Watch", "https://portal.example/v/v-1")
            .with_mentions(vec!["m-1".to_string(), "m-2".to_string()]);
        let body = BotApiTransport::build_body(&payload);
        assert_eq!(body["components"][0]["url"], "https://portal.example/v/v-1");
        assert_eq!(body["content"], "<@m-1> <@m-2>");
    }

    #[tokio::test]
    async fn test_post_with_empty_token_fails() {
        let transport = BotApiTransport::new("https://chat.example/api/v1");
        let result = transport.post("", "c-1", &sample_payload()).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
