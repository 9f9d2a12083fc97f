//! Message transports.

mod bot;
mod webhook;

pub use bot::BotApiTransport;
pub use webhook::HttpWebhookTransport;

use async_trait::async_trait;

use super::payload::MessagePayload;
use crate::Result;

/// Authenticated channel-post transport against the chat platform API.
/// Credentials and targets come from the settings snapshot per call.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn post(&self, token: &str, channel_id: &str, payload: &MessagePayload) -> Result<()>;
}

/// Unauthenticated webhook transport.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, url: &str, payload: &MessagePayload) -> Result<()>;

    /// Retry path for endpoints that reject component blocks: the payload is
    /// degraded before sending.
    async fn post_without_components(&self, url: &str, payload: &MessagePayload) -> Result<()>;
}
