//! Notification delivery service.
//!
//! Best-effort, at-most-once delivery: gate on the settings snapshot, post to
//! the primary bot channel, duplicate new uploads to the secondary channel,
//! fall back to the webhook on primary failure, degrade the webhook payload
//! when components are rejected. Never returns an error to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::events::{NotificationCategory, NotificationEvent};
use super::payload::MessagePayload;
use super::transports::{ChannelTransport, WebhookTransport};
use crate::settings::NotificationSettings;

/// Delivery counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Dropped by the category gate
    pub gated: u64,
    /// Delivered through the primary bot channel
    pub delivered_primary: u64,
    /// Delivered through the webhook fallback
    pub delivered_webhook: u64,
    /// Delivered through the webhook after component degradation
    pub delivered_degraded: u64,
    /// All routes exhausted
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    gated: AtomicU64,
    delivered_primary: AtomicU64,
    delivered_webhook: AtomicU64,
    delivered_degraded: AtomicU64,
    dropped: AtomicU64,
}

/// Notification delivery service.
pub struct DeliveryService {
    channel: Arc<dyn ChannelTransport>,
    webhook: Arc<dyn WebhookTransport>,
    /// Portal base URL for action links, e.g. `https://portal.example`
    portal_base_url: Option<String>,
    counters: Counters,
}

impl DeliveryService {
    pub fn new(
        channel: Arc<dyn ChannelTransport>,
        webhook: Arc<dyn WebhookTransport>,
        portal_base_url: Option<String>,
    ) -> Self {
        Self {
            channel,
            webhook,
            portal_base_url,
            counters: Counters::default(),
        }
    }

    /// Deliver a notification event. Failures are logged, never surfaced.
    pub async fn deliver(&self, event: &NotificationEvent, settings: &NotificationSettings) {
        let category = event.category();
        if !settings.category_enabled(category) {
            debug!(?category, "notification gated by settings");
            self.counters.gated.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let payload = self.render(event);

        if self.try_primary(&payload, settings).await {
            self.counters.delivered_primary.fetch_add(1, Ordering::Relaxed);
            if category == NotificationCategory::Upload {
                self.try_duplicate(&payload, settings).await;
            }
            return;
        }

        self.try_webhook(&payload, settings).await;
    }

    fn render(&self, event: &NotificationEvent) -> MessagePayload {
        let mut payload = MessagePayload::from_event(event);
        if let (NotificationEvent::Published { video_id, .. }, Some(base)) =
            (event, &self.portal_base_url)
        {
            payload = payload.with_link(
                "Watch",
                format!("{}/videos/{}", base.trim_end_matches('/'), video_id),
            );
        }
        payload
    }

    /// Primary bot channel post. Missing credential or channel id counts as
    /// a failure so the webhook fallback engages.
    async fn try_primary(&self, payload: &MessagePayload, settings: &NotificationSettings) -> bool {
        let (Some(token), Some(channel_id)) = (
            settings.bot_token.as_deref().filter(|t| !t.is_empty()),
            settings.primary_channel_id.as_deref().filter(|c| !c.is_empty()),
        ) else {
            debug!("primary channel not configured, falling back");
            return false;
        };

        match self.channel.post(token, channel_id, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("primary channel post failed: {}", e);
                false
            }
        }
    }

    /// Best-effort duplicate of a new-upload announcement to the secondary
    /// channel. Failure never affects the outcome.
    async fn try_duplicate(&self, payload: &MessagePayload, settings: &NotificationSettings) {
        let (Some(token), Some(channel_id)) = (
            settings.bot_token.as_deref().filter(|t| !t.is_empty()),
            settings
                .secondary_channel_id
                .as_deref()
                .filter(|c| !c.is_empty()),
        ) else {
            return;
        };

        if let Err(e) = self.channel.post(token, channel_id, payload).await {
            warn!("secondary channel duplicate failed: {}", e);
        }
    }

    async fn try_webhook(&self, payload: &MessagePayload, settings: &NotificationSettings) {
        let Some(url) = settings.webhook_url.as_deref().filter(|u| !u.is_empty()) else {
            warn!("no webhook configured, notification dropped");
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match self.webhook.post(url, payload).await {
            Ok(()) => {
                self.counters.delivered_webhook.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) if payload.has_components() => {
                warn!("webhook post failed ({}), retrying without components", e);
                match self.webhook.post_without_components(url, payload).await {
                    Ok(()) => {
                        self.counters.delivered_degraded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e2) => {
                        warn!("webhook degraded retry failed: {}", e2);
                        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            Err(e) => {
                warn!("webhook post failed: {}", e);
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            gated: self.counters.gated.load(Ordering::Relaxed),
            delivered_primary: self.counters.delivered_primary.load(Ordering::Relaxed),
            delivered_webhook: self.counters.delivered_webhook.load(Ordering::Relaxed),
            delivered_degraded: self.counters.delivered_degraded.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}
