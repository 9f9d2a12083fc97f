//! Notification settings.
//!
//! Settings are read as an immutable [`Arc<NotificationSettings>`] snapshot.
//! Every dispatch cycle works against one snapshot, so a concurrent settings
//! edit can never half-apply to an in-flight delivery. [`SettingsCache`]
//! refreshes the snapshot from the repository on a bounded TTL and on
//! explicit invalidation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::database::models::AlertType;
use crate::database::repositories::SettingsRepository;
use crate::notification::NotificationCategory;

/// Default snapshot lifetime before a repository re-read.
pub const DEFAULT_SETTINGS_TTL: Duration = Duration::from_secs(30);

/// Notification settings snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Announce new uploads
    #[serde(default = "default_true")]
    pub notify_upload: bool,
    /// Announce publish / unpublish flips
    #[serde(default = "default_true")]
    pub notify_published: bool,
    /// Announce watch sessions
    #[serde(default = "default_true")]
    pub notify_session: bool,
    /// Per-type alert enable flags; types absent from the map are enabled
    #[serde(default)]
    pub alert_types: HashMap<AlertType, bool>,

    /// Primary bot channel id
    #[serde(default)]
    pub primary_channel_id: Option<String>,
    /// Secondary channel for duplicated new-upload announcements
    #[serde(default)]
    pub secondary_channel_id: Option<String>,
    /// Fallback webhook URL
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Bot credential for channel posts
    #[serde(default)]
    pub bot_token: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            notify_upload: true,
            notify_published: true,
            notify_session: true,
            alert_types: HashMap::new(),
            primary_channel_id: None,
            secondary_channel_id: None,
            webhook_url: None,
            bot_token: None,
        }
    }
}

impl NotificationSettings {
    /// Whether notifications for `category` are enabled.
    pub fn category_enabled(&self, category: NotificationCategory) -> bool {
        match category {
            NotificationCategory::Upload => self.notify_upload,
            NotificationCategory::Published | NotificationCategory::Unpublished => {
                self.notify_published
            }
            NotificationCategory::Session => self.notify_session,
            NotificationCategory::Alert(kind) => {
                self.alert_types.get(&kind).copied().unwrap_or(true)
            }
        }
    }
}

/// TTL cache around the settings repository.
pub struct SettingsCache {
    repository: Arc<dyn SettingsRepository>,
    ttl: Duration,
    cached: RwLock<Option<(Arc<NotificationSettings>, Instant)>>,
}

impl SettingsCache {
    pub fn new(repository: Arc<dyn SettingsRepository>) -> Self {
        Self::with_ttl(repository, DEFAULT_SETTINGS_TTL)
    }

    pub fn with_ttl(repository: Arc<dyn SettingsRepository>, ttl: Duration) -> Self {
        Self {
            repository,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Current settings snapshot, re-read from the repository when the cached
    /// one has expired.
    pub async fn snapshot(&self) -> Result<Arc<NotificationSettings>> {
        {
            let guard = self.cached.read();
            if let Some((settings, loaded_at)) = guard.as_ref()
                && loaded_at.elapsed() < self.ttl
            {
                return Ok(settings.clone());
            }
        }

        let settings = Arc::new(self.repository.load().await?);
        *self.cached.write() = Some((settings.clone(), Instant::now()));
        Ok(settings)
    }

    /// Drop the cached snapshot so the next read hits the repository.
    pub fn invalidate(&self) {
        *self.cached.write() = None;
    }

    /// Persist new settings and refresh the snapshot immediately.
    pub async fn update(&self, settings: NotificationSettings) -> Result<()> {
        self.repository.save(&settings).await?;
        *self.cached.write() = Some((Arc::new(settings), Instant::now()));
        Ok(())
    }
}
