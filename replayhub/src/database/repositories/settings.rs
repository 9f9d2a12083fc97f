//! Notification settings repository.
//!
//! Single-row table holding the settings snapshot as a JSON blob.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::settings::NotificationSettings;

/// Settings repository trait.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load the stored settings; defaults when no row exists yet.
    async fn load(&self) -> Result<NotificationSettings>;
    async fn save(&self, settings: &NotificationSettings) -> Result<()>;
}

/// SQLx implementation of SettingsRepository.
pub struct SqlxSettingsRepository {
    pool: SqlitePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn load(&self) -> Result<NotificationSettings> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT settings FROM notification_settings WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((blob,)) => Ok(serde_json::from_str(&blob)?),
            None => Ok(NotificationSettings::default()),
        }
    }

    async fn save(&self, settings: &NotificationSettings) -> Result<()> {
        let blob = serde_json::to_string(settings)?;
        sqlx::query(
            r#"
            INSERT INTO notification_settings (id, settings, updated_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET settings = excluded.settings, updated_at = excluded.updated_at
            "#,
        )
        .bind(&blob)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
