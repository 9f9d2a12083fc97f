//! Video repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::VideoDbModel;
use crate::{Error, Result};

/// Video repository trait.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<VideoDbModel>;
    async fn create(&self, video: &VideoDbModel) -> Result<()>;

    /// Most recent videos by creation time, for cache priming.
    async fn list_recent(&self, limit: u32) -> Result<Vec<VideoDbModel>>;

    async fn set_published(&self, id: &str, published: bool) -> Result<()>;
    async fn set_media_id(&self, id: &str, media_id: &str) -> Result<()>;
    async fn set_duration(&self, id: &str, duration_secs: f64) -> Result<()>;

    /// Advisory marker; callers treat failures as non-fatal.
    async fn mark_upload_complete(&self, id: &str) -> Result<()>;
}

/// SQLx implementation of VideoRepository.
pub struct SqlxVideoRepository {
    pool: SqlitePool,
}

impl SqlxVideoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoRepository for SqlxVideoRepository {
    async fn get(&self, id: &str) -> Result<VideoDbModel> {
        sqlx::query_as::<_, VideoDbModel>("SELECT * FROM video WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Video", id))
    }

    async fn create(&self, video: &VideoDbModel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO video (id, title, published, owner_id, owner_name, media_id, duration_secs, upload_completed_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.id)
        .bind(&video.title)
        .bind(video.published)
        .bind(&video.owner_id)
        .bind(&video.owner_name)
        .bind(&video.media_id)
        .bind(video.duration_secs)
        .bind(&video.upload_completed_at)
        .bind(&video.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<VideoDbModel>> {
        let videos = sqlx::query_as::<_, VideoDbModel>(
            "SELECT * FROM video ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    async fn set_published(&self, id: &str, published: bool) -> Result<()> {
        sqlx::query("UPDATE video SET published = ? WHERE id = ?")
            .bind(published)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_media_id(&self, id: &str, media_id: &str) -> Result<()> {
        sqlx::query("UPDATE video SET media_id = ? WHERE id = ?")
            .bind(media_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_duration(&self, id: &str, duration_secs: f64) -> Result<()> {
        sqlx::query("UPDATE video SET duration_secs = ? WHERE id = ?")
            .bind(duration_secs)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_upload_complete(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE video SET upload_completed_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
