//! Video database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Video database model.
/// A member-uploaded recording, reviewed and published by administrators.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VideoDbModel {
    pub id: String,
    pub title: String,
    pub published: bool,
    pub owner_id: String,
    pub owner_name: String,
    /// Provider-side media id, set once a transfer ticket is issued
    pub media_id: Option<String>,
    /// Playback duration in seconds, backfilled by enrichment
    pub duration_secs: Option<f64>,
    /// ISO 8601 timestamp of the advisory upload-complete signal
    pub upload_completed_at: Option<String>,
    /// ISO 8601 creation timestamp
    pub created_at: String,
}

impl VideoDbModel {
    pub fn new(title: impl Into<String>, owner_id: impl Into<String>, owner_name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            published: false,
            owner_id: owner_id.into(),
            owner_name: owner_name.into(),
            media_id: None,
            duration_secs: None,
            upload_completed_at: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether the stored duration is usable for display.
    pub fn has_valid_duration(&self) -> bool {
        matches!(self.duration_secs, Some(d) if d.is_finite() && d > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_video_defaults() {
        let video = VideoDbModel::new("Ranked finals", "m-1", "Kael");
        assert!(!video.published);
        assert!(video.media_id.is_none());
        assert!(!video.has_valid_duration());
    }

    #[test]
    fn test_valid_duration() {
        let mut video = VideoDbModel::new("t", "o", "n");
        video.duration_secs = Some(0.0);
        assert!(!video.has_valid_duration());
        video.duration_secs = Some(f64::NAN);
        assert!(!video.has_valid_duration());
        video.duration_secs = Some(93.5);
        assert!(video.has_valid_duration());
    }
}
