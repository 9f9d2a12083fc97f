//! Watch session database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Watch session database model.
/// Written by the viewing surface; read-only to the notification pipeline.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct WatchSessionDbModel {
    pub id: String,
    pub video_id: String,
    pub viewer_id: String,
    pub country: Option<String>,
    /// ISO 8601 timestamp
    pub started_at: String,
}
