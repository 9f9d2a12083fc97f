//! Member database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Member database model. Lookup source for display names in session
/// notifications.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MemberDbModel {
    pub id: String,
    pub display_name: String,
}
