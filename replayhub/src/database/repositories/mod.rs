//! Database repositories.

mod member;
mod settings;
mod video;

pub use member::{MemberRepository, SqlxMemberRepository};
pub use settings::{SettingsRepository, SqlxSettingsRepository};
pub use video::{SqlxVideoRepository, VideoRepository};
