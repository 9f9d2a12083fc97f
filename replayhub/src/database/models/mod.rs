//! Database models.

mod alert;
mod member;
mod video;
mod watch_session;

pub use alert::{AlertDbModel, AlertType};
pub use member::MemberDbModel;
pub use video::VideoDbModel;
pub use watch_session::WatchSessionDbModel;
