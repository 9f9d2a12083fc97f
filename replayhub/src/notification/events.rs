//! Notification events.
//!
//! Events carry an explicit category tag; nothing downstream infers the
//! category from message text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::AlertType;

/// Explicit category tag for routing and settings gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationCategory {
    /// New video uploaded by a member
    Upload,
    /// Video made publicly visible
    Published,
    /// Video withdrawn from public visibility
    Unpublished,
    /// Watch session started
    Session,
    /// Account-activity alert
    Alert(AlertType),
}

/// Events that can trigger notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationEvent {
    /// A member uploaded a new video.
    NewUpload {
        video_id: String,
        title: String,
        owner_name: String,
        timestamp: DateTime<Utc>,
    },
    /// An administrator published a video.
    Published {
        video_id: String,
        title: String,
        owner_name: String,
        duration_secs: Option<f64>,
        timestamp: DateTime<Utc>,
    },
    /// An administrator unpublished a video.
    Unpublished {
        video_id: String,
        title: String,
        owner_name: String,
        timestamp: DateTime<Utc>,
    },
    /// A viewer started watching a video.
    SessionStarted {
        session_id: String,
        viewer_name: String,
        video_title: String,
        country: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Account-activity alert raised for a member.
    AlertRaised {
        alert_id: String,
        alert_type: AlertType,
        severity: String,
        subject_id: String,
        details: String,
        timestamp: DateTime<Utc>,
    },
}

impl NotificationEvent {
    pub fn category(&self) -> NotificationCategory {
        match self {
            Self::NewUpload { .. } => NotificationCategory::Upload,
            Self::Published { .. } => NotificationCategory::Published,
            Self::Unpublished { .. } => NotificationCategory::Unpublished,
            Self::SessionStarted { .. } => NotificationCategory::Session,
            Self::AlertRaised { alert_type, .. } => NotificationCategory::Alert(*alert_type),
        }
    }

    /// Get a human-readable title for this event.
    pub fn title(&self) -> String {
        match self {
            Self::NewUpload { owner_name, .. } => {
                format!("📤 New upload from {}", owner_name)
            }
            Self::Published { title, .. } => {
                format!("🎬 Now live: {}", title)
            }
            Self::Unpublished { title, .. } => {
                format!("⚫ Taken down: {}", title)
            }
            Self::SessionStarted { viewer_name, .. } => {
                format!("👀 {} started watching", viewer_name)
            }
            Self::AlertRaised {
                alert_type,
                severity,
                ..
            } => {
                format!("🚨 {} ({})", alert_type.label(), severity)
            }
        }
    }

    /// Get a human-readable description for this event.
    pub fn description(&self) -> String {
        match self {
            Self::NewUpload { title, .. } => {
                format!("\"{}\" is awaiting review.", title)
            }
            Self::Published {
                owner_name,
                duration_secs,
                ..
            } => match duration_secs {
                Some(d) if *d > 0.0 => format!(
                    "Uploaded by {} · {}",
                    owner_name,
                    format_duration(*d)
                ),
                _ => format!("Uploaded by {}", owner_name),
            },
            Self::Unpublished { owner_name, .. } => {
                format!("No longer publicly visible. Uploaded by {}.", owner_name)
            }
            Self::SessionStarted {
                video_title,
                country,
                ..
            } => match country {
                Some(c) => format!("\"{}\" · from {}", video_title, c),
                None => format!("\"{}\"", video_title),
            },
            Self::AlertRaised {
                subject_id, details, ..
            } => {
                format!("Member {}: {}", subject_id, details)
            }
        }
    }
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format a duration in seconds as a human-readable string.
pub fn format_duration(secs: f64) -> String {
    let total_secs = secs as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_category_tags() {
        let event = NotificationEvent::NewUpload {
            video_id: "v-1".to_string(),
            title: "Final boss".to_string(),
            owner_name: "Kael".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.category(), NotificationCategory::Upload);

        let event = NotificationEvent::AlertRaised {
            alert_id: "a-1".to_string(),
            alert_type: AlertType::CountryChange,
            severity: "medium".to_string(),
            subject_id: "m-1".to_string(),
            details: "DE -> BR within an hour".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(
            event.category(),
            NotificationCategory::Alert(AlertType::CountryChange)
        );
    }

    #[test]
    fn test_category_independent_of_title_text() {
        // A title that mentions "published" must not affect routing
        let event = NotificationEvent::NewUpload {
            video_id: "v-1".to_string(),
            title: "published my best run".to_string(),
            owner_name: "Kael".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.category(), NotificationCategory::Upload);
    }

    #[rstest]
    #[case(0, "0 B")]
    #[case(512, "512 B")]
    #[case(1024, "1.00 KB")]
    #[case(1_536, "1.50 KB")]
    #[case(10 * 1024 * 1024, "10.00 MB")]
    #[case(5 * 1024 * 1024 * 1024, "5.00 GB")]
    fn test_format_bytes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_bytes(bytes), expected);
    }

    #[rstest]
    #[case(42.7, "42s")]
    #[case(93.0, "1m 33s")]
    #[case(3_725.0, "1h 2m 5s")]
    fn test_format_duration(#[case] secs: f64, #[case] expected: &str) {
        assert_eq!(format_duration(secs), expected);
    }
}
