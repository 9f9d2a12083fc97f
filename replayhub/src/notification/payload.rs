//! Message payload rendering.

use serde::{Deserialize, Serialize};

use super::events::{NotificationCategory, NotificationEvent};

/// Chat-platform embed description limit. Longer descriptions are truncated,
/// never rejected.
pub const DESCRIPTION_CEILING: usize = 2048;

/// Marker appended when a description is cut at the ceiling.
const TRUNCATION_MARKER: &str = "…";

/// A short labeled value rendered alongside the description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadField {
    pub name: String,
    pub value: String,
}

/// Clickable action link attached to a message as a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLink {
    pub label: String,
    pub url: String,
}

/// Renderable message payload, transport-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub category: NotificationCategory,
    pub title: String,
    pub description: String,
    pub fields: Vec<PayloadField>,
    /// Rendered as an interactive component; webhooks may not support it
    pub link: Option<ActionLink>,
    /// Member ids to mention
    pub mentions: Vec<String>,
}

impl MessagePayload {
    /// Render an event into a payload. Oversized descriptions are truncated
    /// at the platform ceiling.
    pub fn from_event(event: &NotificationEvent) -> Self {
        let mut fields = Vec::new();
        match event {
            NotificationEvent::SessionStarted { country: Some(c), .. } => {
                fields.push(PayloadField {
                    name: "Country".to_string(),
                    value: c.clone(),
                });
            }
            NotificationEvent::AlertRaised { severity, .. } => {
                fields.push(PayloadField {
                    name: "Severity".to_string(),
                    value: severity.clone(),
                });
            }
            _ => {}
        }

        Self {
            category: event.category(),
            title: event.title(),
            description: truncate_description(&event.description()),
            fields,
            link: None,
            mentions: Vec::new(),
        }
    }

    pub fn with_link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.link = Some(ActionLink {
            label: label.into(),
            url: url.into(),
        });
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn has_components(&self) -> bool {
        self.link.is_some()
    }

    /// Degraded copy with components stripped and the link folded into the
    /// description, for transports that reject component blocks.
    pub fn without_components(&self) -> Self {
        let mut degraded = self.clone();
        if let Some(link) = degraded.link.take() {
            let folded = format!("{}\n{}: {}", degraded.description, link.label, link.url);
            degraded.description = truncate_description(&folded);
        }
        degraded
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() <= DESCRIPTION_CEILING {
        return description.to_string();
    }
    let cut: String = description
        .chars()
        .take(DESCRIPTION_CEILING - TRUNCATION_MARKER.chars().count())
        .collect();
    format!("{}{}", cut, TRUNCATION_MARKER)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::database::models::AlertType;

    fn upload_event() -> NotificationEvent {
        NotificationEvent::NewUpload {
            video_id: "v-1".to_string(),
            title: "Overtime thriller".to_string(),
            owner_name: "Kael".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_from_event_carries_category() {
        let payload = MessagePayload::from_event(&upload_event());
        assert_eq!(payload.category, NotificationCategory::Upload);
        assert!(payload.title.contains("Kael"));
    }

    #[test]
    fn test_alert_field() {
        let event = NotificationEvent::AlertRaised {
            alert_id: "a-1".to_string(),
            alert_type: AlertType::MultipleDevices,
            severity: "high".to_string(),
            subject_id: "m-9".to_string(),
            details: "4 devices in 10 minutes".to_string(),
            timestamp: Utc::now(),
        };
        let payload = MessagePayload::from_event(&event);
        assert_eq!(payload.fields[0].name, "Severity");
        assert_eq!(payload.fields[0].value, "high");
    }

    #[test]
    fn test_long_description_truncated_not_rejected() {
        let event = NotificationEvent::AlertRaised {
            alert_id: "a-1".to_string(),
            alert_type: AlertType::SuspiciousActivity,
            severity: "high".to_string(),
            subject_id: "m-9".to_string(),
            details: "x".repeat(5000),
            timestamp: Utc::now(),
        };
        let payload = MessagePayload::from_event(&event);
        assert_eq!(payload.description.chars().count(), DESCRIPTION_CEILING);
        assert!(payload.description.ends_with('…'));
    }

    #[test]
    fn test_without_components_folds_link() {
        let payload = MessagePayload::from_event(&upload_event())
            .with_link("Watch", "https://portal.example/v/v-1");
        assert!(payload.has_components());

        let degraded = payload.without_components();
        assert!(!degraded.has_components());
        assert!(degraded.description.contains("https://portal.example/v/v-1"));
        // Original is untouched
        assert!(payload.link.is_some());
    }

    #[test]
    fn test_without_components_respects_ceiling() {
        let mut payload = MessagePayload::from_event(&upload_event())
            .with_link("Watch", "https://portal.example/v/v-1");
        payload.description = "y".repeat(DESCRIPTION_CEILING);

        let degraded = payload.without_components();
        assert!(degraded.description.chars().count() <= DESCRIPTION_CEILING);
    }
}
