//! Account-activity alert database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Alert database model.
/// Produced by the account-monitoring side; the pipeline only renders and
/// delivers them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AlertDbModel {
    pub id: String,
    /// One of [`AlertType`], stored as its kebab-case string
    pub alert_type: String,
    pub severity: String,
    /// Member the alert concerns
    pub subject_id: String,
    pub details: String,
    /// ISO 8601 timestamp
    pub created_at: String,
}

impl AlertDbModel {
    /// Parsed alert type, `None` for unrecognized producer values.
    pub fn kind(&self) -> Option<AlertType> {
        AlertType::parse(&self.alert_type)
    }
}

/// Account-activity alert types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AlertType {
    CountryChange,
    IpChange,
    ExcessiveViews,
    SuspiciousActivity,
    VpnProxy,
    MultipleDevices,
    OddHours,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CountryChange => "country-change",
            Self::IpChange => "ip-change",
            Self::ExcessiveViews => "excessive-views",
            Self::SuspiciousActivity => "suspicious-activity",
            Self::VpnProxy => "vpn-proxy",
            Self::MultipleDevices => "multiple-devices",
            Self::OddHours => "odd-hours",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "country-change" => Some(Self::CountryChange),
            "ip-change" => Some(Self::IpChange),
            "excessive-views" => Some(Self::ExcessiveViews),
            "suspicious-activity" => Some(Self::SuspiciousActivity),
            "vpn-proxy" => Some(Self::VpnProxy),
            "multiple-devices" => Some(Self::MultipleDevices),
            "odd-hours" => Some(Self::OddHours),
            _ => None,
        }
    }

    pub const ALL: [AlertType; 7] = [
        Self::CountryChange,
        Self::IpChange,
        Self::ExcessiveViews,
        Self::SuspiciousActivity,
        Self::VpnProxy,
        Self::MultipleDevices,
        Self::OddHours,
    ];

    /// Human-readable label used in message titles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CountryChange => "Country Change",
            Self::IpChange => "IP Change",
            Self::ExcessiveViews => "Excessive Views",
            Self::SuspiciousActivity => "Suspicious Activity",
            Self::VpnProxy => "VPN / Proxy Detected",
            Self::MultipleDevices => "Multiple Devices",
            Self::OddHours => "Odd Hours Activity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_roundtrip() {
        for kind in AlertType::ALL {
            assert_eq!(AlertType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AlertType::parse("unknown-thing"), None);
    }

    #[test]
    fn test_alert_kind() {
        let alert = AlertDbModel {
            id: "a-1".to_string(),
            alert_type: "vpn-proxy".to_string(),
            severity: "high".to_string(),
            subject_id: "m-1".to_string(),
            details: "exit node detected".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        assert_eq!(alert.kind(), Some(AlertType::VpnProxy));
    }
}
