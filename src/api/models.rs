// Wire types for the crowd-management API.
//
// The backend is loose about its JSON: optional fields are sometimes missing,
// sometimes null, and `alert_type` is whatever string the reporter sent. These
// types accept all of that and expose typed helpers on top.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One emergency or informational signal raised by a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default = "default_alert_type")]
    pub alert_type: String,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    /// Backend timestamp, naive ISO 8601 (no offset) in practice.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<String>,
    /// Whatever the resolving operator submitted (number or action name).
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub assigned_name: Option<String>,
}

fn default_alert_type() -> String {
    "sos".to_string()
}

impl Alert {
    /// True when `alert_type` is "sos", ignoring case.
    ///
    /// Only exact SOS alerts ring the siren. Unknown types are rendered like
    /// SOS (see `AlertKind::from_type`) but never trigger audio.
    pub fn is_sos(&self) -> bool {
        self.alert_type.eq_ignore_ascii_case("sos")
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    pub fn kind(&self) -> AlertKind {
        AlertKind::from_type(&self.alert_type)
    }

    /// Reporter name for display, falling back to "Unknown User".
    pub fn reporter_name(&self) -> &str {
        match self.user_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Unknown User",
        }
    }

    /// Single uppercase initial of the reporter, or 'U' when unnamed.
    pub fn reporter_initial(&self) -> char {
        self.user_name
            .as_deref()
            .and_then(|n| n.trim().chars().next())
            .and_then(|c| c.to_uppercase().next())
            .unwrap_or('U')
    }

    /// Parse `created_at` into a UTC timestamp.
    ///
    /// Accepts RFC 3339 and the offset-less form the backend emits. The
    /// offset-less form is taken as UTC.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref()?)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Alert lifecycle as reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    #[default]
    Active,
    Resolved,
    /// Any status string this client doesn't know about.
    #[serde(other)]
    Unknown,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Presentation category of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Sos,
    Help,
    Warning,
    Info,
}

impl AlertKind {
    /// Map a free-form `alert_type` to a category. Unrecognized types are
    /// presented as SOS.
    pub fn from_type(alert_type: &str) -> Self {
        match alert_type.to_ascii_lowercase().as_str() {
            "help" => AlertKind::Help,
            "warning" => AlertKind::Warning,
            "info" => AlertKind::Info,
            _ => AlertKind::Sos,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AlertKind::Sos => "🚨",
            AlertKind::Help => "🆘",
            AlertKind::Warning => "⚠️",
            AlertKind::Info => "ℹ️",
        }
    }
}

/// Named operator actions offered by the alert overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAction {
    Acknowledged,
    DispatchingHelp,
    ViewMap,
    Call,
}

impl QuickAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuickAction::Acknowledged => "acknowledged",
            QuickAction::DispatchingHelp => "dispatching_help",
            QuickAction::ViewMap => "view_map",
            QuickAction::Call => "call",
        }
    }

    /// View-on-map and call are side effects: they are emitted straight to the
    /// dispatcher without passing through the overlay's responding phase.
    pub fn is_side_effect(&self) -> bool {
        matches!(self, QuickAction::ViewMap | QuickAction::Call)
    }
}

impl std::str::FromStr for QuickAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acknowledged" | "ack" => Ok(QuickAction::Acknowledged),
            "dispatching_help" | "dispatch" => Ok(QuickAction::DispatchingHelp),
            "view_map" | "map" => Ok(QuickAction::ViewMap),
            "call" => Ok(QuickAction::Call),
            other => anyhow::bail!("Unknown quick action: {other}"),
        }
    }
}

/// What the operator submitted when responding to an alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseValue {
    /// Drag-to-confirm completion, 0..=100.
    Completion(u8),
    Action(QuickAction),
    /// Free-text response from the command line.
    Note(String),
}

impl std::fmt::Display for ResponseValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseValue::Completion(v) => write!(f, "{v}"),
            ResponseValue::Action(a) => write!(f, "{}", a.as_str()),
            ResponseValue::Note(n) => write!(f, "{n}"),
        }
    }
}

/// Body of `PUT /admin/alerts/{id}/resolve`.
#[derive(Debug, Serialize)]
pub struct ResolveRequest<'a> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<&'a ResponseValue>,
}

/// Body of `POST /admin/alerts/{id}/assign`.
#[derive(Debug, Serialize)]
pub struct AssignRequest<'a> {
    pub admin_id: &'a str,
    pub admin_name: &'a str,
}

/// Body of `POST /events/{id}/sos` — the attendee-side trigger.
#[derive(Debug, Clone, Serialize)]
pub struct SosTrigger {
    pub user_id: String,
    pub user_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerResponse {
    pub alert_id: String,
}

/// Response from `GET /admin/alerts/stats/{event_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertStats {
    pub event_id: String,
    pub total_alerts: u64,
    pub active_alerts: u64,
    pub resolved_alerts: u64,
    #[serde(default)]
    pub by_type: BTreeMap<String, u64>,
}
