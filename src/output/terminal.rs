// Colored terminal output for the alert overlay, alert lists, and stats.
//
// This module handles all terminal-specific formatting. The console driver
// and main.rs display functions delegate here.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use crate::api::models::{Alert, AlertKind, AlertStats};
use crate::sos::overlay::OverlayPhase;

/// Display the SOS overlay card for `alert` in its current phase.
pub fn display_overlay(alert: &Alert, phase: OverlayPhase, response_sent: bool) {
    let kind = alert.kind();
    let title = format!(
        " {} {} ALERT  {} ",
        kind.icon(),
        alert.alert_type.to_uppercase(),
        format_clock(alert)
    );

    println!();
    println!("{}", colorize_kind(kind, &title).bold());
    println!(
        "  [{}] {}  {}",
        alert.reporter_initial(),
        alert.reporter_name().bold(),
        format!("ID: {}", alert.user_id.as_deref().unwrap_or("-")).dimmed()
    );

    if let Some(desc) = alert.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  \"{}\"", super::truncate_chars(desc, 140));
    }

    println!("  📍 {}", format_location(alert.lat, alert.lng, 6));

    match phase {
        OverlayPhase::ShownStatic => {
            println!(
                "  {}  {}  {}  {}  {}",
                "[a] Acknowledged".green(),
                "[h] Dispatch help".yellow(),
                "[m] View on map".dimmed(),
                "[c] Call".dimmed(),
                "[x] Dismiss".dimmed()
            );
        }
        OverlayPhase::ShownInteractive => {
            println!(
                "  {}  {}  {}  {}",
                "Slide to respond: [d <0-100>]".bold(),
                "[m] View on map".dimmed(),
                "[c] Call".dimmed(),
                "[x] Dismiss".dimmed()
            );
        }
        OverlayPhase::Responding => {
            if response_sent {
                println!("  {}", "✓ Response Sent!".green().bold());
            } else {
                println!("  {}", "✓ Responding…".green());
            }
        }
        OverlayPhase::Hidden => {}
    }
}

/// Display the full alert list, split into active and resolved sections.
pub fn display_alert_list(alerts: &[Alert]) {
    let now = Utc::now();
    let active: Vec<&Alert> = alerts.iter().filter(|a| a.is_active()).collect();
    let resolved: Vec<&Alert> = alerts.iter().filter(|a| !a.is_active()).collect();

    println!(
        "\n{}  {}  {}",
        "=== Alert Management ===".bold(),
        format!("{} Active", active.len()).red(),
        format!("{} Resolved", resolved.len()).green()
    );

    println!("\n{}", format!("🚨 Active Alerts ({})", active.len()).bold());
    if active.is_empty() {
        println!("  {}", "No active alerts".dimmed());
    }
    for alert in &active {
        display_alert_row(alert, now, true);
    }

    println!("\n{}", format!("✅ Resolved Alerts ({})", resolved.len()).bold());
    if resolved.is_empty() {
        println!("  {}", "No resolved alerts".dimmed());
    }
    for alert in &resolved {
        display_alert_row(alert, now, false);
    }
    println!();
}

fn display_alert_row(alert: &Alert, now: DateTime<Utc>, detailed: bool) {
    let age = alert
        .created_at_utc()
        .map(|t| format_age(t, now))
        .unwrap_or_else(|| "-".to_string());

    println!(
        "  {:<10} {:<9} {:<24} {}",
        alert.id.dimmed(),
        colorize_kind(alert.kind(), &alert.alert_type.to_uppercase()),
        alert.reporter_name(),
        age.dimmed()
    );

    if !detailed {
        return;
    }
    if let Some(desc) = alert.description.as_deref().filter(|d| !d.is_empty()) {
        println!("             {}", super::truncate_chars(desc, 100));
    }
    println!("             📍 {}", format_location(alert.lat, alert.lng, 4));
    if let Some(name) = alert.assigned_name.as_deref() {
        println!("             assigned to {}", name.bold());
    }
}

/// Display the per-event alert statistics.
pub fn display_stats(stats: &AlertStats) {
    println!(
        "\n{}",
        format!("=== Alert Stats for {} ===", stats.event_id).bold()
    );
    println!("  Total:    {}", stats.total_alerts);
    println!("  Active:   {}", stats.active_alerts.to_string().red());
    println!("  Resolved: {}", stats.resolved_alerts.to_string().green());
    if !stats.by_type.is_empty() {
        println!("  By type:");
        for (alert_type, count) in &stats.by_type {
            println!(
                "    {:<10} {}",
                colorize_kind(AlertKind::from_type(alert_type), alert_type),
                count
            );
        }
    }
}

/// One-line status shown after each snapshot while watching.
pub fn display_status_line(event_id: &str, unread: usize, total: usize) {
    let unread_str = if unread > 0 {
        format!("{unread} active").red().bold().to_string()
    } else {
        "0 active".green().to_string()
    };
    println!(
        "{} {}  {}  {}",
        "●".red(),
        event_id.bold(),
        unread_str,
        format!("{total} total").dimmed()
    );
}

/// Relative age in the style of the alert list: "Just now", "5m ago",
/// "3h ago", or the local date for anything older than a day.
pub fn format_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(created);
    if diff.num_seconds() < 60 {
        "Just now".to_string()
    } else if diff.num_minutes() < 60 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{}h ago", diff.num_hours())
    } else {
        created.with_timezone(&Local).format("%Y-%m-%d").to_string()
    }
}

/// Local wall-clock time of the alert (HH:MM:SS), empty when unknown.
pub fn format_clock(alert: &Alert) -> String {
    alert
        .created_at_utc()
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

pub fn format_location(lat: Option<f64>, lng: Option<f64>, decimals: usize) -> String {
    match (lat, lng) {
        (Some(lat), Some(lng)) => format!("{lat:.decimals$}, {lng:.decimals$}"),
        _ => "location unknown".to_string(),
    }
}

/// OpenStreetMap link centred on the reporter, for the view-on-map action.
pub fn map_url(lat: f64, lng: f64) -> String {
    format!("https://www.openstreetmap.org/?mlat={lat:.6}&mlon={lng:.6}#map=18/{lat:.6}/{lng:.6}")
}

fn colorize_kind(kind: AlertKind, text: &str) -> colored::ColoredString {
    match kind {
        AlertKind::Sos => text.on_red().white(),
        AlertKind::Help => text.on_bright_yellow().black(),
        AlertKind::Warning => text.yellow(),
        AlertKind::Info => text.cyan(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn age_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let ago = |secs: i64| format_age(now - chrono::Duration::seconds(secs), now);
        assert_eq!(ago(5), "Just now");
        assert_eq!(ago(59), "Just now");
        assert_eq!(ago(60), "1m ago");
        assert_eq!(ago(59 * 60), "59m ago");
        assert_eq!(ago(3 * 3600), "3h ago");
        assert!(ago(3 * 86400).starts_with("2026-02-2"));
    }

    #[test]
    fn location_precision() {
        assert_eq!(
            format_location(Some(12.97159), Some(77.594566), 4),
            "12.9716, 77.5946"
        );
        assert_eq!(format_location(None, Some(1.0), 6), "location unknown");
    }

    #[test]
    fn map_url_embeds_coordinates() {
        let url = map_url(12.5, 77.25);
        assert!(url.contains("mlat=12.500000"));
        assert!(url.contains("mlon=77.250000"));
    }
}
