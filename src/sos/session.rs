// Notification session — the client-side bookkeeping behind SOS detection.
//
// Pure state, no I/O. The poller feeds every successful snapshot through
// `apply_snapshot` and acts on the returned outcome (play audio, publish the
// view). Novelty is decided by id membership in the previous snapshot, never
// by timestamp.

use std::collections::HashSet;

use crate::api::models::Alert;

/// Per-event notification state. Lives only as long as the console does.
#[derive(Debug, Default)]
pub struct NotificationSession {
    /// Ids whose siren has already been triggered in this snooze window.
    known_alert_ids: HashSet<String>,
    /// Last successfully fetched snapshot.
    previous_snapshot: Vec<Alert>,
    /// The SOS currently presented to the operator.
    latest_alert: Option<Alert>,
}

/// What changed when a snapshot was applied.
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    /// SOS alerts absent from the previous snapshot.
    pub new_sos: Vec<Alert>,
    /// Ids that should ring the siren now (new SOS not yet in the snooze set).
    pub audio_triggers: Vec<String>,
    /// Active alerts in the new snapshot.
    pub unread_count: usize,
    /// True when the presented alert was resolved or removed by this snapshot.
    pub latest_cleared: bool,
    /// True when the snapshot belonged to a torn-down poll and was ignored.
    pub stale: bool,
}

impl NotificationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `snapshot` against the previous one and update the session.
    ///
    /// The previous snapshot is replaced unconditionally, even when nothing
    /// new was found.
    pub fn apply_snapshot(&mut self, snapshot: Vec<Alert>) -> PollOutcome {
        let previous_ids: HashSet<&str> = self
            .previous_snapshot
            .iter()
            .map(|a| a.id.as_str())
            .collect();

        let new_sos: Vec<Alert> = snapshot
            .iter()
            .filter(|a| !previous_ids.contains(a.id.as_str()) && a.is_sos())
            .cloned()
            .collect();

        let mut audio_triggers = Vec::new();
        for alert in &new_sos {
            if self.known_alert_ids.insert(alert.id.clone()) {
                self.latest_alert = Some(alert.clone());
                audio_triggers.push(alert.id.clone());
            }
        }

        // Keep the presented alert in sync with the backend's view of it
        let mut latest_cleared = false;
        if let Some(latest) = self.latest_alert.take() {
            match snapshot.iter().find(|a| a.id == latest.id) {
                Some(current) if current.is_active() => self.latest_alert = Some(current.clone()),
                _ => latest_cleared = true,
            }
        }

        let unread_count = snapshot.iter().filter(|a| a.is_active()).count();
        self.previous_snapshot = snapshot;

        PollOutcome {
            new_sos,
            audio_triggers,
            unread_count,
            latest_cleared,
            stale: false,
        }
    }

    /// Local-only snooze: forget the presented alert and drop its id from
    /// the suppression set so a later re-detection can ring again.
    pub fn dismiss(&mut self, alert_id: &str) {
        self.latest_alert = None;
        self.known_alert_ids.remove(alert_id);
    }

    /// Clear the presented alert if it is `alert_id`.
    pub fn clear_latest_if(&mut self, alert_id: &str) {
        if self.latest_alert.as_ref().is_some_and(|a| a.id == alert_id) {
            self.latest_alert = None;
        }
    }

    pub fn clear_latest(&mut self) {
        self.latest_alert = None;
    }

    /// Forget every triggered id (e.g. when the operator opens the alert list).
    pub fn clear_audio_tracking(&mut self) {
        self.known_alert_ids.clear();
    }

    pub fn is_known(&self, alert_id: &str) -> bool {
        self.known_alert_ids.contains(alert_id)
    }

    pub fn latest_alert(&self) -> Option<&Alert> {
        self.latest_alert.as_ref()
    }

    pub fn snapshot(&self) -> &[Alert] {
        &self.previous_snapshot
    }

    pub fn unread_count(&self) -> usize {
        self.previous_snapshot.iter().filter(|a| a.is_active()).count()
    }
}
