// Alert poller — pull-based reconciliation loop over the alerts endpoint.
//
// One interval task per watched event. Each tick spawns its own fetch, so a
// hung request never delays the next tick; overlapping fetches are allowed
// and the last one to resolve wins. Every start, switch and stop bumps a
// generation counter, and a snapshot from an older generation is discarded.
//
// State is published through a `watch` channel so any number of presenters
// can follow it without touching the poller's lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::session::{NotificationSession, PollOutcome};
use crate::api::client::AlertApi;
use crate::api::models::Alert;
use crate::audio::AudioEngine;

/// Default period between alert fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Everything a presenter needs to render the current alert state.
#[derive(Debug, Clone, Default)]
pub struct AlertView {
    pub event_id: Option<String>,
    pub alerts: Vec<Alert>,
    /// Active alerts in the latest snapshot.
    pub unread_count: usize,
    pub latest_alert: Option<Alert>,
    pub polling: bool,
}

/// Timing knobs for the poller.
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    pub interval: Duration,
    pub warning_duration: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            warning_duration: crate::audio::engine::DEFAULT_WARNING_DURATION,
        }
    }
}

/// Shared handle to the poller. Clones drive the same loop.
#[derive(Clone)]
pub struct AlertPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    api: Arc<dyn AlertApi>,
    audio: AudioEngine,
    settings: PollerSettings,
    state: Mutex<PollerState>,
    view_tx: watch::Sender<AlertView>,
}

#[derive(Default)]
struct PollerState {
    event_id: Option<String>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    session: NotificationSession,
}

impl PollerState {
    fn view(&self) -> AlertView {
        AlertView {
            event_id: self.event_id.clone(),
            alerts: self.session.snapshot().to_vec(),
            unread_count: self.session.unread_count(),
            latest_alert: self.session.latest_alert().cloned(),
            polling: self.task.is_some(),
        }
    }
}

impl PollerInner {
    fn state(&self) -> MutexGuard<'_, PollerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, view: AlertView) {
        self.view_tx.send_replace(view);
    }

    /// Fetch once for `event_id` and apply the snapshot if `generation` is
    /// still current.
    async fn fetch(&self, event_id: &str, generation: u64) -> Result<PollOutcome> {
        let snapshot = self.api.list_alerts(event_id).await?;
        Ok(self.apply(event_id, generation, snapshot))
    }

    fn apply(&self, event_id: &str, generation: u64, snapshot: Vec<Alert>) -> PollOutcome {
        let (outcome, view) = {
            let mut state = self.state();
            if state.generation != generation {
                debug!(event_id = event_id, "Discarding snapshot from a stale poll");
                return PollOutcome {
                    stale: true,
                    ..PollOutcome::default()
                };
            }
            let outcome = state.session.apply_snapshot(snapshot);
            (outcome, state.view())
        };

        for alert_id in &outcome.audio_triggers {
            info!(event_id = event_id, alert_id = %alert_id, "New SOS alert");
            self.audio.play_warning(self.settings.warning_duration);
        }

        debug!(
            event_id = event_id,
            alerts = view.alerts.len(),
            unread = outcome.unread_count,
            "Applied alert snapshot"
        );
        self.publish(view);

        outcome
    }
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = state.task.take() {
            task.abort();
        }
        self.audio.stop();
    }
}

/// The interval loop. Neither the loop nor its in-flight fetches hold a
/// strong reference while waiting, so dropping the last `AlertPoller` tears
/// everything down even when the backend is slower than the interval.
async fn run_interval(
    inner: Weak<PollerInner>,
    api: Arc<dyn AlertApi>,
    event_id: String,
    generation: u64,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if inner.strong_count() == 0 {
            break;
        }
        let inner = inner.clone();
        let api = Arc::clone(&api);
        let event_id = event_id.clone();
        tokio::spawn(async move {
            let snapshot = match api.list_alerts(&event_id).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(event_id = %event_id, error = %e, "Alert fetch failed, retrying next tick");
                    return;
                }
            };
            // Poller gone while the request was out: drop the snapshot
            if let Some(poller) = inner.upgrade() {
                poller.apply(&event_id, generation, snapshot);
            }
        });
    }
}

impl AlertPoller {
    pub fn new(api: Arc<dyn AlertApi>, audio: AudioEngine, settings: PollerSettings) -> Self {
        let (view_tx, _) = watch::channel(AlertView::default());
        Self {
            inner: Arc::new(PollerInner {
                api,
                audio,
                settings,
                state: Mutex::new(PollerState::default()),
                view_tx,
            }),
        }
    }

    /// Start polling `event_id`: fetch now, then every interval.
    ///
    /// Calling again for the same event is a no-op. A different event tears
    /// the old loop down (silencing any siren) and starts fresh.
    pub fn start_polling(&self, event_id: &str) {
        let view = {
            let mut state = self.inner.state();
            if state.task.is_some() && state.event_id.as_deref() == Some(event_id) {
                return;
            }

            if let Some(old) = state.task.take() {
                old.abort();
                self.inner.audio.stop();
                info!(
                    from = state.event_id.as_deref().unwrap_or(""),
                    to = event_id,
                    "Switching watched event"
                );
            }

            state.generation += 1;
            state.event_id = Some(event_id.to_string());
            state.session = NotificationSession::new();
            state.task = Some(tokio::spawn(run_interval(
                Arc::downgrade(&self.inner),
                Arc::clone(&self.inner.api),
                event_id.to_string(),
                state.generation,
                self.inner.settings.interval,
            )));
            state.view()
        };

        info!(event_id = event_id, "Polling alerts");
        self.inner.publish(view);
    }

    /// Stop the interval and silence audio. Safe to call when idle.
    pub fn stop_polling(&self) {
        let view = {
            let mut state = self.inner.state();
            if let Some(task) = state.task.take() {
                task.abort();
                info!(event_id = state.event_id.as_deref().unwrap_or(""), "Stopped polling");
            }
            state.generation += 1;
            state.view()
        };
        self.inner.audio.stop();
        self.inner.publish(view);
    }

    /// Fetch immediately, outside the interval schedule.
    pub async fn refresh(&self) -> Result<PollOutcome> {
        let (event_id, generation) = {
            let state = self.inner.state();
            match (&state.event_id, &state.task) {
                (Some(id), Some(_)) => (id.clone(), state.generation),
                _ => anyhow::bail!("No event is being polled"),
            }
        };
        self.inner.fetch(&event_id, generation).await
    }

    /// Snooze: stop audio, clear the presented alert, and let `alert_id`
    /// ring again if it is re-detected later.
    pub fn dismiss(&self, alert_id: &str) {
        self.inner.audio.stop();
        let view = {
            let mut state = self.inner.state();
            state.session.dismiss(alert_id);
            state.view()
        };
        debug!(alert_id = alert_id, "Alert dismissed locally");
        self.inner.publish(view);
    }

    /// Clear the presented alert if it is `alert_id` (after a response lands).
    pub fn clear_latest_if(&self, alert_id: &str) {
        let view = {
            let mut state = self.inner.state();
            state.session.clear_latest_if(alert_id);
            state.view()
        };
        self.inner.publish(view);
    }

    /// Silence audio and hide the presented alert, keeping suppression.
    pub fn stop_sound(&self) {
        self.inner.audio.stop();
        let view = {
            let mut state = self.inner.state();
            state.session.clear_latest();
            state.view()
        };
        self.inner.publish(view);
    }

    /// Forget which alerts have already rung.
    pub fn clear_audio_tracking(&self) {
        self.inner.state().session.clear_audio_tracking();
    }

    pub fn is_known(&self, alert_id: &str) -> bool {
        self.inner.state().session.is_known(alert_id)
    }

    pub fn subscribe(&self) -> watch::Receiver<AlertView> {
        self.inner.view_tx.subscribe()
    }

    pub fn view(&self) -> AlertView {
        self.inner.state().view()
    }

    pub fn event_id(&self) -> Option<String> {
        self.inner.state().event_id.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.state().task.is_some()
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.inner.audio
    }

    pub fn api(&self) -> Arc<dyn AlertApi> {
        Arc::clone(&self.inner.api)
    }
}
