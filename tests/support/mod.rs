// In-memory fakes shared by the integration tests.
//
// FakeApi plays the backend: it serves per-event snapshots, records resolve
// calls, and marks resolved alerts the way the real API does.
// RecordingOutput counts tone starts and stops instead of making noise.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crowdwatch::api::client::AlertApi;
use crowdwatch::api::models::{Alert, AlertStats, AlertStatus, ResponseValue, SosTrigger};
use crowdwatch::audio::output::{AudioOutput, Playback};
use crowdwatch::audio::synth::ToneBuffer;
use crowdwatch::audio::AudioEngine;

pub fn alert(id: &str, alert_type: &str, status: AlertStatus) -> Alert {
    Alert {
        id: id.to_string(),
        event_id: Some("evt".to_string()),
        alert_type: alert_type.to_string(),
        status,
        user_id: Some(format!("user-{id}")),
        user_name: Some("Asha".to_string()),
        lat: Some(12.9716),
        lng: Some(77.5946),
        description: None,
        created_at: Some("2026-03-01T18:22:05".to_string()),
        resolved_at: None,
        response: None,
        assigned_to: None,
        assigned_name: None,
    }
}

pub fn sos(id: &str) -> Alert {
    alert(id, "sos", AlertStatus::Active)
}

#[derive(Default)]
pub struct FakeApi {
    alerts: Mutex<HashMap<String, Vec<Alert>>>,
    fail_lists: AtomicUsize,
    fail_resolve: AtomicBool,
    delay: Mutex<Option<Duration>>,
    pub list_calls: AtomicUsize,
    pub resolve_calls: Mutex<Vec<(String, Option<ResponseValue>)>>,
    pub delete_calls: Mutex<Vec<String>>,
    pub assign_calls: Mutex<Vec<(String, String)>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_alerts(&self, event_id: &str, alerts: Vec<Alert>) {
        self.alerts
            .lock()
            .unwrap()
            .insert(event_id.to_string(), alerts);
    }

    /// Make the next `n` list calls fail.
    pub fn fail_next_lists(&self, n: usize) {
        self.fail_lists.store(n, Ordering::SeqCst);
    }

    pub fn fail_resolves(&self, fail: bool) {
        self.fail_resolve.store(fail, Ordering::SeqCst);
    }

    /// Delay every list call by `delay` (tokio time, so pausable).
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn resolves(&self) -> Vec<(String, Option<ResponseValue>)> {
        self.resolve_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertApi for FakeApi {
    async fn list_alerts(&self, event_id: &str) -> Result<Vec<Alert>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .fail_lists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("connection refused");
        }

        Ok(self
            .alerts
            .lock()
            .unwrap()
            .get(event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_active_alerts(&self, event_id: &str) -> Result<Vec<Alert>> {
        let all = self.list_alerts(event_id).await?;
        Ok(all.into_iter().filter(|a| a.is_active()).collect())
    }

    async fn resolve_alert(&self, alert_id: &str, response: Option<&ResponseValue>) -> Result<()> {
        self.resolve_calls
            .lock()
            .unwrap()
            .push((alert_id.to_string(), response.cloned()));
        if self.fail_resolve.load(Ordering::SeqCst) {
            anyhow::bail!("admin/alerts/{alert_id}/resolve returned 503 Service Unavailable");
        }

        let mut alerts = self.alerts.lock().unwrap();
        let found = alerts
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|a| a.id == alert_id);
        match found {
            Some(alert) => {
                alert.status = AlertStatus::Resolved;
                alert.response = response.map(serde_json::to_value).transpose()?;
                Ok(())
            }
            None => anyhow::bail!("Alert not found"),
        }
    }

    async fn delete_alert(&self, alert_id: &str) -> Result<()> {
        self.delete_calls.lock().unwrap().push(alert_id.to_string());
        for list in self.alerts.lock().unwrap().values_mut() {
            list.retain(|a| a.id != alert_id);
        }
        Ok(())
    }

    async fn alert_stats(&self, event_id: &str) -> Result<AlertStats> {
        let alerts = self.list_alerts(event_id).await?;
        let active = alerts.iter().filter(|a| a.is_active()).count() as u64;
        Ok(AlertStats {
            event_id: event_id.to_string(),
            total_alerts: alerts.len() as u64,
            active_alerts: active,
            resolved_alerts: alerts.len() as u64 - active,
            by_type: Default::default(),
        })
    }

    async fn assign_alert(&self, alert_id: &str, admin_id: &str, admin_name: &str) -> Result<()> {
        self.assign_calls
            .lock()
            .unwrap()
            .push((alert_id.to_string(), admin_id.to_string()));
        for alert in self.alerts.lock().unwrap().values_mut().flatten() {
            if alert.id == alert_id {
                alert.assigned_to = Some(admin_id.to_string());
                alert.assigned_name = Some(admin_name.to_string());
            }
        }
        Ok(())
    }

    async fn trigger_sos(&self, event_id: &str, trigger: &SosTrigger) -> Result<String> {
        let id = format!("sos-{}", trigger.user_id);
        let mut new_alert = sos(&id);
        new_alert.lat = Some(trigger.lat);
        new_alert.lng = Some(trigger.lng);
        self.alerts
            .lock()
            .unwrap()
            .entry(event_id.to_string())
            .or_default()
            .push(new_alert);
        Ok(id)
    }
}

/// Audio output that counts instead of playing.
#[derive(Default)]
pub struct RecordingOutput {
    pub starts: AtomicUsize,
    pub stops: Arc<AtomicUsize>,
    pub durations: Mutex<Vec<Duration>>,
}

struct RecordingPlayback {
    stops: Arc<AtomicUsize>,
    stopped: bool,
}

impl Playback for RecordingPlayback {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl AudioOutput for RecordingOutput {
    fn start(&self, tone: ToneBuffer) -> Result<Box<dyn Playback>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.durations.lock().unwrap().push(tone.duration());
        Ok(Box::new(RecordingPlayback {
            stops: Arc::clone(&self.stops),
            stopped: false,
        }))
    }
}

impl RecordingOutput {
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// An engine over a recording output, with a low sample rate to keep
/// rendering cheap.
pub fn recording_engine() -> (AudioEngine, Arc<RecordingOutput>) {
    let output = Arc::new(RecordingOutput::default());
    let engine = AudioEngine::with_sample_rate(output.clone(), 1_000);
    (engine, output)
}
