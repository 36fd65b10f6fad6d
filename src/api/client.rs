// HTTP client for the crowd-management REST API.
//
// A thin reqwest wrapper with one helper per HTTP verb. The `AlertApi` trait
// sits in front of it so the poller and dispatcher can be driven by an
// in-memory fake in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::models::{
    Alert, AlertStats, AssignRequest, ResolveRequest, ResponseValue, SosTrigger, TriggerResponse,
};

/// Default API root when `CROWDWATCH_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// The calls this console issues against the crowd-management backend.
#[async_trait]
pub trait AlertApi: Send + Sync {
    /// All alerts for an event, any status.
    async fn list_alerts(&self, event_id: &str) -> Result<Vec<Alert>>;

    /// Only the active alerts for an event.
    async fn list_active_alerts(&self, event_id: &str) -> Result<Vec<Alert>>;

    /// Mark an alert resolved, optionally recording the operator's response.
    async fn resolve_alert(&self, alert_id: &str, response: Option<&ResponseValue>) -> Result<()>;

    /// Remove an alert entirely (management list only).
    async fn delete_alert(&self, alert_id: &str) -> Result<()>;

    async fn alert_stats(&self, event_id: &str) -> Result<AlertStats>;

    async fn assign_alert(&self, alert_id: &str, admin_id: &str, admin_name: &str) -> Result<()>;

    /// Raise an SOS on behalf of an attendee. Returns the new alert id.
    async fn trigger_sos(&self, event_id: &str, trigger: &SosTrigger) -> Result<String>;
}

/// reqwest-backed implementation of `AlertApi`.
pub struct HttpAlertApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAlertApi {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("crowdwatch/0.1 (sos-console)")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path = path, "GET request");

        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        parse_json(response, path).await
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        debug!(path = path, method = %method, "JSON request");

        let response = self
            .client
            .request(method.clone(), self.url(path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{method} {path} failed"))?;

        parse_json(response, path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        debug!(path = path, "DELETE request");

        let response = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .with_context(|| format!("DELETE {path} failed"))?;

        ensure_success(response, path).await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response, path: &str) -> Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{path} returned {status}: {body}");
    }
    Ok(response)
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
    ensure_success(response, path)
        .await?
        .json::<T>()
        .await
        .with_context(|| format!("Failed to deserialize {path} response"))
}

#[async_trait]
impl AlertApi for HttpAlertApi {
    async fn list_alerts(&self, event_id: &str) -> Result<Vec<Alert>> {
        // The backend may answer with null for an event that never had alerts
        let alerts: Option<Vec<Alert>> = self
            .get_json(&format!("admin/events/{event_id}/alerts"))
            .await?;
        Ok(alerts.unwrap_or_default())
    }

    async fn list_active_alerts(&self, event_id: &str) -> Result<Vec<Alert>> {
        let alerts: Option<Vec<Alert>> = self
            .get_json(&format!("admin/events/{event_id}/alerts/active"))
            .await?;
        Ok(alerts.unwrap_or_default())
    }

    async fn resolve_alert(&self, alert_id: &str, response: Option<&ResponseValue>) -> Result<()> {
        let body = ResolveRequest {
            status: "resolved",
            response,
        };
        let _: serde_json::Value = self
            .send_json(
                reqwest::Method::PUT,
                &format!("admin/alerts/{alert_id}/resolve"),
                &body,
            )
            .await?;
        Ok(())
    }

    async fn delete_alert(&self, alert_id: &str) -> Result<()> {
        self.delete(&format!("admin/alerts/{alert_id}")).await
    }

    async fn alert_stats(&self, event_id: &str) -> Result<AlertStats> {
        self.get_json(&format!("admin/alerts/stats/{event_id}"))
            .await
    }

    async fn assign_alert(&self, alert_id: &str, admin_id: &str, admin_name: &str) -> Result<()> {
        let body = AssignRequest {
            admin_id,
            admin_name,
        };
        let _: serde_json::Value = self
            .send_json(
                reqwest::Method::POST,
                &format!("admin/alerts/{alert_id}/assign"),
                &body,
            )
            .await?;
        Ok(())
    }

    async fn trigger_sos(&self, event_id: &str, trigger: &SosTrigger) -> Result<String> {
        let resp: TriggerResponse = self
            .send_json(
                reqwest::Method::POST,
                &format!("events/{event_id}/sos"),
                trigger,
            )
            .await?;
        Ok(resp.alert_id)
    }
}
