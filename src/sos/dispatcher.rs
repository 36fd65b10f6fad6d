// Response dispatcher — sends operator decisions to the API and reconciles
// local state afterwards.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::poller::AlertPoller;
use crate::api::client::AlertApi;
use crate::api::models::ResponseValue;

#[derive(Clone)]
pub struct ResponseDispatcher {
    api: Arc<dyn AlertApi>,
    poller: AlertPoller,
}

impl ResponseDispatcher {
    pub fn new(poller: AlertPoller) -> Self {
        Self {
            api: poller.api(),
            poller,
        }
    }

    /// Resolve `alert_id` with the operator's response.
    ///
    /// On success the siren stops, the alert leaves the overlay, and the
    /// poller re-fetches immediately. On failure nothing local changes and
    /// `false` comes back so the caller can offer a retry.
    pub async fn respond(&self, alert_id: &str, value: ResponseValue) -> bool {
        if let Err(e) = self.api.resolve_alert(alert_id, Some(&value)).await {
            warn!(alert_id = alert_id, error = %e, "Failed to submit alert response");
            return false;
        }

        info!(alert_id = alert_id, response = %value, "Alert response submitted");
        self.poller.audio().stop();
        self.poller.clear_latest_if(alert_id);
        self.refresh().await;
        true
    }

    /// Local-only snooze; see `AlertPoller::dismiss`.
    pub fn dismiss(&self, alert_id: &str) {
        self.poller.dismiss(alert_id);
    }

    /// Remove an alert from the backend (management list, not the popup).
    pub async fn delete(&self, alert_id: &str) -> Result<()> {
        self.api.delete_alert(alert_id).await?;
        info!(alert_id = alert_id, "Alert deleted");
        self.refresh().await;
        Ok(())
    }

    pub async fn assign(&self, alert_id: &str, admin_id: &str, admin_name: &str) -> Result<()> {
        self.api.assign_alert(alert_id, admin_id, admin_name).await?;
        info!(alert_id = alert_id, admin_id = admin_id, "Alert assigned");
        self.refresh().await;
        Ok(())
    }

    async fn refresh(&self) {
        if !self.poller.is_polling() {
            return;
        }
        if let Err(e) = self.poller.refresh().await {
            debug!(error = %e, "Post-response refresh failed");
        }
    }
}
