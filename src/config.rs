use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::audio::engine::MAX_WARNING_DURATION;

/// Where warning tones and chimes are sent.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioBackend {
    /// Terminal bell (default) — works over SSH, no device needed
    Bell,
    /// Write each tone to a WAV file under `wav_dir`
    Wav,
    /// No audio; every cue is a logged no-op
    None,
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
pub struct Config {
    /// Root of the crowd-management API (defaults to http://localhost:8000/api).
    pub api_url: String,
    /// Period between alert fetches while watching an event.
    pub poll_interval: Duration,
    /// How long the SOS siren sounds for each new alert.
    pub warning_duration: Duration,
    pub audio_backend: AudioBackend,
    /// Directory for rendered tones when the WAV backend is selected.
    pub wav_dir: PathBuf,
    /// Operator identity used when assigning alerts.
    pub admin_id: String,
    pub admin_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the operator identity, which only
    /// `assign` needs.
    pub fn load() -> Result<Self> {
        let audio_backend = match env::var("CROWDWATCH_AUDIO").as_deref() {
            Ok("none") | Ok("off") => AudioBackend::None,
            Ok("wav") => AudioBackend::Wav,
            // "bell" or unset both default to the terminal bell
            _ => AudioBackend::Bell,
        };

        let poll_ms: u64 = parse_var("CROWDWATCH_POLL_INTERVAL_MS", 2000)?;
        let warning_ms: u64 = parse_var("CROWDWATCH_WARNING_MS", 5000)?;
        if poll_ms == 0 {
            anyhow::bail!("CROWDWATCH_POLL_INTERVAL_MS must be greater than zero");
        }
        let warning_duration = warning_duration(warning_ms)?;

        Ok(Self {
            api_url: env::var("CROWDWATCH_API_URL")
                .unwrap_or_else(|_| crate::api::client::DEFAULT_API_URL.to_string()),
            poll_interval: Duration::from_millis(poll_ms),
            warning_duration,
            audio_backend,
            wav_dir: env::var("CROWDWATCH_WAV_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./crowdwatch-audio")),
            admin_id: env::var("CROWDWATCH_ADMIN_ID").unwrap_or_default(),
            admin_name: env::var("CROWDWATCH_ADMIN_NAME").unwrap_or_default(),
        })
    }

    /// Check that the operator identity is configured.
    /// Call this before assigning alerts.
    pub fn require_admin(&self) -> Result<()> {
        if self.admin_id.is_empty() || self.admin_name.is_empty() {
            anyhow::bail!(
                "CROWDWATCH_ADMIN_ID and CROWDWATCH_ADMIN_NAME must be set to assign alerts.\n\
                 Add them to your .env file."
            );
        }
        Ok(())
    }
}

/// Validate a siren length given in milliseconds.
pub fn warning_duration(ms: u64) -> Result<Duration> {
    let duration = Duration::from_millis(ms);
    if duration > MAX_WARNING_DURATION {
        anyhow::bail!(
            "Siren length must be at most {} ms, got {ms}",
            MAX_WARNING_DURATION.as_millis()
        );
    }
    Ok(duration)
}

/// Parse an optional numeric env var, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
