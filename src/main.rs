use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use crowdwatch::api::client::{AlertApi, HttpAlertApi};
use crowdwatch::api::models::{QuickAction, ResponseValue, SosTrigger};
use crowdwatch::audio::output::{AudioOutput, BellOutput, NullOutput, WavFileOutput};
use crowdwatch::audio::AudioEngine;
use crowdwatch::config::{AudioBackend, Config};
use crowdwatch::sos::dispatcher::ResponseDispatcher;
use crowdwatch::sos::poller::{AlertPoller, PollerSettings};

/// Crowdwatch: SOS alert console for crowd-management events.
///
/// Watches an event's alerts, sounds a siren when an attendee raises an SOS,
/// and sends the operator's response back to the crowd-management API.
#[derive(Parser)]
#[command(name = "crowdwatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch an event and respond to SOS alerts interactively
    Watch {
        /// The event to watch
        event_id: String,
    },

    /// List an event's alerts
    Alerts {
        event_id: String,

        /// Only show active alerts
        #[arg(long)]
        active: bool,
    },

    /// Show alert statistics for an event
    Stats { event_id: String },

    /// Resolve an alert
    Resolve {
        alert_id: String,

        /// Response to record: 0-100, an action (acknowledged, dispatching_help,
        /// view_map, call), or free text
        #[arg(long)]
        response: Option<String>,
    },

    /// Delete an alert
    Delete { alert_id: String },

    /// Assign an alert to the configured operator
    Assign { alert_id: String },

    /// Raise an SOS on behalf of an attendee (for drills and testing)
    Trigger {
        event_id: String,

        #[arg(long)]
        user_id: String,

        #[arg(long, default_value = "Unknown")]
        user_name: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        #[arg(long)]
        description: Option<String>,
    },

    /// Play the SOS siren through the configured audio backend
    Siren {
        /// Siren length in milliseconds (default: CROWDWATCH_WARNING_MS)
        #[arg(long)]
        duration_ms: Option<u64>,
    },

    /// Play the notification chime through the configured audio backend
    Chime,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crowdwatch=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Watch { event_id } => {
            let api: Arc<dyn AlertApi> = Arc::new(HttpAlertApi::new(&config.api_url)?);
            let audio = build_audio(&config);
            let settings = PollerSettings {
                interval: config.poll_interval,
                warning_duration: config.warning_duration,
            };

            info!(api = %config.api_url, event_id = %event_id, "Starting console");

            let poller = AlertPoller::new(api, audio, settings);
            let dispatcher = ResponseDispatcher::new(poller.clone());
            crowdwatch::console::Console::new(poller, dispatcher)
                .run(&event_id)
                .await?;
        }

        Commands::Alerts { event_id, active } => {
            let api = HttpAlertApi::new(&config.api_url)?;
            let alerts = if active {
                api.list_active_alerts(&event_id).await?
            } else {
                api.list_alerts(&event_id).await?
            };
            crowdwatch::output::terminal::display_alert_list(&alerts);
        }

        Commands::Stats { event_id } => {
            let api = HttpAlertApi::new(&config.api_url)?;
            let stats = api.alert_stats(&event_id).await?;
            crowdwatch::output::terminal::display_stats(&stats);
        }

        Commands::Resolve { alert_id, response } => {
            let api = HttpAlertApi::new(&config.api_url)?;
            let response = response.as_deref().map(parse_response);
            api.resolve_alert(&alert_id, response.as_ref()).await?;
            println!("Alert {} marked as {}", alert_id.bold(), "resolved".green());
        }

        Commands::Delete { alert_id } => {
            let api = HttpAlertApi::new(&config.api_url)?;
            api.delete_alert(&alert_id).await?;
            println!("Alert {} deleted", alert_id.bold());
        }

        Commands::Assign { alert_id } => {
            config.require_admin()?;
            let api = HttpAlertApi::new(&config.api_url)?;
            api.assign_alert(&alert_id, &config.admin_id, &config.admin_name)
                .await?;
            println!(
                "Alert {} assigned to {}",
                alert_id.bold(),
                config.admin_name.bold()
            );
        }

        Commands::Trigger {
            event_id,
            user_id,
            user_name,
            lat,
            lng,
            description,
        } => {
            let api = HttpAlertApi::new(&config.api_url)?;
            let trigger = SosTrigger {
                user_id,
                user_name,
                lat,
                lng,
                description,
            };
            let alert_id = api.trigger_sos(&event_id, &trigger).await?;
            println!("SOS alert {} raised for event {}", alert_id.bold(), event_id);
        }

        Commands::Siren { duration_ms } => {
            let duration = match duration_ms {
                Some(ms) => crowdwatch::config::warning_duration(ms)?,
                None => config.warning_duration,
            };
            let audio = build_audio(&config);
            println!("Playing siren for {:.1}s...", duration.as_secs_f64());
            audio.play_warning(duration);
            tokio::time::sleep(duration).await;
            audio.stop();
        }

        Commands::Chime => {
            let audio = build_audio(&config);
            audio.play_chime();
            tokio::time::sleep(crowdwatch::audio::synth::CHIME_DURATION).await;
        }
    }

    Ok(())
}

/// Create the audio engine for the configured backend.
fn build_audio(config: &Config) -> AudioEngine {
    let output: Arc<dyn AudioOutput> = match config.audio_backend {
        AudioBackend::Bell => Arc::new(BellOutput::new()),
        AudioBackend::Wav => Arc::new(WavFileOutput::new(&config.wav_dir)),
        AudioBackend::None => Arc::new(NullOutput),
    };
    AudioEngine::new(output)
}

/// Interpret a `--response` argument: a 0-100 completion, a named action,
/// or free text.
fn parse_response(raw: &str) -> ResponseValue {
    if let Ok(v) = raw.parse::<u8>() {
        if v <= 100 {
            return ResponseValue::Completion(v);
        }
    }
    match raw.parse::<QuickAction>() {
        Ok(action) => ResponseValue::Action(action),
        Err(_) => ResponseValue::Note(raw.to_string()),
    }
}
