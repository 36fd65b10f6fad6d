// Audio cue engine — single-flight warning siren plus fire-and-forget chime.
//
// The engine is an explicitly owned resource: the poller, overlay driver and
// dispatcher each hold a clone of the same `AudioEngine` rather than reaching
// for a global. At most one warning tone is active at a time; starting a new
// one always stops the previous one first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::output::{AudioOutput, Playback};
use super::synth::{self, SAMPLE_RATE};

/// Default length of the SOS warning siren.
pub const DEFAULT_WARNING_DURATION: Duration = Duration::from_millis(5000);
/// Longest warning tone the engine will render. Longer requests are cut.
pub const MAX_WARNING_DURATION: Duration = Duration::from_secs(60);

/// Shared handle to the audio device. Clones refer to the same engine.
#[derive(Clone)]
pub struct AudioEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    output: Arc<dyn AudioOutput>,
    sample_rate: u32,
    active: Mutex<Option<ActiveTone>>,
    next_id: AtomicU64,
}

/// The warning tone currently sounding.
struct ActiveTone {
    id: u64,
    playback: Box<dyn Playback>,
    /// Timer that ends the tone at its natural duration.
    expiry: Option<JoinHandle<()>>,
}

impl EngineInner {
    fn active(&self) -> MutexGuard<'_, Option<ActiveTone>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// End tone `id` if it is still the active one.
    fn expire(&self, id: u64) {
        let finished = {
            let mut active = self.active();
            match active.as_ref() {
                Some(tone) if tone.id == id => active.take(),
                _ => None,
            }
        };
        if let Some(mut tone) = finished {
            tone.playback.stop();
            debug!(tone = id, "Warning tone finished");
        }
    }
}

impl AudioEngine {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self::with_sample_rate(output, SAMPLE_RATE)
    }

    pub fn with_sample_rate(output: Arc<dyn AudioOutput>, sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                output,
                sample_rate,
                active: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Play the two-tone siren for `duration` (at most
    /// `MAX_WARNING_DURATION`), replacing any tone already
    /// sounding. Device errors are logged and leave the engine idle.
    pub fn play_warning(&self, duration: Duration) {
        self.stop();
        let duration = duration.min(MAX_WARNING_DURATION);

        let tone = synth::render_siren(duration, self.inner.sample_rate);
        let playback = match self.inner.output.start(tone) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Audio unavailable, skipping warning tone");
                return;
            }
        };

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        // Without a runtime there's no timer; the tone then ends on stop().
        let expiry = tokio::runtime::Handle::try_current().ok().map(|rt| {
            let weak = Arc::downgrade(&self.inner);
            rt.spawn(async move {
                tokio::time::sleep(duration).await;
                if let Some(inner) = weak.upgrade() {
                    inner.expire(id);
                }
            })
        });

        let replaced = self.inner.active().replace(ActiveTone {
            id,
            playback,
            expiry,
        });

        // Another clone raced us between stop() and here; keep only ours.
        if let Some(mut old) = replaced {
            old.playback.stop();
            if let Some(timer) = old.expiry {
                timer.abort();
            }
        }

        debug!(tone = id, duration_ms = duration.as_millis() as u64, "Warning tone started");
    }

    /// Play the short notification chime. Independent of the warning tone.
    pub fn play_chime(&self) {
        let tone = synth::render_chime(self.inner.sample_rate);
        if let Err(e) = self.inner.output.start(tone) {
            warn!(error = %e, "Audio unavailable, skipping chime");
        }
    }

    /// Silence the warning tone. A no-op when nothing is playing.
    pub fn stop(&self) {
        let current = self.inner.active().take();
        if let Some(mut tone) = current {
            tone.playback.stop();
            if let Some(timer) = tone.expiry {
                timer.abort();
            }
            debug!(tone = tone.id, "Warning tone stopped");
        }
    }

    /// True while a warning tone is sounding.
    pub fn is_playing(&self) -> bool {
        self.inner.active().is_some()
    }
}
