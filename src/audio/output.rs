// Audio output devices — where rendered tones go.
//
// The engine only talks to `AudioOutput`. Which device backs it is a config
// choice (CROWDWATCH_AUDIO): the terminal bell, a WAV file per tone, or
// nothing at all.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::debug;

use super::synth::ToneBuffer;

/// A sound that has started playing on some device.
pub trait Playback: Send {
    /// Silence the sound and release the device. Must be safe to call twice.
    fn stop(&mut self);
}

/// A device that can start playing a rendered tone.
///
/// Dropping the returned `Playback` does NOT stop the sound; only `stop()`
/// does. Fire-and-forget tones (the chime) rely on this.
pub trait AudioOutput: Send + Sync {
    fn start(&self, tone: ToneBuffer) -> Result<Box<dyn Playback>>;
}

/// Output that reports the device as missing. Every start fails.
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn start(&self, _tone: ToneBuffer) -> Result<Box<dyn Playback>> {
        anyhow::bail!("No audio output device configured")
    }
}

/// Rings the terminal bell for as long as the tone lasts.
///
/// Terminals can't play arbitrary PCM, so this rings once per `period` and
/// stops ringing when the tone ends or is stopped.
pub struct BellOutput {
    period: Duration,
}

impl BellOutput {
    pub fn new() -> Self {
        Self {
            period: Duration::from_millis(500),
        }
    }
}

impl Default for BellOutput {
    fn default() -> Self {
        Self::new()
    }
}

struct BellPlayback {
    task: Option<JoinHandle<()>>,
}

impl Playback for BellPlayback {
    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl AudioOutput for BellOutput {
    fn start(&self, tone: ToneBuffer) -> Result<Box<dyn Playback>> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("Terminal bell needs a running tokio runtime")?;
        let rings = (tone.duration().as_secs_f64() / self.period.as_secs_f64())
            .ceil()
            .max(1.0) as u32;
        let period = self.period;

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            for _ in 0..rings {
                ticker.tick().await;
                let mut stderr = std::io::stderr();
                if stderr.write_all(b"\x07").and_then(|_| stderr.flush()).is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(BellPlayback { task: Some(task) }))
    }
}

/// Writes each tone to a 16-bit mono WAV file, for offline inspection.
pub struct WavFileOutput {
    dir: PathBuf,
    counter: AtomicU64,
}

impl WavFileOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicU64::new(0),
        }
    }
}

/// Nothing to stop: the file is complete once `start` returns.
struct FinishedPlayback;

impl Playback for FinishedPlayback {
    fn stop(&mut self) {}
}

impl AudioOutput for WavFileOutput {
    fn start(&self, tone: ToneBuffer) -> Result<Box<dyn Playback>> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
        let path = self.dir.join(format!("tone-{stamp}-{n:03}.wav"));

        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_wav(&mut writer, &tone)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(path = %path.display(), samples = tone.samples.len(), "Wrote tone");
        Ok(Box::new(FinishedPlayback))
    }
}

/// Encode a tone as a PCM16 mono RIFF/WAVE stream.
pub fn write_wav<W: Write>(out: &mut W, tone: &ToneBuffer) -> std::io::Result<()> {
    const BITS: u16 = 16;
    const CHANNELS: u16 = 1;
    let block_align = CHANNELS * BITS / 8;
    let byte_rate = tone.sample_rate * block_align as u32;
    let data_len = (tone.samples.len() * block_align as usize) as u32;

    out.write_all(b"RIFF")?;
    out.write_all(&(36 + data_len).to_le_bytes())?;
    out.write_all(b"WAVE")?;

    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?; // PCM
    out.write_all(&CHANNELS.to_le_bytes())?;
    out.write_all(&tone.sample_rate.to_le_bytes())?;
    out.write_all(&byte_rate.to_le_bytes())?;
    out.write_all(&block_align.to_le_bytes())?;
    out.write_all(&BITS.to_le_bytes())?;

    out.write_all(b"data")?;
    out.write_all(&data_len.to_le_bytes())?;
    for sample in &tone.samples {
        let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.write_all(&pcm.to_le_bytes())?;
    }
    out.flush()
}
