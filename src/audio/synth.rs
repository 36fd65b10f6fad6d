// Tone synthesis — renders the siren and chime into mono PCM buffers.
//
// Both tones are described as functions of time (frequency schedule plus
// gain envelope) so the shape can be tested without rendering audio. The
// render functions integrate phase per sample, which keeps the sine
// continuous while the frequency sweeps.

use std::f64::consts::TAU;
use std::time::Duration;

/// Output sample rate for rendered tones.
pub const SAMPLE_RATE: u32 = 22_050;

/// Siren voice A sweeps between these frequencies (Hz).
pub const SIREN_HIGH_BAND: (f64, f64) = (800.0, 1200.0);
/// Siren voice B sweeps between these frequencies (Hz), moving opposite to A.
pub const SIREN_LOW_BAND: (f64, f64) = (600.0, 400.0);
/// Seconds per sweep leg (one up or one down).
pub const SIREN_SWEEP_LEG: f64 = 0.5;
/// Seconds per gain pulse leg.
pub const SIREN_PULSE_LEG: f64 = 0.25;
pub const SIREN_GAIN_LOUD: f64 = 0.5;
pub const SIREN_GAIN_SOFT: f64 = 0.3;

pub const CHIME_DURATION: Duration = Duration::from_millis(300);
const CHIME_START_HZ: f64 = 440.0;
const CHIME_END_HZ: f64 = 880.0;
const CHIME_RISE_SECS: f64 = 0.1;
const CHIME_GAIN_START: f64 = 0.3;
const CHIME_GAIN_END: f64 = 0.01;

/// A rendered mono tone.
#[derive(Debug, Clone)]
pub struct ToneBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl ToneBuffer {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Exponential ramp from `from` to `to`; `progress` in 0..=1.
fn exp_ramp(from: f64, to: f64, progress: f64) -> f64 {
    from * (to / from).powf(progress)
}

fn linear_ramp(from: f64, to: f64, progress: f64) -> f64 {
    from + (to - from) * progress
}

/// Back-and-forth sweep: even legs go `start -> turn`, odd legs come back.
fn sweep(t: f64, (start, turn): (f64, f64), leg: f64) -> f64 {
    let legs = t.max(0.0) / leg;
    let progress = legs.fract();
    if (legs.floor() as u64) % 2 == 0 {
        exp_ramp(start, turn, progress)
    } else {
        exp_ramp(turn, start, progress)
    }
}

/// Instantaneous frequencies of the two siren voices at `t` seconds.
pub fn siren_frequencies(t: f64) -> (f64, f64) {
    (
        sweep(t, SIREN_HIGH_BAND, SIREN_SWEEP_LEG),
        sweep(t, SIREN_LOW_BAND, SIREN_SWEEP_LEG),
    )
}

/// Siren gain at `t`: linear pulses between loud and soft every 250 ms.
pub fn siren_gain(t: f64) -> f64 {
    let legs = t.max(0.0) / SIREN_PULSE_LEG;
    let progress = legs.fract();
    if (legs.floor() as u64) % 2 == 0 {
        linear_ramp(SIREN_GAIN_LOUD, SIREN_GAIN_SOFT, progress)
    } else {
        linear_ramp(SIREN_GAIN_SOFT, SIREN_GAIN_LOUD, progress)
    }
}

/// Chime frequency: rises 440 -> 880 Hz over 100 ms, then holds.
pub fn chime_frequency(t: f64) -> f64 {
    if t >= CHIME_RISE_SECS {
        CHIME_END_HZ
    } else {
        exp_ramp(CHIME_START_HZ, CHIME_END_HZ, t.max(0.0) / CHIME_RISE_SECS)
    }
}

/// Chime gain: exponential decay 0.3 -> 0.01 over the whole chime.
pub fn chime_gain(t: f64) -> f64 {
    let total = CHIME_DURATION.as_secs_f64();
    exp_ramp(CHIME_GAIN_START, CHIME_GAIN_END, (t / total).clamp(0.0, 1.0))
}

/// Render the two-tone siren for `duration`.
///
/// The voices are summed at half amplitude each, so the output never
/// exceeds the envelope gain.
pub fn render_siren(duration: Duration, sample_rate: u32) -> ToneBuffer {
    let total = (duration.as_secs_f64() * sample_rate as f64).round() as usize;
    let step = 1.0 / sample_rate as f64;
    let mut samples = Vec::with_capacity(total);
    let (mut phase_a, mut phase_b) = (0.0f64, 0.0f64);

    for n in 0..total {
        let t = n as f64 * step;
        let (freq_a, freq_b) = siren_frequencies(t);
        let mixed = 0.5 * (phase_a.sin() + phase_b.sin());
        samples.push((mixed * siren_gain(t)) as f32);

        phase_a = (phase_a + TAU * freq_a * step) % TAU;
        phase_b = (phase_b + TAU * freq_b * step) % TAU;
    }

    ToneBuffer {
        samples,
        sample_rate,
    }
}

/// Render the short notification chime.
pub fn render_chime(sample_rate: u32) -> ToneBuffer {
    let total = (CHIME_DURATION.as_secs_f64() * sample_rate as f64).round() as usize;
    let step = 1.0 / sample_rate as f64;
    let mut samples = Vec::with_capacity(total);
    let mut phase = 0.0f64;

    for n in 0..total {
        let t = n as f64 * step;
        samples.push((phase.sin() * chime_gain(t)) as f32);
        phase = (phase + TAU * chime_frequency(t) * step) % TAU;
    }

    ToneBuffer {
        samples,
        sample_rate,
    }
}
