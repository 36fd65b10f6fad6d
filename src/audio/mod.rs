// Audio cues — siren and chime synthesis, output devices, and the
// single-flight engine that owns the active tone.

pub mod engine;
pub mod output;
pub mod synth;

pub use engine::AudioEngine;
