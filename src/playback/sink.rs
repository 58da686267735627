//! Output audio sink seam.

use serde::Serialize;

use crate::pcm::AudioBuffer;

/// The real-time audio graph the scheduler writes into.
///
/// Implemented by the host (a Web Audio context behind the wasm bindings,
/// or [`RecordingSink`] in tests and instruction-queue hosts).
pub trait AudioSink {
    /// Current time of the audio clock, in seconds.
    fn current_time(&self) -> f64;

    /// Connect `buffer` to the output and start it at `at` seconds.
    fn start(&mut self, buffer: AudioBuffer, at: f64);

    /// Ramp the output gain to `target` starting at `at` seconds.
    fn ramp_gain(&mut self, target: f32, at: f64);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledStart {
    pub at: f64,
    pub buffer: AudioBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GainRamp {
    pub target: f32,
    pub at: f64,
}

/// A sink with a manually driven clock that records every instruction.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    now: f64,
    starts: Vec<ScheduledStart>,
    gain_ramps: Vec<GainRamp>,
}

impl RecordingSink {
    pub fn new(now: f64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    pub fn set_time(&mut self, now: f64) {
        self.now = now;
    }

    pub fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }

    pub fn starts(&self) -> &[ScheduledStart] {
        &self.starts
    }

    pub fn start_times(&self) -> Vec<f64> {
        self.starts.iter().map(|s| s.at).collect()
    }

    pub fn gain_ramps(&self) -> &[GainRamp] {
        &self.gain_ramps
    }

    /// Hand over everything recorded so far.
    pub fn drain(&mut self) -> (Vec<ScheduledStart>, Vec<GainRamp>) {
        (
            std::mem::take(&mut self.starts),
            std::mem::take(&mut self.gain_ramps),
        )
    }
}

impl AudioSink for RecordingSink {
    fn current_time(&self) -> f64 {
        self.now
    }

    fn start(&mut self, buffer: AudioBuffer, at: f64) {
        self.starts.push(ScheduledStart { at, buffer });
    }

    fn ramp_gain(&mut self, target: f32, at: f64) {
        self.gain_ramps.push(GainRamp { target, at });
    }
}
