//! Gapless chunk scheduler
//!
//! Keeps a monotonically advancing `next_start_time` against the sink's
//! clock. The first chunk after (re)priming starts `buffer_time` seconds in
//! the future; every following chunk starts exactly where the previous one
//! ends. A chunk whose slot is already in the past is an underrun: it is
//! dropped and the next chunk primes afresh.

use tracing::{debug, info, warn};

use super::sink::AudioSink;
use super::state::{PlaybackEvent, PlaybackState};
use crate::config::SessionConfig;
use crate::error::PianoDjError;
use crate::pcm::{decode_chunk, AudioBuffer};

/// What happened to one incoming chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// Started on the sink at `start_at`. `primed` marks the first chunk
    /// after (re)priming.
    Scheduled {
        start_at: f64,
        duration: f64,
        primed: bool,
    },
    /// Arrived after its slot had passed; dropped, scheduler back to Loading.
    Underrun,
    /// Arrived while stopped or paused; dropped without decoding output.
    Ignored(PlaybackState),
    /// Payload could not be decoded; dropped, playback continues.
    Rejected(PianoDjError),
}

#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    state: PlaybackState,
    /// Zero means "not primed".
    next_start_time: f64,
    buffer_time: f64,
    sample_rate: u32,
    channels: usize,
    playing_deadline: Option<f64>,
}

impl PlaybackScheduler {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            state: PlaybackState::Stopped,
            next_start_time: 0.0,
            buffer_time: config.buffer_time_seconds,
            sample_rate: config.sample_rate,
            channels: config.channels,
            playing_deadline: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn buffer_time(&self) -> f64 {
        self.buffer_time
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Time at which the pending Loading→Playing transition fires, if armed.
    pub fn playing_deadline(&self) -> Option<f64> {
        self.playing_deadline
    }

    fn apply(&mut self, event: PlaybackEvent) -> Result<PlaybackState, PianoDjError> {
        let next = self.state.transition(event)?;
        if next != self.state {
            info!(from = ?self.state, to = ?next, ?event, "playback state changed");
        }
        self.state = next;
        Ok(next)
    }

    fn reset_clock(&mut self) {
        self.next_start_time = 0.0;
        self.playing_deadline = None;
    }

    /// Enter Loading and unmute; audio starts with the next chunk.
    pub fn play<S: AudioSink>(&mut self, sink: &mut S) -> Result<PlaybackState, PianoDjError> {
        let state = self.apply(PlaybackEvent::Play)?;
        self.reset_clock();
        sink.ramp_gain(1.0, sink.current_time());
        Ok(state)
    }

    /// Enter Paused, forget the clock and ramp the output down.
    pub fn pause<S: AudioSink>(&mut self, sink: &mut S) -> Result<PlaybackState, PianoDjError> {
        let state = self.apply(PlaybackEvent::Pause)?;
        self.reset_clock();
        sink.ramp_gain(0.0, sink.current_time());
        Ok(state)
    }

    /// Enter Stopped from any state. Calling it twice is the same as once.
    pub fn stop<S: AudioSink>(&mut self, sink: &mut S) -> PlaybackState {
        self.halt(PlaybackEvent::Stop, sink)
    }

    /// Connection failure: forced Stopped regardless of the current state.
    pub fn fail_transport<S: AudioSink>(&mut self, sink: &mut S) -> PlaybackState {
        self.halt(PlaybackEvent::TransportFailed, sink)
    }

    fn halt<S: AudioSink>(&mut self, event: PlaybackEvent, sink: &mut S) -> PlaybackState {
        // Stop and TransportFailed are legal from every state
        let state = self.state.transition(event).unwrap_or(PlaybackState::Stopped);
        if state != self.state {
            info!(from = ?self.state, ?event, "playback halted");
        }
        self.state = state;
        self.reset_clock();
        sink.ramp_gain(0.0, sink.current_time());
        state
    }

    /// Fire the deferred Loading→Playing transition once its deadline passed.
    ///
    /// Returns the new state when a transition happened.
    pub fn tick(&mut self, now: f64) -> Option<PlaybackState> {
        let deadline = self.playing_deadline?;
        if now < deadline {
            return None;
        }
        self.playing_deadline = None;
        self.apply(PlaybackEvent::Primed).ok()
    }

    /// Decode and schedule one base64 chunk.
    pub fn handle_chunk<S: AudioSink>(&mut self, payload: &str, sink: &mut S) -> ChunkOutcome {
        if !self.state.accepts_audio() {
            debug!(state = ?self.state, "audio chunk received while not playing, skipping");
            return ChunkOutcome::Ignored(self.state);
        }
        match decode_chunk(payload, self.sample_rate, self.channels) {
            Ok(buffer) => self.commit(buffer, sink),
            Err(err) => {
                warn!(%err, "dropping undecodable audio chunk");
                ChunkOutcome::Rejected(err)
            }
        }
    }

    /// Schedule an already decoded buffer.
    ///
    /// The state is checked here, immediately before anything reaches the
    /// sink, so a pause or stop that happened during decoding wins.
    pub fn commit<S: AudioSink>(&mut self, buffer: AudioBuffer, sink: &mut S) -> ChunkOutcome {
        if !self.state.accepts_audio() {
            debug!(state = ?self.state, "decoded chunk discarded, playback no longer active");
            return ChunkOutcome::Ignored(self.state);
        }

        let now = sink.current_time();
        self.tick(now);

        let primed = self.next_start_time == 0.0;
        if primed {
            self.next_start_time = now + self.buffer_time;
            if self.state == PlaybackState::Loading {
                self.playing_deadline = Some(self.next_start_time);
            }
            debug!(start_at = self.next_start_time, "first audio chunk, priming");
        }

        if self.next_start_time < now {
            warn!(
                next_start_time = self.next_start_time,
                now, "under run detected, resetting to loading"
            );
            // Underrun is legal from both accepting states
            let _ = self.apply(PlaybackEvent::Underrun);
            self.reset_clock();
            return ChunkOutcome::Underrun;
        }

        let start_at = self.next_start_time;
        let duration = buffer.duration_seconds();
        sink.start(buffer, start_at);
        self.next_start_time += duration;
        debug!(start_at, duration, next = self.next_start_time, "scheduled audio chunk");

        ChunkOutcome::Scheduled {
            start_at,
            duration,
            primed,
        }
    }
}
