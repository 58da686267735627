//! # Playback Module
//!
//! Reassemble streamed PCM chunks into continuous audio on a real-time clock.
//!
//! ## Sub-modules
//! - `state` - Playback finite-state machine (Stopped, Loading, Playing, Paused)
//! - `sink` - The [`AudioSink`] seam plus a recording implementation
//! - `scheduler` - Priming, gapless back-to-back scheduling and underrun recovery
//! - `shared` - Lock-serialized handle for concurrent chunk handlers
//!
//! ## Example
//! ```rust
//! use pianodj::config::SessionConfig;
//! use pianodj::pcm::{bytes_to_base64, float32_to_pcm16};
//! use pianodj::playback::{ChunkOutcome, PlaybackScheduler, PlaybackState, RecordingSink};
//!
//! let config = SessionConfig::default();
//! let mut scheduler = PlaybackScheduler::new(&config);
//! let mut sink = RecordingSink::new(10.0);
//!
//! scheduler.play(&mut sink).unwrap();
//!
//! // 0.5 s of stereo silence at 48 kHz
//! let payload = bytes_to_base64(&float32_to_pcm16(&vec![0.0; 48_000]));
//! let outcome = scheduler.handle_chunk(&payload, &mut sink);
//!
//! // First chunk starts after the 2 s priming delay
//! assert_eq!(
//!     outcome,
//!     ChunkOutcome::Scheduled { start_at: 12.0, duration: 0.5, primed: true }
//! );
//! assert_eq!(scheduler.state(), PlaybackState::Loading);
//!
//! // Audible once the priming delay has elapsed
//! assert_eq!(scheduler.tick(12.0), Some(PlaybackState::Playing));
//! ```
//!
//! ## Timing Rules
//!
//! - `next_start_time == 0` means "not primed"; the next chunk starts at
//!   `now + buffer_time`.
//! - Each scheduled chunk advances `next_start_time` by its duration, so
//!   chunks are back-to-back with no gap and no overlap.
//! - A chunk arriving when `next_start_time < now` is an underrun: dropped,
//!   state back to Loading, clock reset.
//! - Chunks arriving while Stopped or Paused are dropped, never queued.

mod scheduler;
mod shared;
mod sink;
mod state;


pub use scheduler::{ChunkOutcome, PlaybackScheduler};
pub use shared::SharedScheduler;
pub use sink::{AudioSink, GainRamp, RecordingSink, ScheduledStart};
pub use state::{PlaybackEvent, PlaybackState};
