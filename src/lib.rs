//! # pianodj
//!
//! Core of the piano / prompt DJ app: Standard MIDI File import and
//! gapless playback of PCM audio streamed from a music generation service.
//!
//! ## Modules
//! - [`midi`] - SMF parsing and note event mapping
//! - [`pcm`] - Base64 and PCM16 conversions
//! - [`playback`] - Chunk scheduling state machine
//! - [`session`] - Transport, prompts and play/pause/reset handling
//! - [`melody`] - Melody analysis and prompt text
//! - [`config`] - Session configuration

pub mod api;
pub mod config;
pub mod error;
pub mod melody;
pub mod midi;
pub mod pcm;
pub mod playback;
pub mod session;

pub use api::{import_midi, import_midi_by_program, import_midi_with, ImportedMidi};
pub use config::{DensityMode, GenerationConfig, Scale, SessionConfig};
pub use error::*;
pub use melody::{melody_prompt, MelodyAnalysis};
pub use midi::{MidiFile, MidiNote, MidiTrack, NoteEvent};
pub use pcm::{create_blob, decode_chunk, AudioBuffer, PcmBlob};
pub use playback::{AudioSink, ChunkOutcome, PlaybackScheduler, PlaybackState};
pub use session::{GenerationTransport, ServerMessage, SessionController, SessionUpdate};
