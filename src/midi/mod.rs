//! # MIDI Module
//!
//! Import Standard MIDI Files into time-ordered note events for the piano roll
//! and the melody prompt.
//!
//! ## Sub-modules
//! - `cursor` - Bounds-checked big-endian / variable-length-quantity reader
//! - `decoder` - Meta, channel and system event recognition inside one track
//! - `parser` - Header and track orchestration into a [`MidiFile`]
//! - `mapper` - Tick-to-millisecond conversion into [`NoteEvent`]s
//!
//! ## Example
//! ```rust
//! use pianodj::midi::{parse, to_note_events};
//!
//! let mut bytes = Vec::new();
//! bytes.extend_from_slice(b"MThd");
//! bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0]); // format 0, 1 track, 480 tpq
//! bytes.extend_from_slice(b"MTrk");
//! bytes.extend_from_slice(&[0, 0, 0, 9]);
//! bytes.extend_from_slice(&[0x00, 0x90, 60, 100]); // note on C4
//! bytes.extend_from_slice(&[0x83, 0x60, 0x80, 60, 0]); // note off 480 ticks later
//!
//! let file = parse(&bytes).unwrap();
//! let events = to_note_events(&file);
//!
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].label(), "C4");
//! assert_eq!(events[0].duration_ms, 500.0);
//! ```
//!
//! ## Timing
//!
//! Only ticks-per-quarter-note time division is supported. A single tempo is
//! applied to the whole file: the last tempo meta event encountered in any
//! track, or 120 BPM.

mod cursor;
mod decoder;
mod mapper;
mod parser;
mod types;

pub use cursor::ByteCursor;
pub use decoder::{read_event, TrackEvents};
pub use mapper::{
    gm_instrument_label, pitch_name_and_octave, ticks_to_ms, to_note_events,
    to_note_events_by_program, to_note_events_with, DEFAULT_INSTRUMENT,
};
pub use parser::parse;
pub use types::{
    EventKind, MidiFile, MidiFormat, MidiNote, MidiTrack, NoteEvent, RawMidiEvent,
    DEFAULT_TEMPO_BPM,
};

/// Pitch class names indexed by `pitch % 12`.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
