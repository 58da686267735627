//! MIDI data type definitions
//!
//! The raw decoder output ([`RawMidiEvent`]), the parsed container
//! ([`MidiFile`], [`MidiTrack`], [`MidiNote`]) and the UI-facing
//! [`NoteEvent`] produced by the mapper.

use serde::{Deserialize, Serialize};

/// Tempo used when a file carries no tempo meta event.
pub const DEFAULT_TEMPO_BPM: u32 = 120;

/// Decoded channel/meta/system message, without its delta time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind<'a> {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
    ProgramChange { channel: u8, program: u8 },
    Meta { meta_type: u8, data: &'a [u8] },
    /// Anything else; its data bytes have already been skipped.
    Other { status: u8 },
}

/// One event as read from a track chunk. Borrowed from the input buffer
/// and consumed immediately by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMidiEvent<'a> {
    pub delta_ticks: u64,
    pub kind: EventKind<'a>,
}

/// A resolved note inside one track.
///
/// Invariant: `end_tick >= start_tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiNote {
    pub pitch: u8,
    pub velocity: u8,
    pub start_tick: u64,
    pub end_tick: u64,
    pub channel: u8,
}

impl MidiNote {
    pub fn duration_ticks(&self) -> u64 {
        self.end_tick - self.start_tick
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiTrack {
    pub notes: Vec<MidiNote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Program number of the last program change seen in the track.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<u8>,
}

/// SMF container format from the header chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MidiFormat {
    /// Format 0: a single multi-channel track
    SingleTrack,
    /// Format 1: simultaneous tracks
    Parallel,
    /// Format 2: independent sequential patterns
    Sequential,
    /// Any other value found in the header, kept as-is
    Unknown(u16),
}

impl From<u16> for MidiFormat {
    fn from(value: u16) -> Self {
        match value {
            0 => MidiFormat::SingleTrack,
            1 => MidiFormat::Parallel,
            2 => MidiFormat::Sequential,
            other => MidiFormat::Unknown(other),
        }
    }
}

/// A parsed Standard MIDI File.
///
/// # Fields
/// - `tracks`: tracks that produced at least one note, in file order
/// - `time_division`: ticks per quarter note (never zero, MSB always clear)
/// - `format`: container format from the header
/// - `tempo_bpm`: the last tempo meta event of the file, or 120
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiFile {
    pub tracks: Vec<MidiTrack>,
    pub time_division: u16,
    pub format: MidiFormat,
    pub tempo_bpm: u32,
}

impl MidiFile {
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }
}

/// A note in UI time, shared with the piano roll and the melody prompt.
///
/// # Fields
/// - `pitch_name`: one of `C C# D D# E F F# G G# A A# B`
/// - `octave`: scientific octave (MIDI 60 is C4)
/// - `instrument`: instrument label of the originating track
/// - `timestamp_ms`: start time from the beginning of the file
/// - `duration_ms`: length of the note
/// - `velocity`: normalized to `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub pitch_name: String,
    pub octave: i32,
    pub instrument: String,
    pub timestamp_ms: f64,
    pub duration_ms: f64,
    pub velocity: f64,
}

impl NoteEvent {
    /// MIDI note number reconstructed from name and octave.
    pub fn midi_number(&self) -> i32 {
        let index = super::NOTE_NAMES
            .iter()
            .position(|n| *n == self.pitch_name)
            .unwrap_or(0) as i32;
        (self.octave + 1) * 12 + index
    }

    pub fn end_ms(&self) -> f64 {
        self.timestamp_ms + self.duration_ms
    }

    /// Display name such as `C#4`.
    pub fn label(&self) -> String {
        format!("{}{}", self.pitch_name, self.octave)
    }
}
