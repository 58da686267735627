//! # Public API
//!
//! Main entry points for turning MIDI files into note events. Each returns
//! an [`ImportedMidi`]: the notes plus the tempo the file declares, which the
//! host adopts as its BPM.
//!
//! ## Import Functions
//!
//! - [`import_midi()`] - Parse and map with the generic instrument label
//! - [`import_midi_by_program()`] - Label tracks from their General MIDI program
//! - [`import_midi_with()`] - Caller-supplied label per track
//!
//! ## Typical Usage
//!
//! ```rust
//! use pianodj::import_midi;
//!
//! # let mut bytes = b"MThd".to_vec();
//! # bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0]);
//! # bytes.extend_from_slice(b"MTrk");
//! # bytes.extend_from_slice(&[0, 0, 0, 9, 0x00, 0x90, 60, 100, 0x83, 0x60, 0x80, 60, 0]);
//! let imported = import_midi(&bytes)?;
//! for note in &imported.notes {
//!     println!("{}{} at {} ms", note.pitch_name, note.octave, note.timestamp_ms);
//! }
//! # assert_eq!(imported.notes.len(), 1);
//! # assert_eq!(imported.tempo_bpm, 120);
//! # Ok::<(), pianodj::PianoDjError>(())
//! ```

use serde::Serialize;
use tracing::info;

use crate::melody::melody_prompt;
use crate::midi::{parse, to_note_events, to_note_events_by_program, to_note_events_with};
use crate::midi::{MidiFile, MidiTrack, NoteEvent};
use crate::PianoDjError;

/// Notes of an imported file and the tempo it declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedMidi {
    pub notes: Vec<NoteEvent>,
    /// Last tempo meta event of the file, or 120 when it has none.
    pub tempo_bpm: u32,
}

impl ImportedMidi {
    fn new(file: &MidiFile, notes: Vec<NoteEvent>) -> Self {
        info!(
            tracks = file.tracks.len(),
            notes = notes.len(),
            tempo_bpm = file.tempo_bpm,
            "imported MIDI file"
        );
        Self {
            notes,
            tempo_bpm: file.tempo_bpm,
        }
    }

    /// Melody prompt for these notes at the file's own tempo.
    pub fn melody_prompt(&self, instrument: &str) -> Option<String> {
        melody_prompt(&self.notes, self.tempo_bpm, instrument)
    }
}

/// Parse a Standard MIDI File and return its notes in time order.
///
/// # Pipeline
/// 1. Parse the `MThd` header and every `MTrk` chunk
/// 2. Pair note-on/note-off events into notes (hanging notes closed at track end)
/// 3. Convert ticks to milliseconds with the file's tempo
/// 4. Flatten all tracks and sort by start time
///
/// # Errors
/// Returns [`PianoDjError::Format`] for a malformed or truncated file. Nothing
/// is returned on failure, so a caller's previously imported notes stay intact.
pub fn import_midi(bytes: &[u8]) -> Result<ImportedMidi, PianoDjError> {
    let file = parse(bytes)?;
    Ok(ImportedMidi::new(&file, to_note_events(&file)))
}

/// Like [`import_midi`], labelling each track from its program change.
pub fn import_midi_by_program(bytes: &[u8]) -> Result<ImportedMidi, PianoDjError> {
    let file = parse(bytes)?;
    Ok(ImportedMidi::new(&file, to_note_events_by_program(&file)))
}

/// Like [`import_midi`], with a caller-supplied instrument label per track.
pub fn import_midi_with<F>(bytes: &[u8], instrument_for: F) -> Result<ImportedMidi, PianoDjError>
where
    F: FnMut(&MidiTrack) -> String,
{
    let file = parse(bytes)?;
    let notes = to_note_events_with(&file, instrument_for);
    Ok(ImportedMidi::new(&file, notes))
}
