//! MIDI-to-NoteEvent mapping
//!
//! Converts the tick-based notes of a [`MidiFile`] into millisecond-based
//! [`NoteEvent`]s using one global tempo, the same last-tempo-wins value the
//! parser keeps.

use super::types::{MidiFile, MidiTrack, NoteEvent};
use super::NOTE_NAMES;

/// Instrument label used when the caller supplies no mapping.
pub const DEFAULT_INSTRUMENT: &str = "piano";

/// Split a MIDI note number into its pitch name and scientific octave.
///
/// ```rust
/// use pianodj::midi::pitch_name_and_octave;
///
/// assert_eq!(pitch_name_and_octave(60), ("C", 4));
/// assert_eq!(pitch_name_and_octave(61), ("C#", 4));
/// assert_eq!(pitch_name_and_octave(0), ("C", -1));
/// ```
pub fn pitch_name_and_octave(pitch: u8) -> (&'static str, i32) {
    let octave = i32::from(pitch / 12) - 1;
    (NOTE_NAMES[usize::from(pitch % 12)], octave)
}

/// Convert a tick position to milliseconds.
///
/// `ms = ticks / time_division * (60000 / tempo_bpm)`
pub fn ticks_to_ms(ticks: u64, time_division: u16, tempo_bpm: u32) -> f64 {
    let ms_per_beat = 60_000.0 / f64::from(tempo_bpm.max(1));
    (ticks as f64 / f64::from(time_division.max(1))) * ms_per_beat
}

/// Map a General MIDI program number to one of the UI's instrument labels.
///
/// Piano, chromatic percussion and organ families read as `piano`, bass as
/// `bass`, strings and ensembles as `strings`, everything else as `synth`.
pub fn gm_instrument_label(program: u8) -> &'static str {
    match program {
        0..=23 => "piano",
        32..=39 => "bass",
        40..=55 => "strings",
        _ => "synth",
    }
}

/// Convert every note of `file` into a [`NoteEvent`] labelled with
/// [`DEFAULT_INSTRUMENT`], sorted by start time.
///
/// # Example
/// ```rust
/// use pianodj::midi::{to_note_events, MidiFile, MidiFormat, MidiNote, MidiTrack};
///
/// let file = MidiFile {
///     tracks: vec![MidiTrack {
///         notes: vec![MidiNote {
///             pitch: 69,
///             velocity: 127,
///             start_tick: 96,
///             end_tick: 192,
///             channel: 0,
///         }],
///         name: None,
///         instrument: None,
///     }],
///     time_division: 96,
///     format: MidiFormat::SingleTrack,
///     tempo_bpm: 120,
/// };
///
/// let events = to_note_events(&file);
/// assert_eq!(events[0].pitch_name, "A");
/// assert_eq!(events[0].octave, 4);
/// assert_eq!(events[0].timestamp_ms, 500.0);
/// assert_eq!(events[0].duration_ms, 500.0);
/// assert_eq!(events[0].velocity, 1.0);
/// ```
pub fn to_note_events(file: &MidiFile) -> Vec<NoteEvent> {
    to_note_events_with(file, |_| DEFAULT_INSTRUMENT.to_string())
}

/// Convert with a caller-supplied instrument label per track.
///
/// Notes from all tracks are flattened and stably sorted by
/// `timestamp_ms`, so notes starting together keep track order.
pub fn to_note_events_with<F>(file: &MidiFile, mut instrument_for: F) -> Vec<NoteEvent>
where
    F: FnMut(&MidiTrack) -> String,
{
    let mut events = Vec::with_capacity(file.note_count());

    for track in &file.tracks {
        let instrument = instrument_for(track);
        for note in &track.notes {
            let (name, octave) = pitch_name_and_octave(note.pitch);
            let start = ticks_to_ms(note.start_tick, file.time_division, file.tempo_bpm);
            let end = ticks_to_ms(note.end_tick, file.time_division, file.tempo_bpm);
            events.push(NoteEvent {
                pitch_name: name.to_string(),
                octave,
                instrument: instrument.clone(),
                timestamp_ms: start,
                duration_ms: end - start,
                velocity: f64::from(note.velocity) / 127.0,
            });
        }
    }

    events.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
    events
}

/// Convert using [`gm_instrument_label`] on each track's program number.
pub fn to_note_events_by_program(file: &MidiFile) -> Vec<NoteEvent> {
    to_note_events_with(file, |track| {
        track
            .instrument
            .map(gm_instrument_label)
            .unwrap_or(DEFAULT_INSTRUMENT)
            .to_string()
    })
}
