//! Standard MIDI File parser
//!
//! Orchestrates the header chunk and the per-track event decoding into a
//! [`MidiFile`]. Parsing is all-or-nothing: any error discards the partial
//! result.

use tracing::{debug, warn};

use super::cursor::ByteCursor;
use super::decoder::{TrackEvents, META_TEMPO, META_TRACK_NAME};
use super::types::{EventKind, MidiFile, MidiFormat, MidiNote, MidiTrack, DEFAULT_TEMPO_BPM};
use crate::error::PianoDjError;

const HEADER_TAG: &[u8; 4] = b"MThd";
const TRACK_TAG: &[u8; 4] = b"MTrk";
const STANDARD_HEADER_LENGTH: u32 = 6;

/// A note-on waiting for its note-off.
#[derive(Debug, Clone, Copy)]
struct PendingNote {
    pitch: u8,
    velocity: u8,
    start_tick: u64,
    channel: u8,
}

/// Open notes of one track, one per pitch, kept in first-opened order.
#[derive(Debug, Default)]
struct PendingNotes {
    open: Vec<PendingNote>,
}

impl PendingNotes {
    /// Open a note. A second note-on for a pitch that is still open
    /// replaces the pending entry in place.
    fn open(&mut self, note: PendingNote) {
        match self.open.iter_mut().find(|p| p.pitch == note.pitch) {
            Some(existing) => *existing = note,
            None => self.open.push(note),
        }
    }

    fn close(&mut self, pitch: u8, end_tick: u64) -> Option<MidiNote> {
        let index = self.open.iter().position(|p| p.pitch == pitch)?;
        let pending = self.open.remove(index);
        Some(pending.into_note(end_tick))
    }

    /// Force-close every hanging note at `end_tick`, keeping the channel
    /// captured at note-on.
    fn drain(&mut self, end_tick: u64) -> impl Iterator<Item = MidiNote> + '_ {
        self.open.drain(..).map(move |p| p.into_note(end_tick))
    }
}

impl PendingNote {
    fn into_note(self, end_tick: u64) -> MidiNote {
        MidiNote {
            pitch: self.pitch,
            velocity: self.velocity,
            start_tick: self.start_tick,
            end_tick,
            channel: self.channel,
        }
    }
}

/// Parse a Standard MIDI File from raw bytes.
///
/// # Errors
/// Returns [`PianoDjError::Format`] when the `MThd` or any `MTrk` signature is
/// missing, the time division is SMPTE-based or zero, or a read would run
/// past the end of `data`.
///
/// # Example
/// ```rust
/// use pianodj::midi::parse;
///
/// let err = parse(b"RIFF....").unwrap_err();
/// assert_eq!(err.kind(), "format");
/// ```
pub fn parse(data: &[u8]) -> Result<MidiFile, PianoDjError> {
    let mut cursor = ByteCursor::new(data);

    cursor.expect_tag(HEADER_TAG, "missing MThd header")?;
    let header_length = cursor.read_u32_be()?;
    let format = MidiFormat::from(cursor.read_u16_be()?);
    let num_tracks = cursor.read_u16_be()?;
    let division_offset = cursor.position();
    let time_division = cursor.read_u16_be()?;

    if time_division & 0x8000 != 0 {
        return Err(PianoDjError::format(
            division_offset,
            "SMPTE time division is not supported",
        ));
    }
    if time_division == 0 {
        return Err(PianoDjError::format(
            division_offset,
            "time division must be greater than zero",
        ));
    }
    if header_length > STANDARD_HEADER_LENGTH {
        cursor.skip((header_length - STANDARD_HEADER_LENGTH) as usize)?;
    }

    debug!(?format, num_tracks, time_division, "parsing MIDI header");

    let mut tempo_bpm = DEFAULT_TEMPO_BPM;
    let mut tracks = Vec::new();

    for index in 0..num_tracks {
        cursor.expect_tag(TRACK_TAG, &format!("missing MTrk header at track {}", index))?;
        let length = cursor.read_u32_be()? as usize;
        let end = cursor.position().saturating_add(length);

        let track = parse_track(&mut cursor, end, &mut tempo_bpm)?;
        if track.notes.is_empty() {
            debug!(track = index, "dropping track without notes");
        } else {
            tracks.push(track);
        }
    }

    Ok(MidiFile {
        tracks,
        time_division,
        format,
        tempo_bpm,
    })
}

fn parse_track(
    cursor: &mut ByteCursor<'_>,
    end: usize,
    tempo_bpm: &mut u32,
) -> Result<MidiTrack, PianoDjError> {
    let mut track = MidiTrack::default();
    let mut pending = PendingNotes::default();
    let mut current_ticks: u64 = 0;

    for event in TrackEvents::new(cursor, end) {
        let event = event?;
        current_ticks = current_ticks.saturating_add(event.delta_ticks);

        match event.kind {
            EventKind::Meta {
                meta_type: META_TRACK_NAME,
                data,
            } => {
                track.name = Some(String::from_utf8_lossy(data).into_owned());
            }
            EventKind::Meta {
                meta_type: META_TEMPO,
                data,
            } => match tempo_from_meta(data) {
                Some(bpm) => *tempo_bpm = bpm,
                None => warn!(?data, "ignoring malformed tempo event"),
            },
            EventKind::Meta { .. } | EventKind::Other { .. } => {}
            EventKind::ProgramChange { program, .. } => {
                track.instrument = Some(program);
            }
            EventKind::NoteOn {
                channel,
                pitch,
                velocity,
            } => pending.open(PendingNote {
                pitch,
                velocity,
                start_tick: current_ticks,
                channel,
            }),
            EventKind::NoteOff { pitch, .. } => {
                if let Some(note) = pending.close(pitch, current_ticks) {
                    track.notes.push(note);
                }
            }
        }
    }

    track.notes.extend(pending.drain(current_ticks));
    Ok(track)
}

/// BPM from a tempo meta payload (24-bit microseconds per quarter note).
fn tempo_from_meta(data: &[u8]) -> Option<u32> {
    let [a, b, c, ..] = data else {
        return None;
    };
    let micros = u32::from_be_bytes([0, *a, *b, *c]);
    if micros == 0 {
        return None;
    }
    Some((60_000_000.0 / f64::from(micros)).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::test_support::{smf, track};

    #[test]
    fn test_minimal_file() {
        let data = smf(
            0,
            480,
            &[track(&[
                &[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20],
                &[0x00, 0x90, 60, 100],
                &[0x83, 0x60, 0x80, 60, 0],
            ])],
        );
        let file = parse(&data).unwrap();
        assert_eq!(file.format, MidiFormat::SingleTrack);
        assert_eq!(file.time_division, 480);
        assert_eq!(file.tempo_bpm, 120);
        assert_eq!(file.tracks.len(), 1);
        assert_eq!(
            file.tracks[0].notes,
            vec![MidiNote {
                pitch: 60,
                velocity: 100,
                start_tick: 0,
                end_tick: 480,
                channel: 0,
            }]
        );
    }

    #[test]
    fn test_missing_header() {
        let err = parse(b"MTrk\x00\x00\x00\x06\x00\x00\x00\x01\x01\xE0").unwrap_err();
        assert_eq!(err, PianoDjError::format(0, "missing MThd header"));
    }

    #[test]
    fn test_missing_track_header() {
        let mut data = smf(1, 96, &[track(&[&[0x00, 0x90, 60, 100]])]);
        data[14..18].copy_from_slice(b"XTrk");
        let err = parse(&data).unwrap_err();
        assert_eq!(err, PianoDjError::format(14, "missing MTrk header at track 0"));
    }

    #[test]
    fn test_truncated_file() {
        let data = smf(0, 96, &[track(&[&[0x00, 0x90, 60, 100], &[0x60, 0x80, 60, 0]])]);
        for cut in [3, 10, 13, 20, data.len() - 1] {
            let err = parse(&data[..cut]).unwrap_err();
            assert_eq!(err.kind(), "format", "cut at {}", cut);
        }
    }

    #[test]
    fn test_declared_track_count_larger_than_data() {
        let mut data = smf(1, 96, &[track(&[&[0x00, 0x90, 60, 100]])]);
        data[11] = 2;
        assert!(parse(&data).is_err());
    }

    #[test]
    fn test_smpte_division_rejected() {
        let data = smf(0, 0xE728, &[]);
        let err = parse(&data).unwrap_err();
        assert!(err.to_string().contains("SMPTE"));
    }

    #[test]
    fn test_zero_division_rejected() {
        let data = smf(0, 0, &[]);
        assert!(parse(&data).is_err());
    }

    #[test]
    fn test_dangling_note_off_ignored() {
        let data = smf(
            0,
            96,
            &[track(&[
                &[0x00, 0x90, 64, 0],
                &[0x10, 0x90, 60, 80],
                &[0x10, 0x80, 60, 0],
            ])],
        );
        let file = parse(&data).unwrap();
        let notes = &file.tracks[0].notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 60);
        assert!(notes.iter().all(|n| n.pitch != 64));
    }

    #[test]
    fn test_hanging_note_closed_at_track_end() {
        let data = smf(
            0,
            96,
            &[track(&[
                &[0x00, 0x92, 67, 70],
                &[0x30, 0xB2, 64, 127],
                &[0x81, 0x00, 0xFF, 0x2F, 0x00],
            ])],
        );
        let file = parse(&data).unwrap();
        let note = &file.tracks[0].notes[0];
        assert_eq!(note.start_tick, 0);
        assert_eq!(note.end_tick, 0x30 + 0x80);
        assert_eq!(note.channel, 2);
    }

    #[test]
    fn test_repeated_note_on_replaces_pending() {
        let data = smf(
            0,
            96,
            &[track(&[
                &[0x00, 0x90, 60, 50],
                &[0x10, 0x90, 60, 90],
                &[0x10, 0x80, 60, 0],
            ])],
        );
        let file = parse(&data).unwrap();
        assert_eq!(
            file.tracks[0].notes,
            vec![MidiNote {
                pitch: 60,
                velocity: 90,
                start_tick: 0x10,
                end_tick: 0x20,
                channel: 0,
            }]
        );
    }

    #[test]
    fn test_empty_tracks_dropped_and_metadata_kept() {
        let data = smf(
            1,
            480,
            &[
                track(&[&[0x00, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40], &[0x00, 0xFF, 0x2F, 0x00]]),
                track(&[
                    &[0x00, 0xFF, 0x03, 0x05, b'P', b'i', b'a', b'n', b'o'],
                    &[0x00, 0xC1, 4],
                    &[0x00, 0xC1, 7],
                    &[0x00, 0x91, 72, 64],
                    &[0x60, 0x81, 72, 0],
                ]),
            ],
        );
        let file = parse(&data).unwrap();
        assert_eq!(file.format, MidiFormat::Parallel);
        assert_eq!(file.tracks.len(), 1);
        assert_eq!(file.tracks[0].name.as_deref(), Some("Piano"));
        assert_eq!(file.tracks[0].instrument, Some(7));
        assert_eq!(file.tracks[0].notes[0].channel, 1);
        // 1_000_000 us per quarter
        assert_eq!(file.tempo_bpm, 60);
    }

    #[test]
    fn test_last_tempo_wins_across_tracks() {
        let data = smf(
            1,
            96,
            &[
                track(&[
                    &[0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20],
                    &[0x00, 0x90, 60, 1],
                    &[0x01, 0x80, 60, 0],
                ]),
                track(&[
                    &[0x00, 0xFF, 0x51, 0x03, 0x09, 0x27, 0xC0],
                    &[0x00, 0x90, 62, 1],
                    &[0x01, 0x80, 62, 0],
                ]),
            ],
        );
        // 600_000 us per quarter
        assert_eq!(parse(&data).unwrap().tempo_bpm, 100);
    }

    #[test]
    fn test_zero_tempo_ignored() {
        let data = smf(
            0,
            96,
            &[track(&[
                &[0x00, 0xFF, 0x51, 0x03, 0, 0, 0],
                &[0x00, 0x90, 60, 1],
                &[0x01, 0x80, 60, 0],
            ])],
        );
        assert_eq!(parse(&data).unwrap().tempo_bpm, DEFAULT_TEMPO_BPM);
    }

    #[test]
    fn test_ticks_accumulate_per_track() {
        let data = smf(
            1,
            96,
            &[
                track(&[&[0x60, 0x90, 60, 1], &[0x60, 0x80, 60, 0]]),
                track(&[&[0x10, 0x90, 62, 1], &[0x10, 0x80, 62, 0]]),
            ],
        );
        let file = parse(&data).unwrap();
        let spans: Vec<(u64, u64)> = file
            .tracks
            .iter()
            .map(|t| (t.notes[0].start_tick, t.notes[0].end_tick))
            .collect();
        assert_eq!(spans, vec![(0x60, 0xC0), (0x10, 0x20)]);
    }

    #[test]
    fn test_extended_header_is_skipped() {
        let mut data = smf(0, 96, &[track(&[&[0x00, 0x90, 60, 1], &[0x01, 0x80, 60, 0]])]);
        data[7] = 8;
        data.splice(14..14, [0xAA, 0xBB]);
        assert_eq!(parse(&data).unwrap().note_count(), 1);
    }
}
