//! Event decoder for the body of one `MTrk` chunk.
//!
//! Recognizes meta events (`0xFF`), note on/off, program change and
//! sysex; every other status byte is followed by exactly two data bytes,
//! which are skipped. Running status is not supported.

use super::cursor::ByteCursor;
use super::types::{EventKind, RawMidiEvent};
use crate::error::PianoDjError;

pub const META_TRACK_NAME: u8 = 0x03;
pub const META_TEMPO: u8 = 0x51;

const STATUS_META: u8 = 0xFF;
const STATUS_SYSEX: u8 = 0xF0;
const STATUS_SYSEX_ESCAPE: u8 = 0xF7;

/// Read the next event (delta time + message) at the cursor.
pub fn read_event<'a>(cursor: &mut ByteCursor<'a>) -> Result<RawMidiEvent<'a>, PianoDjError> {
    let delta_ticks = cursor.read_vlq()?;
    let status = cursor.read_u8()?;
    let channel = status & 0x0F;

    let kind = match status {
        STATUS_META => {
            let meta_type = cursor.read_u8()?;
            let len = cursor.read_u8()? as usize;
            let data = cursor.read_bytes(len)?;
            EventKind::Meta { meta_type, data }
        }
        0xC0..=0xCF => EventKind::ProgramChange {
            channel,
            program: cursor.read_u8()?,
        },
        0x90..=0x9F => {
            let pitch = cursor.read_u8()?;
            let velocity = cursor.read_u8()?;
            if velocity > 0 {
                EventKind::NoteOn {
                    channel,
                    pitch,
                    velocity,
                }
            } else {
                EventKind::NoteOff {
                    channel,
                    pitch,
                    velocity,
                }
            }
        }
        0x80..=0x8F => {
            let pitch = cursor.read_u8()?;
            let velocity = cursor.read_u8()?;
            EventKind::NoteOff {
                channel,
                pitch,
                velocity,
            }
        }
        STATUS_SYSEX | STATUS_SYSEX_ESCAPE => {
            let len = cursor.read_u8()? as usize;
            cursor.skip(len)?;
            EventKind::Other { status }
        }
        _ => {
            cursor.skip(2)?;
            EventKind::Other { status }
        }
    };

    Ok(RawMidiEvent { delta_ticks, kind })
}

/// Iterator over the events of a track, ending at `end` (absolute offset).
///
/// The last event may extend past `end`; decoding stops as soon as the
/// cursor reaches or passes it.
pub struct TrackEvents<'c, 'a> {
    cursor: &'c mut ByteCursor<'a>,
    end: usize,
    failed: bool,
}

impl<'c, 'a> TrackEvents<'c, 'a> {
    pub fn new(cursor: &'c mut ByteCursor<'a>, end: usize) -> Self {
        Self {
            cursor,
            end,
            failed: false,
        }
    }
}

impl<'c, 'a> Iterator for TrackEvents<'c, 'a> {
    type Item = Result<RawMidiEvent<'a>, PianoDjError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.position() >= self.end {
            return None;
        }
        let event = read_event(self.cursor);
        self.failed = event.is_err();
        Some(event)
    }
}
