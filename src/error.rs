//! # Error Types
//!
//! This module defines all error types for the pianodj core.
//!
//! ## Error Types
//! - `Format` - Malformed or truncated MIDI container (fatal to the import)
//! - `Decode` - Invalid base64 audio payload (the chunk is dropped)
//! - `Length` - PCM byte length not aligned to the channel layout (the chunk is dropped)
//! - `Transport` - Failure reported by the generation service connection
//! - `InvalidTransition` - Playback state machine rejected an event
//! - `Config` - Configuration document could not be read
//!
//! ## Usage
//! ```rust
//! use pianodj::{import_midi, PianoDjError};
//!
//! match import_midi(b"not a midi file") {
//!     Ok(imported) => println!("{} notes", imported.notes.len()),
//!     Err(PianoDjError::Format { offset, message }) => {
//!         eprintln!("bad MIDI at byte {}: {}", offset, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

use crate::playback::{PlaybackEvent, PlaybackState};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PianoDjError {
    /// Malformed MIDI data.
    ///
    /// Raised for a missing `MThd`/`MTrk` signature, an unsupported time
    /// division, or any read past the end of the buffer.
    ///
    /// # Example
    /// ```
    /// # use pianodj::PianoDjError;
    /// let err = PianoDjError::Format {
    ///     offset: 0,
    ///     message: "missing MThd header".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid MIDI file at byte 0: missing MThd header");
    /// ```
    #[error("Invalid MIDI file at byte {offset}: {message}")]
    Format { offset: usize, message: String },

    /// Audio payload is not valid base64.
    #[error("Invalid audio payload: {0}")]
    Decode(String),

    /// PCM16 payload length does not split evenly into frames.
    ///
    /// # Example
    /// ```
    /// # use pianodj::PianoDjError;
    /// let err = PianoDjError::Length { len: 6, channels: 2 };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "PCM payload of 6 bytes does not hold whole frames of 2 16-bit channels"
    /// );
    /// ```
    #[error("PCM payload of {len} bytes does not hold whole frames of {channels} 16-bit channels")]
    Length { len: usize, channels: usize },

    /// Connection failure from the generation service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The playback state machine does not allow `event` from `from`.
    #[error("Cannot apply {event:?} while {from:?}")]
    InvalidTransition {
        from: PlaybackState,
        event: PlaybackEvent,
    },

    /// Invalid configuration document.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl PianoDjError {
    pub(crate) fn format(offset: usize, message: impl Into<String>) -> Self {
        PianoDjError::Format {
            offset,
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            PianoDjError::Format { .. } => "format",
            PianoDjError::Decode(_) => "decode",
            PianoDjError::Length { .. } => "length",
            PianoDjError::Transport(_) => "transport",
            PianoDjError::InvalidTransition { .. } => "transition",
            PianoDjError::Config(_) => "config",
        }
    }

    /// Chunk-level errors are isolated to one audio chunk and never stop playback.
    pub fn is_chunk_error(&self) -> bool {
        matches!(self, PianoDjError::Decode(_) | PianoDjError::Length { .. })
    }
}
