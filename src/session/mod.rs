//! # Session Module
//!
//! Glue between the generation service and local playback.
//!
//! ## Sub-modules
//! - `prompts` - Weighted prompts and the filtered-text set
//! - `transport` - The [`GenerationTransport`] seam and server message parsing
//! - `controller` - Play/pause/reset handling and message dispatch
//!
//! ## Example
//! ```rust
//! use pianodj::config::SessionConfig;
//! use pianodj::playback::{PlaybackState, RecordingSink};
//! use pianodj::session::{RecordingTransport, ServerMessage, SessionController, SessionUpdate};
//!
//! let (mut controller, updates) = SessionController::new(
//!     SessionConfig::default(),
//!     RecordingTransport::new(),
//!     RecordingSink::new(0.0),
//! );
//! controller.connect().unwrap();
//! controller.handle_message(ServerMessage::SetupComplete);
//!
//! assert_eq!(controller.toggle_play_pause().unwrap(), PlaybackState::Loading);
//!
//! controller.handle_message(ServerMessage::Error("socket closed".to_string()));
//! assert_eq!(controller.state(), PlaybackState::Stopped);
//! let lost = SessionUpdate::Notification("Connection error, please restart audio.".to_string());
//! assert!(updates.try_iter().any(|u| u == lost));
//! ```

mod controller;
mod prompts;
mod transport;

pub use controller::{
    SessionController, SessionUpdate, CONNECTION_ERROR_MESSAGE, CONNECT_FAILED_MESSAGE,
    PROMPT_FILTERED_MESSAGE,
};
pub use prompts::{
    PromptBook, WeightedPrompt, MELODY_PROMPT_COLOR, MELODY_PROMPT_ID, PROMPT_COLORS,
    PROMPT_TEXT_PRESETS,
};
pub use transport::{
    AudioChunk, GenerationTransport, RecordingTransport, ServerMessage, TransportCall,
};
