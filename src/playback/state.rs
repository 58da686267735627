//! Playback state machine
//!
//! ```text
//! Stopped --Play--> Loading --Primed--> Playing --Pause--> Paused --Play--> Loading
//!                      ^                   |
//!                      +-----Underrun------+
//! any --Stop / TransportFailed--> Stopped
//! ```

use serde::Serialize;

use crate::error::PianoDjError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// Play requested by the user
    Play,
    /// Priming delay elapsed after the first chunk was scheduled
    Primed,
    /// A chunk arrived after its scheduled start had already passed
    Underrun,
    Pause,
    Stop,
    /// Connection error or close from the generation service
    TransportFailed,
}

impl PlaybackState {
    /// Apply `event`, returning the new state or rejecting an illegal move.
    ///
    /// Pause and stop are idempotent: pausing while paused stays paused,
    /// stopping is legal from every state.
    ///
    /// ```rust
    /// use pianodj::playback::{PlaybackEvent, PlaybackState};
    ///
    /// let state = PlaybackState::Stopped.transition(PlaybackEvent::Play).unwrap();
    /// assert_eq!(state, PlaybackState::Loading);
    ///
    /// // Playing is only reachable through Loading
    /// assert!(PlaybackState::Stopped.transition(PlaybackEvent::Primed).is_err());
    /// ```
    pub fn transition(self, event: PlaybackEvent) -> Result<PlaybackState, PianoDjError> {
        use PlaybackEvent as E;
        use PlaybackState as S;

        let next = match (self, event) {
            (S::Stopped | S::Paused, E::Play) => S::Loading,
            (S::Loading, E::Primed) => S::Playing,
            (S::Loading | S::Playing, E::Underrun) => S::Loading,
            (S::Loading | S::Playing | S::Paused, E::Pause) => S::Paused,
            (_, E::Stop | E::TransportFailed) => S::Stopped,
            (from, event) => return Err(PianoDjError::InvalidTransition { from, event }),
        };
        Ok(next)
    }

    /// Whether incoming audio chunks may produce output in this state.
    pub fn accepts_audio(self) -> bool {
        matches!(self, PlaybackState::Loading | PlaybackState::Playing)
    }
}
