//! Session controller
//!
//! Owns the transport, the prompt book, the generation settings and the
//! playback scheduler for one session, and turns user actions and server
//! messages into commands on them. Everything the UI needs to show is sent
//! as a [`SessionUpdate`] over a channel.

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use super::prompts::{PromptBook, WeightedPrompt};
use super::transport::{GenerationTransport, ServerMessage};
use crate::config::{GenerationConfig, SessionConfig};
use crate::error::PianoDjError;
use crate::melody::melody_prompt;
use crate::midi::NoteEvent;
use crate::playback::{AudioSink, ChunkOutcome, PlaybackScheduler, PlaybackState};

pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error, please restart audio.";
pub const CONNECT_FAILED_MESSAGE: &str = "Failed to connect to session";
pub const PROMPT_FILTERED_MESSAGE: &str = "Prompt filtered";

/// Something the UI should reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    PlaybackState(PlaybackState),
    /// Transient user-visible message (toast).
    Notification(String),
    ConnectionError(bool),
}

pub struct SessionController<T: GenerationTransport, S: AudioSink> {
    config: SessionConfig,
    transport: T,
    sink: S,
    scheduler: PlaybackScheduler,
    prompts: PromptBook,
    generation: GenerationConfig,
    melody_prompt: Option<String>,
    /// Set until the service confirms setup, and again when it drops.
    connection_error: bool,
    updates: Sender<SessionUpdate>,
}

impl<T: GenerationTransport, S: AudioSink> SessionController<T, S> {
    /// Create a controller and the receiving end of its update channel.
    pub fn new(
        config: SessionConfig,
        transport: T,
        sink: S,
    ) -> (Self, Receiver<SessionUpdate>) {
        let (updates, receiver) = unbounded();
        let controller = Self {
            scheduler: PlaybackScheduler::new(&config),
            generation: config.generation.clone(),
            config,
            transport,
            sink,
            prompts: PromptBook::new(),
            melody_prompt: None,
            connection_error: true,
            updates,
        };
        (controller, receiver)
    }

    pub fn with_prompts(mut self, prompts: PromptBook) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    pub fn connection_error(&self) -> bool {
        self.connection_error
    }

    pub fn prompts(&self) -> &PromptBook {
        &self.prompts
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn melody_prompt(&self) -> Option<&str> {
        self.melody_prompt.as_deref()
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn notify(&self, update: SessionUpdate) {
        // A dropped receiver only means nobody is listening
        let _ = self.updates.send(update);
    }

    fn publish_if_changed(&self, before: PlaybackState) {
        let after = self.scheduler.state();
        if after != before {
            self.notify(SessionUpdate::PlaybackState(after));
        }
    }

    fn set_connection_error(&mut self, value: bool) {
        if self.connection_error != value {
            self.connection_error = value;
            self.notify(SessionUpdate::ConnectionError(value));
        }
    }

    /// Open the connection to the generation service.
    pub fn connect(&mut self) -> Result<(), PianoDjError> {
        info!(model = %self.config.model, "connecting to generation session");
        match self.transport.connect(&self.config.model) {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(%err, "failed to connect to session");
                self.set_connection_error(true);
                self.notify(SessionUpdate::Notification(CONNECT_FAILED_MESSAGE.to_string()));
                Err(err)
            }
        }
    }

    fn reconnect_if_needed(&mut self) -> Result<(), PianoDjError> {
        if self.connection_error {
            self.connect()?;
            self.send_prompts();
        }
        Ok(())
    }

    /// Send the active prompts. A rejection is shown to the user and
    /// pauses playback.
    pub fn send_prompts(&mut self) {
        let melody = self
            .melody_prompt
            .as_ref()
            .map(|text| WeightedPrompt::melody(text.clone(), self.config.melody_prompt_weight));
        let outgoing = self.prompts.outgoing(melody.as_ref());
        debug!(count = outgoing.len(), "sending weighted prompts");

        if let Err(err) = self.transport.set_weighted_prompts(&outgoing) {
            warn!(%err, "weighted prompts rejected");
            self.notify(SessionUpdate::Notification(err.to_string()));
            let before = self.scheduler.state();
            if before != PlaybackState::Stopped {
                if let Err(err) = self.pause_audio() {
                    warn!(%err, "could not pause after prompt rejection");
                }
                self.publish_if_changed(before);
            }
        }
    }

    pub fn add_prompt(&mut self, text: impl Into<String>) -> WeightedPrompt {
        let prompt = self.prompts.add(text).clone();
        self.send_prompts();
        prompt
    }

    pub fn update_prompt(&mut self, prompt: WeightedPrompt) {
        self.prompts.upsert(prompt);
        self.send_prompts();
    }

    pub fn remove_prompt(&mut self, prompt_id: &str) -> Option<WeightedPrompt> {
        let removed = self.prompts.remove(prompt_id);
        if removed.is_some() {
            self.send_prompts();
        }
        removed
    }

    /// Describe `notes` as the melody prompt and send it along with the
    /// other prompts. An empty note list clears the melody prompt.
    pub fn set_melody(&mut self, notes: &[NoteEvent], bpm: u32, instrument: &str) {
        self.melody_prompt = melody_prompt(notes, bpm, instrument);
        self.send_prompts();
    }

    fn load_audio(&mut self) -> Result<(), PianoDjError> {
        self.transport.play()?;
        self.scheduler.play(&mut self.sink)?;
        Ok(())
    }

    fn pause_audio(&mut self) -> Result<(), PianoDjError> {
        self.transport.pause()?;
        self.scheduler.pause(&mut self.sink)?;
        Ok(())
    }

    fn stop_audio(&mut self) {
        if let Err(err) = self.transport.stop() {
            warn!(%err, "transport stop failed");
        }
        self.scheduler.stop(&mut self.sink);
    }

    /// The play/pause button.
    ///
    /// Playing pauses, Paused or Stopped (re)starts, reconnecting first if
    /// the connection is in error, and Loading stops.
    pub fn toggle_play_pause(&mut self) -> Result<PlaybackState, PianoDjError> {
        let before = self.scheduler.state();
        let result = match before {
            PlaybackState::Playing => self.pause_audio(),
            PlaybackState::Paused | PlaybackState::Stopped => self
                .reconnect_if_needed()
                .and_then(|()| self.load_audio()),
            PlaybackState::Loading => {
                self.stop_audio();
                Ok(())
            }
        };
        self.publish_if_changed(before);
        result.map(|()| self.scheduler.state())
    }

    /// Start over: fresh context, default generation settings, then play.
    pub fn reset(&mut self) -> Result<PlaybackState, PianoDjError> {
        let before = self.scheduler.state();
        let result = self.reset_inner();
        self.publish_if_changed(before);
        result.map(|()| self.scheduler.state())
    }

    fn reset_inner(&mut self) -> Result<(), PianoDjError> {
        self.stop_audio();
        self.reconnect_if_needed()?;
        self.transport.reset_context()?;
        self.generation = self.config.generation.clone();
        self.transport.set_music_generation_config(&self.generation)?;
        info!("session context reset");
        self.load_audio()
    }

    pub fn update_generation_config(
        &mut self,
        config: GenerationConfig,
    ) -> Result<(), PianoDjError> {
        self.generation = config;
        self.transport.set_music_generation_config(&self.generation)
    }

    /// Fire time-based transitions. Call from the host's clock.
    pub fn tick(&mut self) -> Option<PlaybackState> {
        let state = self.scheduler.tick(self.sink.current_time());
        if let Some(state) = state {
            self.notify(SessionUpdate::PlaybackState(state));
        }
        state
    }

    /// React to one message from the generation service.
    ///
    /// Returns the outcome of every audio chunk it carried, in order.
    pub fn handle_message(&mut self, message: ServerMessage) -> Vec<ChunkOutcome> {
        match message {
            ServerMessage::SetupComplete => {
                info!("setup complete, connection established");
                self.set_connection_error(false);
                Vec::new()
            }
            ServerMessage::FilteredPrompt { text, reason } => {
                info!(%text, "prompt filtered by service");
                self.prompts.mark_filtered(text);
                let message = reason.unwrap_or_else(|| PROMPT_FILTERED_MESSAGE.to_string());
                self.notify(SessionUpdate::Notification(message));
                Vec::new()
            }
            ServerMessage::AudioChunks(chunks) => {
                let before = self.scheduler.state();
                let outcomes = chunks
                    .iter()
                    .map(|chunk| self.scheduler.handle_chunk(&chunk.data, &mut self.sink))
                    .collect();
                self.publish_if_changed(before);
                outcomes
            }
            ServerMessage::Error(reason) | ServerMessage::Closed(reason) => {
                error!(%reason, "generation session lost");
                let before = self.scheduler.state();
                self.set_connection_error(true);
                if let Err(err) = self.transport.stop() {
                    warn!(%err, "transport stop failed");
                }
                self.scheduler.fail_transport(&mut self.sink);
                self.publish_if_changed(before);
                self.notify(SessionUpdate::Notification(CONNECTION_ERROR_MESSAGE.to_string()));
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::{bytes_to_base64, float32_to_pcm16};
    use crate::playback::RecordingSink;
    use crate::session::transport::{AudioChunk, RecordingTransport, TransportCall};

    type Controller = SessionController<RecordingTransport, RecordingSink>;

    fn controller() -> (Controller, Receiver<SessionUpdate>) {
        let (mut controller, updates) = SessionController::new(
            SessionConfig::default(),
            RecordingTransport::new(),
            RecordingSink::new(0.0),
        );
        controller.connect().unwrap();
        controller.handle_message(ServerMessage::SetupComplete);
        controller.transport_mut().take_calls();
        updates.try_iter().count();
        (controller, updates)
    }

    fn audio(seconds: f64) -> ServerMessage {
        let frames = (seconds * 48_000.0) as usize;
        let data = bytes_to_base64(&float32_to_pcm16(&vec![0.0; frames * 2]));
        ServerMessage::AudioChunks(vec![AudioChunk { data }])
    }

    #[test]
    fn test_connect_uses_configured_model() {
        let (mut controller, _updates) = SessionController::new(
            SessionConfig::default(),
            RecordingTransport::new(),
            RecordingSink::new(0.0),
        );
        controller.connect().unwrap();
        assert_eq!(
            controller.transport().calls(),
            &[TransportCall::Connect("lyria-realtime-exp".to_string())]
        );
    }

    #[test]
    fn test_connect_failure_notifies() {
        let mut transport = RecordingTransport::new();
        transport.fail_connect(true);
        let (mut controller, updates) =
            SessionController::new(SessionConfig::default(), transport, RecordingSink::new(0.0));

        assert!(controller.connect().is_err());
        assert!(controller.connection_error());
        let updates: Vec<_> = updates.try_iter().collect();
        assert_eq!(
            updates,
            vec![SessionUpdate::Notification("Failed to connect to session".to_string())]
        );
    }

    #[test]
    fn test_play_before_setup_reconnects() {
        let (mut controller, _updates) = SessionController::new(
            SessionConfig::default(),
            RecordingTransport::new(),
            RecordingSink::new(0.0),
        );
        assert!(controller.connection_error());

        assert_eq!(controller.toggle_play_pause().unwrap(), PlaybackState::Loading);
        let calls = controller.transport().calls();
        assert_eq!(calls[0], TransportCall::Connect("lyria-realtime-exp".to_string()));
        assert!(matches!(&calls[1], TransportCall::SetWeightedPrompts(_)));
        assert_eq!(calls[2], TransportCall::Play);
    }

    #[test]
    fn test_play_pause_cycle() {
        let (mut controller, updates) = controller();

        assert_eq!(controller.toggle_play_pause().unwrap(), PlaybackState::Loading);
        controller.handle_message(audio(0.5));
        controller.sink_mut().set_time(2.0);
        assert_eq!(controller.tick(), Some(PlaybackState::Playing));
        assert_eq!(controller.toggle_play_pause().unwrap(), PlaybackState::Paused);
        assert_eq!(controller.toggle_play_pause().unwrap(), PlaybackState::Loading);

        assert_eq!(
            controller.transport().calls(),
            &[TransportCall::Play, TransportCall::Pause, TransportCall::Play]
        );
        let states: Vec<_> = updates.try_iter().collect();
        assert_eq!(
            states,
            vec![
                SessionUpdate::PlaybackState(PlaybackState::Loading),
                SessionUpdate::PlaybackState(PlaybackState::Playing),
                SessionUpdate::PlaybackState(PlaybackState::Paused),
                SessionUpdate::PlaybackState(PlaybackState::Loading),
            ]
        );
    }

    #[test]
    fn test_toggle_while_loading_stops() {
        let (mut controller, _updates) = controller();
        controller.toggle_play_pause().unwrap();
        assert_eq!(controller.toggle_play_pause().unwrap(), PlaybackState::Stopped);
        assert_eq!(
            controller.transport().calls(),
            &[TransportCall::Play, TransportCall::Stop]
        );
    }

    #[test]
    fn test_connection_error_then_reconnect() {
        let (mut controller, updates) = controller();
        controller.update_prompt(WeightedPrompt {
            prompt_id: "prompt-0".to_string(),
            text: "Funk".to_string(),
            weight: 1.0,
            color: "#9900ff".to_string(),
        });
        controller.toggle_play_pause().unwrap();
        controller.handle_message(audio(0.5));
        updates.try_iter().count();

        controller.handle_message(ServerMessage::Closed("going away".to_string()));
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert!(controller.connection_error());
        assert_eq!(controller.scheduler().next_start_time(), 0.0);
        assert_eq!(
            updates.try_iter().collect::<Vec<_>>(),
            vec![
                SessionUpdate::ConnectionError(true),
                SessionUpdate::PlaybackState(PlaybackState::Stopped),
                SessionUpdate::Notification("Connection error, please restart audio.".to_string()),
            ]
        );

        controller.transport_mut().take_calls();
        assert_eq!(controller.toggle_play_pause().unwrap(), PlaybackState::Loading);
        let calls = controller.transport().calls();
        assert_eq!(calls[0], TransportCall::Connect("lyria-realtime-exp".to_string()));
        assert!(matches!(&calls[1], TransportCall::SetWeightedPrompts(p) if p.len() == 1));
        assert_eq!(calls[2], TransportCall::Play);

        // The error flag is cleared by the service, not by reconnecting
        assert!(controller.connection_error());
        controller.handle_message(ServerMessage::SetupComplete);
        assert!(!controller.connection_error());
    }

    #[test]
    fn test_filtered_prompt_is_excluded() {
        let (mut controller, updates) = controller();
        let prompt = controller.add_prompt("Thrash");
        controller.update_prompt(WeightedPrompt {
            weight: 1.0,
            ..prompt
        });
        controller.handle_message(ServerMessage::FilteredPrompt {
            text: "Thrash".to_string(),
            reason: None,
        });
        assert!(updates
            .try_iter()
            .any(|u| u == SessionUpdate::Notification("Prompt filtered".to_string())));

        controller.transport_mut().take_calls();
        controller.send_prompts();
        assert_eq!(
            controller.transport().calls(),
            &[TransportCall::SetWeightedPrompts(Vec::new())]
        );
    }

    #[test]
    fn test_prompt_rejection_pauses() {
        let (mut controller, updates) = controller();
        controller.toggle_play_pause().unwrap();
        controller.transport_mut().fail_prompts(true);
        controller.add_prompt("Funk");

        assert_eq!(controller.state(), PlaybackState::Paused);
        let rejected = SessionUpdate::Notification("Transport error: prompts rejected".to_string());
        assert!(updates.try_iter().any(|u| u == rejected));
    }

    #[test]
    fn test_reset_restores_defaults_and_restarts() {
        let (mut controller, _updates) = controller();
        let mut custom = GenerationConfig::default();
        custom.temperature = 2.5;
        controller.update_generation_config(custom).unwrap();
        controller.toggle_play_pause().unwrap();
        controller.transport_mut().take_calls();

        assert_eq!(controller.reset().unwrap(), PlaybackState::Loading);
        assert_eq!(controller.generation(), &GenerationConfig::default());
        assert_eq!(
            controller.transport().calls(),
            &[
                TransportCall::Stop,
                TransportCall::ResetContext,
                TransportCall::SetMusicGenerationConfig(GenerationConfig::default().to_wire()),
                TransportCall::Play,
            ]
        );
    }

    #[test]
    fn test_reset_stops_even_when_reconnect_fails() {
        let (mut controller, _updates) = controller();
        controller.toggle_play_pause().unwrap();
        controller.handle_message(audio(0.5));
        controller.handle_message(ServerMessage::Error("socket closed".to_string()));
        controller.toggle_play_pause().unwrap();
        assert_eq!(controller.state(), PlaybackState::Loading);
        controller.transport_mut().fail_connect(true);
        controller.transport_mut().take_calls();

        assert!(controller.reset().is_err());
        assert_eq!(controller.state(), PlaybackState::Stopped);
        assert_eq!(controller.scheduler().next_start_time(), 0.0);
        let calls = controller.transport().calls();
        assert_eq!(calls[0], TransportCall::Stop);
        assert_eq!(calls[1], TransportCall::Connect("lyria-realtime-exp".to_string()));
        assert_eq!(calls.len(), 2);
    }

    #[test]
    fn test_melody_prompt_is_sent_last() {
        let (mut controller, _updates) = controller();
        let notes = vec![NoteEvent {
            pitch_name: "C".to_string(),
            octave: 4,
            instrument: "piano".to_string(),
            timestamp_ms: 0.0,
            duration_ms: 500.0,
            velocity: 0.8,
        }];
        controller.set_melody(&notes, 120, "piano");
        assert!(controller.melody_prompt().is_some());

        let calls = controller.transport().calls();
        match calls.last() {
            Some(TransportCall::SetWeightedPrompts(prompts)) => {
                assert_eq!(prompts.len(), 1);
                assert_eq!(prompts[0].prompt_id, "melody-prompt");
                assert_eq!(prompts[0].weight, 1.5);
            }
            other => panic!("unexpected call {:?}", other),
        }

        controller.set_melody(&[], 120, "piano");
        assert!(controller.melody_prompt().is_none());
    }
}
