//! Generation service connection seam and its incoming message shapes.

use serde::Deserialize;

use super::prompts::WeightedPrompt;
use crate::config::{GenerationConfig, WireGenerationConfig};
use crate::error::PianoDjError;

/// The remote music generation session.
///
/// Implemented by the host over its actual connection; the controller only
/// issues commands and receives [`ServerMessage`]s through
/// [`SessionController::handle_message`](super::SessionController::handle_message).
pub trait GenerationTransport {
    fn connect(&mut self, model: &str) -> Result<(), PianoDjError>;
    fn play(&mut self) -> Result<(), PianoDjError>;
    fn pause(&mut self) -> Result<(), PianoDjError>;
    fn stop(&mut self) -> Result<(), PianoDjError>;
    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> Result<(), PianoDjError>;
    fn set_music_generation_config(&mut self, config: &GenerationConfig)
        -> Result<(), PianoDjError>;
    fn reset_context(&mut self) -> Result<(), PianoDjError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Base64 encoded PCM16 payload.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    SetupComplete,
    FilteredPrompt { text: String, reason: Option<String> },
    AudioChunks(Vec<AudioChunk>),
    /// Connection error event.
    Error(String),
    /// Connection close event.
    Closed(String),
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct RawServerMessage {
    setup_complete: Option<serde_json::Value>,
    filtered_prompt: Option<RawFilteredPrompt>,
    server_content: Option<RawServerContent>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawFilteredPrompt {
    text: Option<String>,
    filtered_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawServerContent {
    audio_chunks: Option<Vec<RawAudioChunk>>,
}

#[derive(Deserialize, Debug)]
struct RawAudioChunk {
    data: Option<String>,
}

impl ServerMessage {
    /// Split one JSON server message into the events it carries.
    ///
    /// A single message may combine several fields; they are returned in
    /// the order setup, filtered prompt, audio.
    pub fn from_json(json: &str) -> Result<Vec<ServerMessage>, PianoDjError> {
        let raw: RawServerMessage = serde_json::from_str(json)
            .map_err(|e| PianoDjError::Transport(format!("malformed server message: {}", e)))?;

        let mut messages = Vec::new();
        if raw.setup_complete.is_some() {
            messages.push(ServerMessage::SetupComplete);
        }
        if let Some(RawFilteredPrompt {
            text: Some(text),
            filtered_reason,
        }) = raw.filtered_prompt
        {
            messages.push(ServerMessage::FilteredPrompt {
                text,
                reason: filtered_reason,
            });
        }
        if let Some(chunks) = raw.server_content.and_then(|c| c.audio_chunks) {
            let chunks: Vec<AudioChunk> = chunks
                .into_iter()
                .filter_map(|c| c.data)
                .filter(|data| !data.is_empty())
                .map(|data| AudioChunk { data })
                .collect();
            if !chunks.is_empty() {
                messages.push(ServerMessage::AudioChunks(chunks));
            }
        }
        Ok(messages)
    }
}

/// One command issued to a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Connect(String),
    Play,
    Pause,
    Stop,
    SetWeightedPrompts(Vec<WeightedPrompt>),
    SetMusicGenerationConfig(WireGenerationConfig),
    ResetContext,
}

/// Transport that records every command instead of talking to a service.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    calls: Vec<TransportCall>,
    fail_connect: bool,
    fail_prompts: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `connect` calls fail.
    pub fn fail_connect(&mut self, fail: bool) {
        self.fail_connect = fail;
    }

    /// Make subsequent `set_weighted_prompts` calls fail.
    pub fn fail_prompts(&mut self, fail: bool) {
        self.fail_prompts = fail;
    }

    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<TransportCall> {
        std::mem::take(&mut self.calls)
    }
}

impl GenerationTransport for RecordingTransport {
    fn connect(&mut self, model: &str) -> Result<(), PianoDjError> {
        self.calls.push(TransportCall::Connect(model.to_string()));
        if self.fail_connect {
            return Err(PianoDjError::Transport("connection refused".to_string()));
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), PianoDjError> {
        self.calls.push(TransportCall::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PianoDjError> {
        self.calls.push(TransportCall::Pause);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PianoDjError> {
        self.calls.push(TransportCall::Stop);
        Ok(())
    }

    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> Result<(), PianoDjError> {
        self.calls
            .push(TransportCall::SetWeightedPrompts(prompts.to_vec()));
        if self.fail_prompts {
            return Err(PianoDjError::Transport("prompts rejected".to_string()));
        }
        Ok(())
    }

    fn set_music_generation_config(
        &mut self,
        config: &GenerationConfig,
    ) -> Result<(), PianoDjError> {
        self.calls
            .push(TransportCall::SetMusicGenerationConfig(config.to_wire()));
        Ok(())
    }

    fn reset_context(&mut self) -> Result<(), PianoDjError> {
        self.calls.push(TransportCall::ResetContext);
        Ok(())
    }
}
