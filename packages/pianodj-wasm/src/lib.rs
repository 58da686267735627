use pianodj::config::SessionConfig;
use pianodj::playback::{
    ChunkOutcome, GainRamp, PlaybackScheduler, PlaybackState, RecordingSink, ScheduledStart,
};
use pianodj::{NoteEvent, PianoDjError};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize, Debug, PartialEq)]
struct ErrorReport {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<usize>,
}

impl From<PianoDjError> for ErrorReport {
    fn from(e: PianoDjError) -> Self {
        let offset = match &e {
            PianoDjError::Format { offset, .. } => Some(*offset),
            _ => None,
        };
        ErrorReport {
            kind: e.kind(),
            message: e.to_string(),
            offset,
        }
    }
}

fn error_json(e: PianoDjError) -> String {
    let report = ErrorReport::from(e);
    serde_json::to_string(&report).unwrap_or_else(|_| report.message.clone())
}

fn to_js_error(e: PianoDjError) -> JsValue {
    JsValue::from_str(&error_json(e))
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

/// Import a Standard MIDI File and return `{ notes, tempoBpm }` as JSON
#[wasm_bindgen]
pub fn import_midi(bytes: &[u8], by_program: bool) -> Result<String, JsValue> {
    let imported = if by_program {
        pianodj::import_midi_by_program(bytes)
    } else {
        pianodj::import_midi(bytes)
    }
    .map_err(to_js_error)?;
    serde_json::to_string(&imported).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Build the melody prompt for an array of note events
#[wasm_bindgen]
pub fn melody_prompt(
    notes: JsValue,
    bpm: u32,
    instrument: &str,
) -> Result<Option<String>, JsValue> {
    let notes: Vec<NoteEvent> = serde_wasm_bindgen::from_value(notes)?;
    Ok(pianodj::melody_prompt(&notes, bpm, instrument))
}

/// Decode a base64 PCM16 chunk into `{ sampleRate, channels: number[][] }`
#[wasm_bindgen]
pub fn decode_audio_chunk(
    payload: &str,
    sample_rate: u32,
    channels: usize,
) -> Result<JsValue, JsValue> {
    let buffer = pianodj::decode_chunk(payload, sample_rate, channels).map_err(to_js_error)?;
    serialize(&buffer)
}

/// Encode recorded samples as `{ data, mimeType }`
#[wasm_bindgen]
pub fn create_blob(samples: &[f32], sample_rate: u32) -> Result<JsValue, JsValue> {
    serialize(&pianodj::create_blob(samples, sample_rate))
}

/// What the host must do with its audio graph after one call.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PlayerReport {
    outcome: &'static str,
    state: PlaybackState,
    starts: Vec<ScheduledStart>,
    gain_ramps: Vec<GainRamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
}

impl PlayerReport {
    fn new(outcome: &'static str, state: PlaybackState, sink: &mut RecordingSink) -> Self {
        let (starts, gain_ramps) = sink.drain();
        PlayerReport {
            outcome,
            state,
            starts,
            gain_ramps,
            error: None,
        }
    }

    fn from_chunk(outcome: ChunkOutcome, state: PlaybackState, sink: &mut RecordingSink) -> Self {
        match outcome {
            ChunkOutcome::Scheduled { .. } => Self::new("scheduled", state, sink),
            ChunkOutcome::Underrun => Self::new("underrun", state, sink),
            ChunkOutcome::Ignored(_) => Self::new("ignored", state, sink),
            ChunkOutcome::Rejected(e) => PlayerReport {
                error: Some(e.into()),
                ..Self::new("rejected", state, sink)
            },
        }
    }
}

/// Playback scheduler driven by the host's `AudioContext` clock.
///
/// Every method takes the current audio time and returns the buffer starts
/// and gain ramps the host should apply.
#[wasm_bindgen]
pub struct Player {
    config: SessionConfig,
    scheduler: PlaybackScheduler,
    sink: RecordingSink,
}

impl Player {
    fn with_config(config: SessionConfig) -> Self {
        Player {
            scheduler: PlaybackScheduler::new(&config),
            sink: RecordingSink::new(0.0),
            config,
        }
    }

    fn report(&mut self, outcome: &'static str) -> PlayerReport {
        PlayerReport::new(outcome, self.scheduler.state(), &mut self.sink)
    }
}

#[wasm_bindgen]
impl Player {
    /// Create a player, optionally from a YAML session configuration
    #[wasm_bindgen(constructor)]
    pub fn new(config_yaml: Option<String>) -> Result<Player, JsValue> {
        let config = match config_yaml {
            Some(yaml) => SessionConfig::from_yaml(&yaml).map_err(to_js_error)?,
            None => SessionConfig::default(),
        };
        Ok(Player::with_config(config))
    }

    /// Encode recorded microphone samples at the session's record rate
    pub fn record_blob(&self, samples: &[f32]) -> Result<JsValue, JsValue> {
        serialize(&self.config.record_blob(samples))
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        serialize(&self.scheduler.state())
    }

    pub fn play(&mut self, now: f64) -> Result<JsValue, JsValue> {
        self.sink.set_time(now);
        self.scheduler.play(&mut self.sink).map_err(to_js_error)?;
        serialize(&self.report("play"))
    }

    pub fn pause(&mut self, now: f64) -> Result<JsValue, JsValue> {
        self.sink.set_time(now);
        self.scheduler.pause(&mut self.sink).map_err(to_js_error)?;
        serialize(&self.report("pause"))
    }

    pub fn stop(&mut self, now: f64) -> Result<JsValue, JsValue> {
        self.sink.set_time(now);
        self.scheduler.stop(&mut self.sink);
        serialize(&self.report("stop"))
    }

    /// Connection to the generation service failed
    pub fn fail(&mut self, now: f64) -> Result<JsValue, JsValue> {
        self.sink.set_time(now);
        self.scheduler.fail_transport(&mut self.sink);
        serialize(&self.report("stop"))
    }

    /// Fire the delayed Loading to Playing transition; returns the new state if any
    pub fn tick(&mut self, now: f64) -> Result<JsValue, JsValue> {
        match self.scheduler.tick(now) {
            Some(state) => serialize(&state),
            None => Ok(JsValue::NULL),
        }
    }

    /// Schedule one base64 audio chunk received at audio time `now`
    pub fn on_chunk(&mut self, payload: &str, now: f64) -> Result<JsValue, JsValue> {
        self.sink.set_time(now);
        let outcome = self.scheduler.handle_chunk(payload, &mut self.sink);
        let report = PlayerReport::from_chunk(outcome, self.scheduler.state(), &mut self.sink);
        serialize(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pianodj::pcm::{bytes_to_base64, float32_to_pcm16};

    #[test]
    fn test_error_json_carries_offset() {
        let json = error_json(PianoDjError::Format {
            offset: 14,
            message: "missing MTrk header at track 0".to_string(),
        });
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "format");
        assert_eq!(value["offset"], 14);

        let json = error_json(PianoDjError::Decode("bad".to_string()));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "decode");
        assert!(value.get("offset").is_none());
    }

    #[test]
    fn test_chunk_report_drains_sink() {
        let mut player = Player::with_config(SessionConfig::default());
        player.sink.set_time(1.0);
        player.scheduler.play(&mut player.sink).unwrap();
        let _ = player.report("play");

        let payload = bytes_to_base64(&float32_to_pcm16(&[0.0; 960]));
        let outcome = player.scheduler.handle_chunk(&payload, &mut player.sink);
        let report = PlayerReport::from_chunk(outcome, player.scheduler.state(), &mut player.sink);

        assert_eq!(report.outcome, "scheduled");
        assert_eq!(report.starts.len(), 1);
        assert_eq!(report.starts[0].at, 3.0);
        assert!(player.sink.starts().is_empty());
    }

    #[test]
    fn test_import_reports_tempo() {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0]);
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&[0, 0, 0, 16, 0x00, 0xFF, 0x51, 0x03, 0x09, 0x27, 0xC0]);
        bytes.extend_from_slice(&[0x00, 0x90, 60, 100, 0x83, 0x60, 0x80, 60, 0]);

        let json = import_midi(&bytes, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["tempoBpm"], 100);
        assert_eq!(value["notes"][0]["durationMs"], 600.0);
    }

    #[test]
    fn test_rejected_chunk_report() {
        let mut player = Player::with_config(SessionConfig::default());
        player.scheduler.play(&mut player.sink).unwrap();
        let outcome = player.scheduler.handle_chunk("%%%", &mut player.sink);
        let report = PlayerReport::from_chunk(outcome, player.scheduler.state(), &mut player.sink);

        assert_eq!(report.outcome, "rejected");
        assert_eq!(report.error.map(|e| e.kind), Some("decode"));
        assert_eq!(report.state, PlaybackState::Loading);
    }
}
