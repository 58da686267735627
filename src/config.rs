//! # Session Configuration
//!
//! Explicit configuration handed to the scheduler, the session controller
//! and the transport. Loadable from a YAML document; every field has a
//! default so an empty document is valid.
//!
//! ## Example
//! ```rust
//! use pianodj::config::{DensityMode, Scale, SessionConfig};
//!
//! let config = SessionConfig::from_yaml(
//!     "buffer-time-seconds: 1.5\ngeneration:\n  density: 0.4\n  scale: D_MAJOR_B_MINOR\n",
//! )
//! .unwrap();
//!
//! assert_eq!(config.buffer_time_seconds, 1.5);
//! assert_eq!(config.sample_rate, 48_000);
//! assert_eq!(config.generation.density, DensityMode::Fixed(0.4));
//! assert_eq!(config.generation.brightness, DensityMode::Auto);
//! assert_eq!(config.generation.scale, Scale::DMajorBMinor);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PianoDjError;
use crate::pcm::{create_blob, PcmBlob};

pub const DEFAULT_MODEL: &str = "lyria-realtime-exp";
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_CHANNELS: usize = 2;
pub const DEFAULT_BUFFER_TIME_SECONDS: f64 = 2.0;
pub const DEFAULT_RECORD_SAMPLE_RATE: u32 = 16_000;
pub const DEFAULT_MELODY_PROMPT_WEIGHT: f64 = 1.5;

/// Settings for one playback session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionConfig {
    /// Generation model requested from the service.
    pub model: String,
    /// Sample rate of incoming PCM chunks.
    pub sample_rate: u32,
    /// Channel count of incoming PCM chunks (interleaved).
    pub channels: usize,
    /// Priming delay before the first chunk after (re)priming.
    pub buffer_time_seconds: f64,
    /// Sample rate of outgoing audio blobs.
    pub record_sample_rate: u32,
    pub melody_prompt_weight: f64,
    pub generation: GenerationConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            buffer_time_seconds: DEFAULT_BUFFER_TIME_SECONDS,
            record_sample_rate: DEFAULT_RECORD_SAMPLE_RATE,
            melody_prompt_weight: DEFAULT_MELODY_PROMPT_WEIGHT,
            generation: GenerationConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a YAML configuration document.
    pub fn from_yaml(content: &str) -> Result<Self, PianoDjError> {
        // An empty document deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SessionConfig =
            serde_yaml::from_str(content).map_err(|e| PianoDjError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PianoDjError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PianoDjError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), PianoDjError> {
        if self.sample_rate == 0 || self.record_sample_rate == 0 {
            return Err(PianoDjError::Config(
                "sample rates must be greater than zero".to_string(),
            ));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(PianoDjError::Config(format!(
                "unsupported channel count {} (expected 1 or 2)",
                self.channels
            )));
        }
        if !self.buffer_time_seconds.is_finite() || self.buffer_time_seconds <= 0.0 {
            return Err(PianoDjError::Config(format!(
                "buffer-time-seconds must be positive, got {}",
                self.buffer_time_seconds
            )));
        }
        Ok(())
    }

    /// Encode recorded samples at the configured record rate.
    pub fn record_blob(&self, samples: &[f32]) -> PcmBlob {
        create_blob(samples, self.record_sample_rate)
    }
}

/// Density or brightness: left to the service, or pinned to a value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DensityMode {
    #[default]
    Auto,
    Fixed(f32),
}

impl DensityMode {
    pub fn value(self) -> Option<f32> {
        match self {
            DensityMode::Auto => None,
            DensityMode::Fixed(v) => Some(v),
        }
    }
}

impl From<Option<f32>> for DensityMode {
    fn from(value: Option<f32>) -> Self {
        value.map_or(DensityMode::Auto, DensityMode::Fixed)
    }
}

/// Musical scale, one variant per major / relative minor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scale {
    #[default]
    #[serde(rename = "SCALE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "C_MAJOR_A_MINOR")]
    CMajorAMinor,
    #[serde(rename = "D_FLAT_MAJOR_B_FLAT_MINOR")]
    DFlatMajorBFlatMinor,
    #[serde(rename = "D_MAJOR_B_MINOR")]
    DMajorBMinor,
    #[serde(rename = "E_FLAT_MAJOR_C_MINOR")]
    EFlatMajorCMinor,
    #[serde(rename = "E_MAJOR_D_FLAT_MINOR")]
    EMajorDFlatMinor,
    #[serde(rename = "F_MAJOR_D_MINOR")]
    FMajorDMinor,
    #[serde(rename = "G_FLAT_MAJOR_E_FLAT_MINOR")]
    GFlatMajorEFlatMinor,
    #[serde(rename = "G_MAJOR_E_MINOR")]
    GMajorEMinor,
    #[serde(rename = "A_FLAT_MAJOR_F_MINOR")]
    AFlatMajorFMinor,
    #[serde(rename = "A_MAJOR_G_FLAT_MINOR")]
    AMajorGFlatMinor,
    #[serde(rename = "B_FLAT_MAJOR_G_MINOR")]
    BFlatMajorGMinor,
    #[serde(rename = "B_MAJOR_A_FLAT_MINOR")]
    BMajorAFlatMinor,
}

impl Scale {
    pub const ALL: [Scale; 13] = [
        Scale::Unspecified,
        Scale::CMajorAMinor,
        Scale::DFlatMajorBFlatMinor,
        Scale::DMajorBMinor,
        Scale::EFlatMajorCMinor,
        Scale::EMajorDFlatMinor,
        Scale::FMajorDMinor,
        Scale::GFlatMajorEFlatMinor,
        Scale::GMajorEMinor,
        Scale::AFlatMajorFMinor,
        Scale::AMajorGFlatMinor,
        Scale::BFlatMajorGMinor,
        Scale::BMajorAFlatMinor,
    ];

    /// Name sent to the generation service.
    pub fn wire_name(self) -> &'static str {
        match self {
            Scale::Unspecified => "SCALE_UNSPECIFIED",
            Scale::CMajorAMinor => "C_MAJOR_A_MINOR",
            Scale::DFlatMajorBFlatMinor => "D_FLAT_MAJOR_B_FLAT_MINOR",
            Scale::DMajorBMinor => "D_MAJOR_B_MINOR",
            Scale::EFlatMajorCMinor => "E_FLAT_MAJOR_C_MINOR",
            Scale::EMajorDFlatMinor => "E_MAJOR_D_FLAT_MINOR",
            Scale::FMajorDMinor => "F_MAJOR_D_MINOR",
            Scale::GFlatMajorEFlatMinor => "G_FLAT_MAJOR_E_FLAT_MINOR",
            Scale::GMajorEMinor => "G_MAJOR_E_MINOR",
            Scale::AFlatMajorFMinor => "A_FLAT_MAJOR_F_MINOR",
            Scale::AMajorGFlatMinor => "A_MAJOR_G_FLAT_MINOR",
            Scale::BFlatMajorGMinor => "B_FLAT_MAJOR_G_MINOR",
            Scale::BMajorAFlatMinor => "B_MAJOR_A_FLAT_MINOR",
        }
    }

    /// Label shown in the settings panel.
    pub fn label(self) -> &'static str {
        match self {
            Scale::Unspecified => "Auto",
            Scale::CMajorAMinor => "C Major / A Minor",
            Scale::DFlatMajorBFlatMinor => "C# Major / A# Minor",
            Scale::DMajorBMinor => "D Major / B Minor",
            Scale::EFlatMajorCMinor => "D# Major / C Minor",
            Scale::EMajorDFlatMinor => "E Major / C# Minor",
            Scale::FMajorDMinor => "F Major / D Minor",
            Scale::GFlatMajorEFlatMinor => "F# Major / D# Minor",
            Scale::GMajorEMinor => "G Major / E Minor",
            Scale::AFlatMajorFMinor => "G# Major / F Minor",
            Scale::AMajorGFlatMinor => "A Major / F# Minor",
            Scale::BFlatMajorGMinor => "A# Major / G Minor",
            Scale::BMajorAFlatMinor => "B Major / G# Minor",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Scale> {
        Scale::ALL.into_iter().find(|s| s.wire_name() == name)
    }
}

/// Music generation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawGenerationConfig")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub guidance: f32,
    pub seed: Option<u32>,
    pub bpm: Option<u32>,
    pub density: DensityMode,
    pub brightness: DensityMode,
    pub scale: Scale,
    pub mute_bass: bool,
    pub mute_drums: bool,
    pub only_bass_and_drums: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.1,
            top_k: 40,
            guidance: 4.0,
            seed: None,
            bpm: None,
            density: DensityMode::Auto,
            brightness: DensityMode::Auto,
            scale: Scale::Unspecified,
            mute_bass: false,
            mute_drums: false,
            only_bass_and_drums: false,
        }
    }
}

/// Raw generation settings for YAML deserialization
///
/// A missing `density` / `brightness` means "auto".
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", default)]
struct RawGenerationConfig {
    temperature: Option<f32>,
    top_k: Option<u32>,
    guidance: Option<f32>,
    seed: Option<u32>,
    bpm: Option<u32>,
    density: Option<f32>,
    brightness: Option<f32>,
    scale: Option<Scale>,
    mute_bass: bool,
    mute_drums: bool,
    only_bass_and_drums: bool,
}

impl From<RawGenerationConfig> for GenerationConfig {
    fn from(raw: RawGenerationConfig) -> Self {
        let defaults = GenerationConfig::default();
        Self {
            temperature: raw.temperature.unwrap_or(defaults.temperature),
            top_k: raw.top_k.unwrap_or(defaults.top_k),
            guidance: raw.guidance.unwrap_or(defaults.guidance),
            seed: raw.seed,
            bpm: raw.bpm,
            density: raw.density.into(),
            brightness: raw.brightness.into(),
            scale: raw.scale.unwrap_or_default(),
            mute_bass: raw.mute_bass,
            mute_drums: raw.mute_drums,
            only_bass_and_drums: raw.only_bass_and_drums,
        }
    }
}

/// Generation config as the service expects it on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub guidance: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f32>,
    pub scale: Scale,
    pub mute_bass: bool,
    pub mute_drums: bool,
    pub only_bass_and_drums: bool,
}

impl GenerationConfig {
    /// Convert to the wire shape. `Auto` modes become absent fields.
    pub fn to_wire(&self) -> WireGenerationConfig {
        WireGenerationConfig {
            temperature: self.temperature,
            top_k: self.top_k,
            guidance: self.guidance,
            seed: self.seed,
            bpm: self.bpm,
            density: self.density.value(),
            brightness: self.brightness.value(),
            scale: self.scale,
            mute_bass: self.mute_bass,
            mute_drums: self.mute_drums,
            only_bass_and_drums: self.only_bass_and_drums,
        }
    }
}
