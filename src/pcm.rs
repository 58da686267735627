//! # PCM Codec
//!
//! Conversions between the base64 audio payloads exchanged with the
//! generation service and the per-channel float buffers played locally.
//!
//! - [`base64_to_bytes`] / [`bytes_to_base64`] - standard alphabet, padded
//! - [`pcm16_to_float32`] - little-endian signed 16-bit → `[-1, 1)`, deinterleaved
//! - [`float32_to_pcm16`] - inverse direction, clamped to the int16 range
//! - [`decode_chunk`] - payload string straight to an [`AudioBuffer`]
//! - [`create_blob`] - mono float samples to an outgoing [`PcmBlob`]
//!
//! ## Example
//! ```rust
//! use pianodj::pcm::{bytes_to_base64, decode_chunk, float32_to_pcm16};
//!
//! // One stereo frame: left = 0.5, right = -0.5
//! let payload = bytes_to_base64(&float32_to_pcm16(&[0.5, -0.5]));
//! let buffer = decode_chunk(&payload, 48_000, 2).unwrap();
//!
//! assert_eq!(buffer.channels, vec![vec![0.5], vec![-0.5]]);
//! assert_eq!(buffer.frames(), 1);
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

use crate::error::PianoDjError;

const PCM16_SCALE: f32 = 32768.0;

/// Decoded audio ready to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBuffer {
    pub sample_rate: u32,
    /// One equally sized sample vector per channel.
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Outgoing audio payload in the wire shape of the generation service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PcmBlob {
    pub data: String,
    pub mime_type: String,
}

pub fn base64_to_bytes(payload: &str) -> Result<Vec<u8>, PianoDjError> {
    STANDARD
        .decode(payload)
        .map_err(|e| PianoDjError::Decode(e.to_string()))
}

pub fn bytes_to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Interpret `bytes` as interleaved little-endian PCM16 and split it into
/// `num_channels` float sequences scaled by 1/32768.
///
/// # Errors
/// [`PianoDjError::Length`] if `num_channels` is zero or the byte length is
/// not a multiple of `2 * num_channels`.
pub fn pcm16_to_float32(bytes: &[u8], num_channels: usize) -> Result<Vec<Vec<f32>>, PianoDjError> {
    let length_error = || PianoDjError::Length {
        len: bytes.len(),
        channels: num_channels,
    };
    let frame_bytes = num_channels
        .checked_mul(2)
        .filter(|_| num_channels > 0)
        .ok_or_else(length_error)?;
    if bytes.len() % frame_bytes != 0 {
        return Err(length_error());
    }

    let frames = bytes.len() / frame_bytes;
    let mut channels = vec![Vec::with_capacity(frames); num_channels];
    for (index, sample) in bytes.chunks_exact(2).enumerate() {
        let value = i16::from_le_bytes([sample[0], sample[1]]);
        channels[index % num_channels].push(f32::from(value) / PCM16_SCALE);
    }
    Ok(channels)
}

/// Encode float samples as little-endian PCM16.
///
/// Values are scaled by 32768 and clamped to `[-32768, 32767]`, then
/// truncated toward zero.
pub fn float32_to_pcm16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| {
            let scaled = (s * PCM16_SCALE).clamp(i16::MIN as f32, i16::MAX as f32);
            (scaled as i16).to_le_bytes()
        })
        .collect()
}

/// Decode one base64 audio chunk into an [`AudioBuffer`].
pub fn decode_chunk(
    payload: &str,
    sample_rate: u32,
    num_channels: usize,
) -> Result<AudioBuffer, PianoDjError> {
    let bytes = base64_to_bytes(payload)?;
    let channels = pcm16_to_float32(&bytes, num_channels)?;
    Ok(AudioBuffer {
        sample_rate,
        channels,
    })
}

/// Wrap recorded float samples as a base64 PCM16 blob tagged with its rate.
pub fn create_blob(samples: &[f32], sample_rate: u32) -> PcmBlob {
    PcmBlob {
        data: bytes_to_base64(&float32_to_pcm16(samples)),
        mime_type: format!("audio/pcm;rate={}", sample_rate),
    }
}
