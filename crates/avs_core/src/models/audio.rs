//! Canonical PCM buffer.

use serde::{Deserialize, Serialize};

/// Canonical analysis/mux sample rate (Hz).
pub const CANONICAL_SAMPLE_RATE: u32 = 22050;

/// Errors raised when constructing model values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Sample rate must be non-zero.
    #[error("Sample rate must be greater than zero")]
    ZeroSampleRate,

    /// Max offset must be a positive, finite duration.
    #[error("Max offset must be a positive duration, got {0}")]
    InvalidMaxOffset(f64),
}

/// Mono PCM audio with normalized float samples.
///
/// Samples are read-only once the buffer is built; operations that
/// change timing produce a new buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPcm")]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

/// Unchecked wire form; deserialization goes through [`PcmBuffer::new`].
#[derive(Deserialize)]
struct RawPcm {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl TryFrom<RawPcm> for PcmBuffer {
    type Error = ModelError;

    fn try_from(raw: RawPcm) -> Result<Self, Self::Error> {
        PcmBuffer::new(raw.samples, raw.sample_rate)
    }
}

impl PcmBuffer {
    /// Create a buffer from samples at the given rate.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, ModelError> {
        if sample_rate == 0 {
            return Err(ModelError::ZeroSampleRate);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create an empty buffer at the given rate.
    pub fn empty(sample_rate: u32) -> Result<Self, ModelError> {
        Self::new(Vec::new(), sample_rate)
    }

    /// Build a buffer from signed 16-bit samples, mapping to [-1, 1).
    pub fn from_i16(samples: &[i16], sample_rate: u32) -> Result<Self, ModelError> {
        let samples = samples.iter().map(|&s| s as f32 / 32768.0).collect();
        Self::new(samples, sample_rate)
    }

    /// New buffer holding `samples` at this buffer's rate.
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Sample values.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value (0.0 for an empty buffer).
    pub fn peak_amplitude(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Whether every sample is zero (or the buffer is empty).
    pub fn is_silent(&self) -> bool {
        self.peak_amplitude() == 0.0
    }

    /// Number of samples spanning `seconds` at this rate, rounded.
    pub fn samples_for(&self, seconds: f64) -> usize {
        (seconds.abs() * self.sample_rate as f64).round() as usize
    }

    /// Convert to signed 16-bit samples, clamping to the representable range.
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0).round() as i16)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializing_checks_sample_rate() {
        let zero = serde_json::from_str::<PcmBuffer>(r#"{"samples":[0.5,0.1],"sample_rate":0}"#);
        assert!(zero.is_err());

        let ok: PcmBuffer =
            serde_json::from_str(r#"{"samples":[0.5,0.1],"sample_rate":8000}"#).unwrap();
        assert_eq!(ok.sample_rate(), 8000);
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert_eq!(
            PcmBuffer::new(vec![0.1], 0).unwrap_err(),
            ModelError::ZeroSampleRate
        );
    }

    #[test]
    fn from_i16_normalizes_range() {
        let buffer = PcmBuffer::from_i16(&[i16::MIN, 0, 16384], 22050).unwrap();
        assert_eq!(buffer.samples()[0], -1.0);
        assert_eq!(buffer.samples()[1], 0.0);
        assert!((buffer.samples()[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn duration_and_peak() {
        let buffer = PcmBuffer::new(vec![0.0, -0.75, 0.5, 0.0], 4).unwrap();
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-12);
        assert_eq!(buffer.peak_amplitude(), 0.75);
        assert!(!buffer.is_silent());
    }

    #[test]
    fn empty_buffer_is_silent() {
        let buffer = PcmBuffer::empty(22050).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.is_silent());
    }

    #[test]
    fn samples_for_rounds() {
        let buffer = PcmBuffer::empty(22050).unwrap();
        assert_eq!(buffer.samples_for(2.5), 55125);
        assert_eq!(buffer.samples_for(-1.0), 22050);
        assert_eq!(buffer.samples_for(0.00003), 1);
    }

    #[test]
    fn to_i16_clamps() {
        let buffer = PcmBuffer::new(vec![2.0, -2.0, 0.0], 100).unwrap();
        assert_eq!(buffer.to_i16(), vec![32767, -32767, 0]);
    }
}
