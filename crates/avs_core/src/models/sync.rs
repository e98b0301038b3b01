//! Analysis result types.

use serde::{Deserialize, Serialize};

use super::audio::ModelError;
use super::enums::{ConfidenceLevel, CorrelationMethodTag, TemplateSource};

/// Upper bound on how far the offset search may look, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MaxOffset(f64);

impl MaxOffset {
    /// Default search bound.
    pub const DEFAULT_SECS: f64 = 60.0;

    /// Create a bound; must be positive and finite.
    pub fn new(seconds: f64) -> Result<Self, ModelError> {
        if seconds.is_finite() && seconds > 0.0 {
            Ok(Self(seconds))
        } else {
            Err(ModelError::InvalidMaxOffset(seconds))
        }
    }

    pub fn seconds(&self) -> f64 {
        self.0
    }
}

impl Default for MaxOffset {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

impl TryFrom<f64> for MaxOffset {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaxOffset> for f64 {
    fn from(value: MaxOffset) -> Self {
        value.0
    }
}

/// Outcome of one offset estimation.
///
/// A positive offset means the external audio starts that many seconds into
/// the video; negative means it starts before the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Signed offset in seconds.
    pub offset_seconds: f64,
    /// Normalized peak strength, clamped to [0, 1].
    pub confidence: f64,
    /// Raw correlation value at the peak.
    pub correlation_peak: f64,
    /// Rate used to convert the peak lag to seconds.
    pub sample_rate: u32,
    /// Method that produced this result.
    pub method: CorrelationMethodTag,
    /// Which input the template was cut from.
    pub template_source: TemplateSource,
    /// Peak lag in samples (unsigned position in the search signal).
    pub lag_samples: usize,
}

impl SyncResult {
    /// Offset in milliseconds.
    pub fn offset_ms(&self) -> f64 {
        self.offset_seconds * 1000.0
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }

    /// One-line description of what the offset means.
    pub fn interpretation(&self) -> String {
        if self.offset_seconds > 0.0 {
            format!(
                "External audio starts {:.3}s into the video",
                self.offset_seconds
            )
        } else if self.offset_seconds < 0.0 {
            format!(
                "External audio starts {:.3}s before the video",
                self.offset_seconds.abs()
            )
        } else {
            "External audio is already aligned with the video".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(offset: f64, confidence: f64) -> SyncResult {
        SyncResult {
            offset_seconds: offset,
            confidence,
            correlation_peak: 10.0,
            sample_rate: 22050,
            method: CorrelationMethodTag::CrossCorrelation,
            template_source: TemplateSource::Other,
            lag_samples: 0,
        }
    }

    #[test]
    fn max_offset_rejects_non_positive() {
        assert!(MaxOffset::new(0.0).is_err());
        assert!(MaxOffset::new(-5.0).is_err());
        assert!(MaxOffset::new(f64::NAN).is_err());
        assert_eq!(MaxOffset::new(120.0).unwrap().seconds(), 120.0);
        assert_eq!(MaxOffset::default().seconds(), 60.0);
    }

    #[test]
    fn interpretation_follows_sign() {
        assert_eq!(
            result(1.5, 0.9).interpretation(),
            "External audio starts 1.500s into the video"
        );
        assert_eq!(
            result(-0.25, 0.9).interpretation(),
            "External audio starts 0.250s before the video"
        );
        assert!(result(0.0, 0.9).interpretation().contains("aligned"));
    }

    #[test]
    fn level_and_ms() {
        let r = result(0.5, 0.55);
        assert_eq!(r.confidence_level(), ConfidenceLevel::Medium);
        assert_eq!(r.offset_ms(), 500.0);
    }
}
