//! Offset estimation between the video's audio (reference) and an external
//! recording (other).
//!
//! The shorter input supplies the template (capped at `template_secs`); the
//! longer one is searched, bounded by `max_offset`. The template's origin
//! decides the sign of the result:
//! - template from other: `+lag / reference_rate` (other starts later)
//! - template from reference: `-lag / other_rate` (other starts earlier)
//!
//! Equal lengths take the template from the other input.

use crate::models::{CorrelationMethodTag, MaxOffset, PcmBuffer, SyncResult, TemplateSource};

use super::correlation::{argmax, valid_cross_correlation};
use super::{AnalysisError, AnalysisResult, SignalRole};

/// Tunables for offset estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatorConfig {
    /// Upper bound on the searched offset.
    pub max_offset: MaxOffset,
    /// Longest template to correlate, in seconds.
    pub template_secs: f64,
    /// Guard added to normalization denominators.
    pub epsilon: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_offset: MaxOffset::default(),
            template_secs: 30.0,
            epsilon: 1e-8,
        }
    }
}

impl EstimatorConfig {
    /// Same config with a different search bound.
    pub fn with_max_offset(mut self, max_offset: MaxOffset) -> Self {
        self.max_offset = max_offset;
        self
    }
}

/// Estimate how far `other` is shifted against `reference`.
pub fn estimate_offset(
    reference: &PcmBuffer,
    other: &PcmBuffer,
    config: &EstimatorConfig,
) -> AnalysisResult<SyncResult> {
    if !(config.template_secs.is_finite() && config.template_secs > 0.0) {
        return Err(AnalysisError::InvalidConfig(format!(
            "template length must be positive, got {}",
            config.template_secs
        )));
    }

    let reference_norm = normalize(reference, SignalRole::Reference, config.epsilon)?;
    let other_norm = normalize(other, SignalRole::Other, config.epsilon)?;

    let template_source = if reference.len() < other.len() {
        TemplateSource::Reference
    } else {
        TemplateSource::Other
    };

    let (template_full, template_rate, search_full, search_rate) = match template_source {
        TemplateSource::Reference => (
            &reference_norm,
            reference.sample_rate(),
            &other_norm,
            other.sample_rate(),
        ),
        TemplateSource::Other => (
            &other_norm,
            other.sample_rate(),
            &reference_norm,
            reference.sample_rate(),
        ),
    };

    let template_cap = seconds_to_samples(config.template_secs, template_rate).max(1);
    let template_len = template_full.len().min(template_cap);
    let template = &template_full[..template_len];

    let search_bound = seconds_to_samples(config.max_offset.seconds(), search_rate);
    let search_len = search_full
        .len()
        .min(template_len.saturating_add(search_bound));
    let search = &search_full[..search_len];

    tracing::debug!(
        "Correlating template ({} from {}, {} samples) against search ({} samples)",
        template_source,
        if template_source.is_reference() { "video" } else { "external" },
        template_len,
        search_len
    );

    let correlation = valid_cross_correlation(search, template);
    let (lag, peak) = argmax(&correlation).ok_or_else(|| {
        AnalysisError::Correlation("correlation produced no lags".to_string())
    })?;

    let template_norm = energy(template).sqrt();
    let search_norm = energy(search).sqrt();
    let confidence = (peak / (template_norm * search_norm + config.epsilon)).clamp(0.0, 1.0);

    let offset_seconds = match template_source {
        TemplateSource::Other => lag as f64 / search_rate as f64,
        TemplateSource::Reference => -(lag as f64) / search_rate as f64,
    };

    tracing::debug!(
        "Peak at lag {} (value {:.4}), offset {:+.4}s, confidence {:.3}",
        lag,
        peak,
        offset_seconds,
        confidence
    );

    Ok(SyncResult {
        offset_seconds,
        confidence,
        correlation_peak: peak,
        sample_rate: reference.sample_rate(),
        method: CorrelationMethodTag::CrossCorrelation,
        template_source,
        lag_samples: lag,
    })
}

/// Scale to unit peak, rejecting empty or silent input.
fn normalize(buffer: &PcmBuffer, role: SignalRole, epsilon: f64) -> AnalysisResult<Vec<f64>> {
    if buffer.is_empty() || buffer.is_silent() {
        return Err(AnalysisError::DegenerateSignal { which: role });
    }
    let scale = buffer.peak_amplitude() as f64 + epsilon;
    Ok(buffer.samples().iter().map(|&s| s as f64 / scale).collect())
}

fn seconds_to_samples(seconds: f64, rate: u32) -> usize {
    (seconds * rate as f64).round() as usize
}

fn energy(signal: &[f64]) -> f64 {
    signal.iter().map(|x| x * x).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic xorshift noise in [-amp, amp].
    fn noise(seed: u64, n: usize, amp: f32) -> Vec<f32> {
        let mut state = seed.max(1);
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state % 20001) as f32 / 10000.0 - 1.0) * amp
            })
            .collect()
    }

    fn buffer(samples: Vec<f32>, rate: u32) -> PcmBuffer {
        PcmBuffer::new(samples, rate).unwrap()
    }

    #[test]
    fn other_starting_into_video_gives_positive_offset() {
        let template = noise(42, 500, 1.0);

        let mut reference = vec![0.0f32; 1000];
        reference.extend_from_slice(&template);
        reference.extend(noise(3, 500, 0.05));

        let mut other = template.clone();
        other.extend(noise(9, 200, 1.0));

        let result = estimate_offset(
            &buffer(reference, 1000),
            &buffer(other, 1000),
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(result.template_source, TemplateSource::Other);
        assert_eq!(result.lag_samples, 1000);
        assert!((result.offset_seconds - 1.0).abs() < 1e-12);
        assert_eq!(result.sample_rate, 1000);
    }

    #[test]
    fn other_starting_before_video_gives_negative_offset() {
        let template = noise(5, 500, 1.0);

        let mut reference = template.clone();
        reference.extend(noise(17, 100, 0.05));

        let mut other = vec![0.0f32; 700];
        other.extend_from_slice(&template);
        other.extend(noise(23, 200, 1.0));

        let result = estimate_offset(
            &buffer(reference, 1000),
            &buffer(other, 1000),
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(result.template_source, TemplateSource::Reference);
        assert_eq!(result.lag_samples, 700);
        assert!((result.offset_seconds + 0.7).abs() < 1e-12);
    }

    #[test]
    fn result_reports_video_rate_when_template_is_video() {
        let template = noise(5, 500, 1.0);

        let mut reference = template.clone();
        reference.extend(noise(17, 100, 0.05));

        let mut other = vec![0.0f32; 700];
        other.extend_from_slice(&template);
        other.extend(noise(23, 200, 1.0));

        let result = estimate_offset(
            &buffer(reference, 1000),
            &buffer(other, 2000),
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(result.template_source, TemplateSource::Reference);
        assert_eq!(result.lag_samples, 700);
        assert!((result.offset_seconds + 0.35).abs() < 1e-12);
        assert_eq!(result.sample_rate, 1000);
    }

    #[test]
    fn identical_signals_align_with_full_confidence() {
        let signal = noise(99, 4000, 0.8);
        let result = estimate_offset(
            &buffer(signal.clone(), 2000),
            &buffer(signal, 2000),
            &EstimatorConfig::default(),
        )
        .unwrap();

        assert_eq!(result.template_source, TemplateSource::Other);
        assert!(result.offset_seconds.abs() < 1.0 / 2000.0);
        assert!(result.confidence > 0.99, "confidence {}", result.confidence);
        assert!(result.confidence <= 1.0);
    }

    #[test]
    fn confidence_stays_in_unit_range() {
        for seed in 1..20u64 {
            let reference = noise(seed, 900 + (seed as usize * 37) % 400, 1.0);
            let other = noise(seed * 31 + 7, 300 + (seed as usize * 53) % 900, 0.3);
            let result = estimate_offset(
                &buffer(reference, 500),
                &buffer(other, 500),
                &EstimatorConfig::default(),
            )
            .unwrap();
            assert!(
                (0.0..=1.0).contains(&result.confidence),
                "seed {seed}: {}",
                result.confidence
            );
        }
    }

    #[test]
    fn search_is_bounded_by_max_offset() {
        let template = noise(8, 200, 1.0);

        // True lag (3 s) lies beyond a 1 s bound; the estimate must stay inside it.
        let mut reference = vec![0.0f32; 300];
        reference.extend_from_slice(&template);
        reference.extend(noise(4, 100, 0.05));

        let config = EstimatorConfig::default().with_max_offset(MaxOffset::new(1.0).unwrap());
        let result = estimate_offset(
            &buffer(reference, 100),
            &buffer(template, 100),
            &config,
        )
        .unwrap();

        assert!(result.lag_samples <= 100);
        assert!(result.offset_seconds <= 1.0);
    }

    #[test]
    fn template_is_capped() {
        let signal = noise(12, 3000, 1.0);
        let mut reference = vec![0.0f32; 250];
        reference.extend_from_slice(&signal);

        let config = EstimatorConfig {
            template_secs: 1.0,
            ..EstimatorConfig::default()
        };
        let result = estimate_offset(
            &buffer(reference, 1000),
            &buffer(signal, 1000),
            &config,
        )
        .unwrap();

        assert_eq!(result.lag_samples, 250);
        assert!((result.offset_seconds - 0.25).abs() < 1e-12);
    }

    #[test]
    fn silent_or_empty_input_is_degenerate() {
        let good = buffer(noise(1, 100, 1.0), 1000);

        let err = estimate_offset(&buffer(vec![0.0; 100], 1000), &good, &EstimatorConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DegenerateSignal {
                which: SignalRole::Reference
            }
        ));

        let err = estimate_offset(&good, &buffer(Vec::new(), 1000), &EstimatorConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DegenerateSignal {
                which: SignalRole::Other
            }
        ));
    }
}
