//! Offset correction: shift a buffer in time by padding or trimming its start.

use std::path::Path;

use crate::ingest::wav::write_pcm16;
use crate::models::{OverTrimPolicy, PcmBuffer};

/// Errors from applying an offset.
#[derive(Debug, thiserror::Error)]
pub enum CorrectionError {
    /// A negative offset would remove more samples than the buffer holds.
    #[error("Offset of {offset_seconds:.3}s trims {requested} samples but only {available} are available")]
    OverTrim {
        offset_seconds: f64,
        requested: usize,
        available: usize,
    },

    /// Padding would need more samples than a buffer can hold.
    #[error("Offset of {offset_seconds:.3}s needs more than {limit} samples of padding")]
    OffsetTooLarge { offset_seconds: f64, limit: usize },

    /// Offset is NaN or infinite.
    #[error("Offset must be a finite number of seconds, got {0}")]
    NonFiniteOffset(f64),

    /// Writing the aligned audio failed.
    #[error("Failed to write aligned audio to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Longest padded buffer `apply_offset` will build: 24 hours at 192 kHz.
pub const MAX_PADDED_SAMPLES: usize = 24 * 3600 * 192_000;

/// Shift `buffer` by `offset_seconds`.
///
/// - positive: prepend `round(offset · rate)` zeros
/// - negative: drop the first `round(|offset| · rate)` samples
/// - zero: unchanged copy
///
/// Trimming past the end yields an empty buffer under
/// [`OverTrimPolicy::Empty`] and an error under [`OverTrimPolicy::Error`].
pub fn apply_offset(
    buffer: &PcmBuffer,
    offset_seconds: f64,
    policy: OverTrimPolicy,
) -> Result<PcmBuffer, CorrectionError> {
    if !offset_seconds.is_finite() {
        return Err(CorrectionError::NonFiniteOffset(offset_seconds));
    }

    let shift = buffer.samples_for(offset_seconds);

    let samples = if offset_seconds > 0.0 {
        let total = shift
            .checked_add(buffer.len())
            .filter(|&n| n <= MAX_PADDED_SAMPLES)
            .ok_or(CorrectionError::OffsetTooLarge {
                offset_seconds,
                limit: MAX_PADDED_SAMPLES,
            })?;
        let mut padded = Vec::with_capacity(total);
        padded.resize(shift, 0.0);
        padded.extend_from_slice(buffer.samples());
        tracing::debug!("Padding {} samples ({:+.3}s)", shift, offset_seconds);
        padded
    } else if offset_seconds < 0.0 {
        if shift > buffer.len() && policy == OverTrimPolicy::Error {
            return Err(CorrectionError::OverTrim {
                offset_seconds,
                requested: shift,
                available: buffer.len(),
            });
        }
        tracing::debug!("Trimming {} samples ({:+.3}s)", shift, offset_seconds);
        buffer.samples().get(shift..).unwrap_or(&[]).to_vec()
    } else {
        buffer.samples().to_vec()
    };

    Ok(buffer.with_samples(samples))
}

/// Write the aligned buffer to `path` as canonical 16-bit mono WAV.
pub fn write_aligned(path: &Path, buffer: &PcmBuffer) -> Result<(), CorrectionError> {
    write_pcm16(path, buffer).map_err(|source| CorrectionError::Write {
        path: path.display().to_string(),
        source,
    })
}
