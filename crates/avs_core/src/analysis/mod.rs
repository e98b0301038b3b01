//! Offset analysis between the video's audio and an external recording.
//!
//! # Architecture
//!
//! 1. **Correlation** (`correlation`): valid-mode cross-correlation, direct
//!    for small inputs and FFT-based (rustfft) otherwise.
//! 2. **Estimation** (`estimator`): normalizes both inputs, picks the
//!    template and search signal, finds the peak lag, scores confidence and
//!    converts the lag into a signed offset.

pub mod correlation;
mod estimator;

pub use estimator::{estimate_offset, EstimatorConfig};

/// Which of the two analysis inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRole {
    /// Audio extracted from the video.
    Reference,
    /// External audio file.
    Other,
}

impl std::fmt::Display for SignalRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalRole::Reference => write!(f, "video audio"),
            SignalRole::Other => write!(f, "external audio"),
        }
    }
}

/// Errors from offset analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Input is empty or has zero peak amplitude.
    #[error("The {which} is empty or completely silent")]
    DegenerateSignal { which: SignalRole },

    /// Correlation could not be evaluated.
    #[error("Correlation failed: {0}")]
    Correlation(String),

    /// Estimator settings are out of range.
    #[error("Invalid analysis settings: {0}")]
    InvalidConfig(String),
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
