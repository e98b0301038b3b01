//! Error types for the analyze and export flows.
//!
//! Every stage error is folded into [`FlowError`], the single error a flow
//! surfaces. Callers branch on [`FlowError::kind`] instead of message text.

use std::io;

use thiserror::Error;

use crate::analysis::{AnalysisError, SignalRole};
use crate::correction::CorrectionError;
use crate::ingest::DecodeError;
use crate::models::ModelError;
use crate::mux::PlanError;

/// Error surfaced by a flow.
#[derive(Error, Debug)]
pub enum FlowError {
    /// Audio could not be extracted or decoded.
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// One of the analysis inputs is empty or silent.
    #[error("The {which} is empty or completely silent")]
    DegenerateSignal { which: SignalRole },

    /// The transcoder exited non-zero. Displays its stderr verbatim.
    #[error("{stderr}")]
    Encode {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The transcoder program could not be launched.
    #[error("Required tool '{tool}' was not found")]
    ToolMissing { tool: String },

    /// Scratch or output file I/O failed.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The export plan could not be built.
    #[error("Invalid export settings: {0}")]
    Plan(#[from] PlanError),

    /// A negative offset trims past the end of the external audio.
    #[error("Offset of {offset_seconds:.3}s trims {requested} samples but only {available} are available")]
    OverTrim {
        offset_seconds: f64,
        requested: usize,
        available: usize,
    },

    /// A request or step precondition is not met.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A step finished without producing its output.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Another flow is already running.
    #[error("Another task is already running")]
    Busy,

    /// The background task panicked or was aborted.
    #[error("Background task failed: {0}")]
    TaskPanicked(String),
}

/// Coarse error category for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowErrorKind {
    Decode,
    DegenerateSignal,
    Encode,
    ToolMissing,
    Io,
    Plan,
    OverTrim,
    InvalidInput,
    Internal,
    Busy,
    TaskPanicked,
}

impl FlowError {
    pub fn kind(&self) -> FlowErrorKind {
        match self {
            FlowError::Decode(_) => FlowErrorKind::Decode,
            FlowError::DegenerateSignal { .. } => FlowErrorKind::DegenerateSignal,
            FlowError::Encode { .. } => FlowErrorKind::Encode,
            FlowError::ToolMissing { .. } => FlowErrorKind::ToolMissing,
            FlowError::Io { .. } => FlowErrorKind::Io,
            FlowError::Plan(_) => FlowErrorKind::Plan,
            FlowError::OverTrim { .. } => FlowErrorKind::OverTrim,
            FlowError::InvalidInput(_) => FlowErrorKind::InvalidInput,
            FlowError::Internal(_) => FlowErrorKind::Internal,
            FlowError::Busy => FlowErrorKind::Busy,
            FlowError::TaskPanicked(_) => FlowErrorKind::TaskPanicked,
        }
    }

    /// Create an I/O error with operation context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an internal error for a missing step output.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an encode error from the transcoder's exit status and stderr.
    pub fn encode(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Encode {
            exit_code,
            stderr: stderr.into(),
        }
    }
}

impl From<AnalysisError> for FlowError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::DegenerateSignal { which } => FlowError::DegenerateSignal { which },
            AnalysisError::InvalidConfig(msg) => FlowError::InvalidInput(msg),
            AnalysisError::Correlation(msg) => FlowError::Internal(msg),
        }
    }
}

impl From<CorrectionError> for FlowError {
    fn from(err: CorrectionError) -> Self {
        match err {
            CorrectionError::OverTrim {
                offset_seconds,
                requested,
                available,
            } => FlowError::OverTrim {
                offset_seconds,
                requested,
                available,
            },
            err @ CorrectionError::OffsetTooLarge { .. } => {
                FlowError::InvalidInput(err.to_string())
            }
            CorrectionError::NonFiniteOffset(value) => {
                FlowError::InvalidInput(format!("offset must be finite, got {}", value))
            }
            CorrectionError::Write { path, source } => {
                FlowError::io(format!("writing aligned audio to {}", path), source)
            }
        }
    }
}

impl From<ModelError> for FlowError {
    fn from(err: ModelError) -> Self {
        FlowError::InvalidInput(err.to_string())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, FlowError>;

/// Result type for flows.
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_error_displays_stderr_verbatim() {
        let err = FlowError::encode(Some(1), "Unknown encoder 'libx999'\n");
        assert_eq!(err.to_string(), "Unknown encoder 'libx999'\n");
        assert_eq!(err.kind(), FlowErrorKind::Encode);
    }

    #[test]
    fn degenerate_analysis_error_keeps_role() {
        let err: FlowError = AnalysisError::DegenerateSignal {
            which: SignalRole::Other,
        }
        .into();
        assert_eq!(err.kind(), FlowErrorKind::DegenerateSignal);
        assert_eq!(err.to_string(), "The external audio is empty or completely silent");
    }

    #[test]
    fn correction_errors_map_to_kinds() {
        let over: FlowError = CorrectionError::OverTrim {
            offset_seconds: -2.0,
            requested: 44100,
            available: 100,
        }
        .into();
        assert_eq!(over.kind(), FlowErrorKind::OverTrim);

        let nan: FlowError = CorrectionError::NonFiniteOffset(f64::NAN).into();
        assert_eq!(nan.kind(), FlowErrorKind::InvalidInput);

        let huge: FlowError = CorrectionError::OffsetTooLarge {
            offset_seconds: 1e300,
            limit: 10,
        }
        .into();
        assert_eq!(huge.kind(), FlowErrorKind::InvalidInput);

        let write: FlowError = CorrectionError::Write {
            path: "/x/aligned.wav".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert_eq!(write.kind(), FlowErrorKind::Io);
    }

    #[test]
    fn decode_errors_convert() {
        let err: FlowError = DecodeError::NoAudioTrack("/v/clip.mp4".into()).into();
        assert_eq!(err.kind(), FlowErrorKind::Decode);
        assert!(err.to_string().contains("clip.mp4"));
    }
}
