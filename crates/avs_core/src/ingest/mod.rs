//! Audio ingest: turn video-embedded or standalone audio into canonical PCM.
//!
//! Two entry points:
//! - [`extract_video_audio`] runs the transcoder to pull a mono 22050 Hz
//!   16-bit track out of a video into a scratch WAV, then reads it back.
//! - [`load_audio_file`] decodes a standalone file in memory with symphonia
//!   and resamples it with rubato.

mod decode;
mod ffmpeg;
pub mod wav;

pub use decode::load_audio_file;
pub use ffmpeg::{extraction_args, extract_video_audio};

use std::path::PathBuf;

/// Errors from decoding audio.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The external tool could not be launched.
    #[error("Required tool '{tool}' was not found")]
    ToolMissing { tool: String },

    /// The external tool ran but failed.
    #[error("{tool} exited with code {exit_code:?}: {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Input path does not exist.
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Input could not be opened or read.
    #[error("Cannot read '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container or codec is not supported.
    #[error("Unsupported audio format in '{path}': {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    /// The container holds no decodable audio track.
    #[error("No audio track found in {0}")]
    NoAudioTrack(PathBuf),

    /// Decoding produced no samples.
    #[error("No audio samples decoded from {0}")]
    Empty(PathBuf),

    /// Sample-rate conversion failed.
    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Result type for ingest operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
