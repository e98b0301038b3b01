//! FFmpeg audio extraction.
//!
//! Pulls the audio track out of a video as mono 16-bit PCM (22050 Hz by
//! default) into a scratch WAV, reads it back, and removes the scratch file.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::models::PcmBuffer;

use super::wav::read_pcm16;
use super::{DecodeError, DecodeResult};

/// Extraction arguments (without the program name).
pub fn extraction_args(video: &Path, scratch_wav: &Path, sample_rate: u32) -> Vec<String> {
    vec![
        "-i".to_string(),
        video.to_string_lossy().to_string(),
        "-vn".to_string(),
        "-acodec".to_string(),
        "pcm_s16le".to_string(),
        "-ar".to_string(),
        sample_rate.to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-y".to_string(),
        scratch_wav.to_string_lossy().to_string(),
    ]
}

/// Extract the audio embedded in a video file.
///
/// `ffmpeg` is the transcoder program (a name on `PATH` or a full path).
/// The scratch WAV is deleted after reading; deletion failures are only
/// logged.
pub fn extract_video_audio(
    ffmpeg: &Path,
    video: &Path,
    scratch_wav: &Path,
    sample_rate: u32,
) -> DecodeResult<PcmBuffer> {
    if !video.exists() {
        return Err(DecodeError::SourceNotFound(video.to_path_buf()));
    }

    let tool = ffmpeg.to_string_lossy().to_string();
    let mut cmd = Command::new(ffmpeg);
    cmd.args(extraction_args(video, scratch_wav, sample_rate))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    tracing::debug!("Running FFmpeg: {:?}", cmd);

    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DecodeError::ToolMissing { tool: tool.clone() }
        } else {
            DecodeError::ToolFailed {
                tool: tool.clone(),
                exit_code: None,
                stderr: format!("Failed to spawn: {}", e),
            }
        }
    })?;

    if !output.status.success() {
        remove_scratch(scratch_wav);
        return Err(DecodeError::ToolFailed {
            tool,
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let result = read_pcm16(scratch_wav);
    remove_scratch(scratch_wav);
    let buffer = result?;

    if buffer.is_empty() {
        return Err(DecodeError::Empty(video.to_path_buf()));
    }

    tracing::debug!(
        "Extracted {} samples ({:.2}s) from {}",
        buffer.len(),
        buffer.duration_secs(),
        video.display()
    );

    Ok(buffer)
}

fn remove_scratch(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("Failed to remove scratch file {}: {}", path.display(), e);
    }
}
