//! Export job descriptor and accepted input types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::ContainerFormat;
use super::export::{ExportProfile, MixPolicy};

/// Video container extensions accepted as input.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "flv", "wmv"];

/// Audio file extensions accepted as input.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "ogg", "m4a"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            allowed.iter().any(|a| *a == e)
        })
        .unwrap_or(false)
}

/// Whether the path has an accepted video extension.
pub fn is_supported_video(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Whether the path has an accepted audio extension.
pub fn is_supported_audio(path: &Path) -> bool {
    has_extension(path, AUDIO_EXTENSIONS)
}

/// Everything needed to run one export.
///
/// Fields are fixed once built; the export flow takes the descriptor by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    video_path: PathBuf,
    audio_path: PathBuf,
    output_path: PathBuf,
    offset_seconds: f64,
    #[serde(default)]
    profile: ExportProfile,
    #[serde(default)]
    mix_policy: MixPolicy,
}

impl JobDescriptor {
    /// Create a descriptor with the default profile and Replace mixing.
    pub fn new(
        video_path: impl Into<PathBuf>,
        audio_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        offset_seconds: f64,
    ) -> Self {
        Self {
            video_path: video_path.into(),
            audio_path: audio_path.into(),
            output_path: output_path.into(),
            offset_seconds,
            profile: ExportProfile::default(),
            mix_policy: MixPolicy::default(),
        }
    }

    /// Set the export profile.
    pub fn with_profile(mut self, profile: ExportProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the mix policy.
    pub fn with_mix_policy(mut self, mix_policy: MixPolicy) -> Self {
        self.mix_policy = mix_policy;
        self
    }

    pub fn video_path(&self) -> &Path {
        &self.video_path
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn offset_seconds(&self) -> f64 {
        self.offset_seconds
    }

    pub fn profile(&self) -> &ExportProfile {
        &self.profile
    }

    pub fn mix_policy(&self) -> MixPolicy {
        self.mix_policy
    }

    /// Default output path: `<video_stem>_synced.<ext>` next to the video.
    pub fn default_output_path(video: &Path, format: ContainerFormat) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let name = format!("{}_synced.{}", stem, format.extension());
        match video.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}
