//! Core types shared by flow steps.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::Settings;
use crate::logging::JobLogger;
use crate::models::{PcmBuffer, SyncResult};

use super::scratch::ScratchDir;

/// A progress milestone: percent complete plus a stage label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub percent: u32,
    pub label: String,
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Forwards progress to a callback, never letting the percentage go down.
///
/// A milestone below the last delivered one is reported at the last
/// percentage with its own label. Values above 100 are capped.
pub struct ProgressReporter {
    last: Mutex<u32>,
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            last: Mutex::new(0),
            callback,
        }
    }

    /// Report a milestone and return the event that was delivered.
    ///
    /// The callback runs under the lock, so delivery order matches clamp
    /// order across threads.
    pub fn report(&self, percent: u32, label: &str) -> ProgressEvent {
        let mut last = self.last.lock();
        let clamped = percent.min(100).max(*last);
        *last = clamped;
        let event = ProgressEvent {
            percent: clamped,
            label: label.to_string(),
        };
        if let Some(ref callback) = self.callback {
            callback(&event);
        }
        event
    }

    /// Last percentage delivered.
    pub fn current(&self) -> u32 {
        *self.last.lock()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Read-only context passed to flow steps.
///
/// Mutable results go in [`FlowState`].
pub struct Context {
    /// Application settings snapshot for this run.
    pub settings: Settings,
    /// Flow name plus short id, e.g. `export_1a2b3c4d`.
    pub flow_name: String,
    /// Per-flow logger.
    pub logger: Arc<JobLogger>,
    scratch: ScratchDir,
    progress: ProgressReporter,
}

impl Context {
    pub fn new(
        settings: Settings,
        flow_name: impl Into<String>,
        logger: Arc<JobLogger>,
        scratch: ScratchDir,
        progress: ProgressReporter,
    ) -> Self {
        Self {
            settings,
            flow_name: flow_name.into(),
            logger,
            scratch,
            progress,
        }
    }

    /// Report a milestone to the presentation layer and the flow log.
    pub fn report_progress(&self, percent: u32, label: &str) {
        let event = self.progress.report(percent, label);
        self.logger.progress(event.percent, &event.label);
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Scratch file path for this flow.
    pub fn scratch_file(&self, name: &str) -> PathBuf {
        self.scratch.file(name)
    }

    /// Configured transcoder program.
    pub fn ffmpeg_path(&self) -> &Path {
        Path::new(&self.settings.tools.ffmpeg_path)
    }

    /// Sample rate both analysis inputs are decoded at.
    pub fn sample_rate(&self) -> u32 {
        self.settings.analysis.sample_rate
    }
}

/// Mutable state that accumulates step outputs.
///
/// Decoded buffers are dropped by the step that consumes them.
#[derive(Debug, Default, Serialize)]
pub struct FlowState {
    /// Unique flow identifier.
    pub flow_id: String,
    /// When the flow started.
    pub started_at: Option<String>,
    #[serde(skip)]
    pub reference_audio: Option<PcmBuffer>,
    #[serde(skip)]
    pub other_audio: Option<PcmBuffer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_result: Option<SyncResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligned: Option<AlignedOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode: Option<EncodeOutput>,
}

impl FlowState {
    pub fn new(flow_id: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }
}

/// Output from the ApplyOffset step.
#[derive(Debug, Clone, Serialize)]
pub struct AlignedOutput {
    /// Scratch WAV holding the aligned external audio.
    pub path: PathBuf,
    pub offset_seconds: f64,
    pub samples: usize,
    pub sample_rate: u32,
}

/// Output from the Encode step.
#[derive(Debug, Clone, Serialize)]
pub struct EncodeOutput {
    pub output_path: PathBuf,
    /// Full command line that was run.
    pub command: String,
    /// Whether the video stream was copied rather than re-encoded.
    pub copied_video: bool,
}
