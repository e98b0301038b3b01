//! The two user-facing flows: analyze and export.
//!
//! Each run gets its own scratch directory, flow logger and progress
//! reporter. The scratch directory is removed when the run ends, whether it
//! succeeded or not.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::Settings;
use crate::logging::{JobLogger, LogCallback};
use crate::models::{JobDescriptor, MaxOffset, SyncResult};

use super::errors::{FlowError, FlowResult};
use super::pipeline::Pipeline;
use super::scratch::ScratchDir;
use super::steps::{
    ApplyOffset, Encode, EstimateOffset, ExtractVideoAudio, IngestBoth, LoadExternalAudio,
};
use super::types::{Context, FlowState, ProgressCallback, ProgressReporter};

/// Inputs for an analyze run.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub video: PathBuf,
    pub audio: PathBuf,
    /// Overrides `analysis.max_offset_secs` when set.
    pub max_offset: Option<MaxOffset>,
}

impl AnalyzeRequest {
    pub fn new(video: impl Into<PathBuf>, audio: impl Into<PathBuf>) -> Self {
        Self {
            video: video.into(),
            audio: audio.into(),
            max_offset: None,
        }
    }

    pub fn with_max_offset(mut self, max_offset: MaxOffset) -> Self {
        self.max_offset = Some(max_offset);
        self
    }
}

/// Presentation hooks for a run.
#[derive(Default)]
pub struct FlowObserver {
    pub progress: Option<ProgressCallback>,
    pub log: Option<LogCallback>,
}

/// Result of a successful export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub output_path: PathBuf,
    pub offset_seconds: f64,
    pub command: String,
    pub copied_video: bool,
}

/// Estimate the offset of `request.audio` against the video's audio.
pub fn run_analyze(
    request: AnalyzeRequest,
    settings: &Settings,
    observer: FlowObserver,
) -> FlowResult<SyncResult> {
    let mut config = settings.analysis.estimator_config()?;
    if let Some(max_offset) = request.max_offset {
        config = config.with_max_offset(max_offset);
    }

    let (ctx, mut state) = prepare("analyze", settings, observer)?;
    ctx.logger.info(&format!("Video: {}", request.video.display()));
    ctx.logger.info(&format!("Audio: {}", request.audio.display()));

    let video = ExtractVideoAudio::new(&request.video);
    let audio = LoadExternalAudio::new(&request.audio);
    let mut pipeline = Pipeline::new();
    if settings.analysis.parallel_ingest {
        pipeline.add_step(IngestBoth::new(video, audio));
    } else {
        pipeline.add_step(video).add_step(audio);
    }
    pipeline.add_step(EstimateOffset::new(config));

    pipeline.run(&ctx, &mut state)?;

    let result = state
        .sync_result
        .take()
        .ok_or_else(|| FlowError::internal("analysis finished without a result"))?;

    ctx.report_progress(100, "Synchronization complete!");
    ctx.logger.success("Analysis complete");
    Ok(result)
}

/// Align the external audio and write the output video.
///
/// The descriptor is consumed; each export runs exactly once.
pub fn run_export(
    job: JobDescriptor,
    settings: &Settings,
    observer: FlowObserver,
) -> FlowResult<ExportOutcome> {
    let (ctx, mut state) = prepare("export", settings, observer)?;
    ctx.logger.info(&format!("Video: {}", job.video_path().display()));
    ctx.logger.info(&format!("Audio: {}", job.audio_path().display()));
    ctx.logger.info(&format!("Output: {}", job.output_path().display()));
    ctx.logger
        .info(&format!("Offset: {:+.3}s", job.offset_seconds()));

    let offset_seconds = job.offset_seconds();
    let pipeline = Pipeline::new()
        .with_step(ApplyOffset::new(
            job.audio_path(),
            offset_seconds,
            settings.correction.overtrim_policy,
        ))
        .with_step(Encode::new(
            job.video_path(),
            job.output_path(),
            job.profile().clone(),
            job.mix_policy(),
        ));

    pipeline.run(&ctx, &mut state)?;

    let encode = state
        .encode
        .take()
        .ok_or_else(|| FlowError::internal("export finished without an output"))?;

    ctx.report_progress(100, "Export complete!");
    ctx.logger
        .success(&format!("Exported {}", encode.output_path.display()));

    Ok(ExportOutcome {
        output_path: encode.output_path,
        offset_seconds,
        command: encode.command,
        copied_video: encode.copied_video,
    })
}

fn prepare(
    flow: &str,
    settings: &Settings,
    observer: FlowObserver,
) -> FlowResult<(Context, FlowState)> {
    let scratch = ScratchDir::create(&settings.paths.temp_root)
        .map_err(|e| FlowError::io("creating scratch directory", e))?;
    let flow_name = format!("{}_{}", flow, scratch.short_id());

    let logger = JobLogger::new(
        &flow_name,
        &settings.paths.logs_folder,
        settings.logging.log_config(),
        observer.log,
    )
    .map_err(|e| FlowError::io("creating flow log", e))?;
    logger.phase(&flow_name);
    logger.debug(&format!("Scratch directory: {}", scratch.path().display()));

    let state = FlowState::new(scratch.id());
    let ctx = Context::new(
        settings.clone(),
        flow_name,
        Arc::new(logger),
        scratch,
        ProgressReporter::new(observer.progress),
    );
    Ok((ctx, state))
}
