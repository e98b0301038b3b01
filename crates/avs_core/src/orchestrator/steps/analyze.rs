//! Analyze flow steps: ingest both inputs, then estimate the offset.

use std::path::{Path, PathBuf};

use crate::analysis::{estimate_offset, EstimatorConfig};
use crate::ingest::{extraction_args, extract_video_audio, load_audio_file, DecodeError};
use crate::models::{is_supported_audio, is_supported_video, PcmBuffer};
use crate::orchestrator::errors::{FlowError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, FlowState};

const VIDEO_SCRATCH: &str = "video_audio.wav";

fn require_file(path: &Path) -> StepResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DecodeError::SourceNotFound(path.to_path_buf()).into())
    }
}

/// Extracts the video's audio track through FFmpeg.
pub struct ExtractVideoAudio {
    video: PathBuf,
}

impl ExtractVideoAudio {
    pub fn new(video: impl Into<PathBuf>) -> Self {
        Self {
            video: video.into(),
        }
    }

    fn ingest(&self, ctx: &Context) -> StepResult<PcmBuffer> {
        let scratch = ctx.scratch_file(VIDEO_SCRATCH);
        let args = extraction_args(&self.video, &scratch, ctx.sample_rate());
        ctx.logger.command(&format!(
            "{} {}",
            ctx.ffmpeg_path().display(),
            args.join(" ")
        ));

        let buffer = extract_video_audio(ctx.ffmpeg_path(), &self.video, &scratch, ctx.sample_rate())?;
        ctx.logger.info(&format!(
            "Video audio: {} samples ({:.2}s) at {} Hz",
            buffer.len(),
            buffer.duration_secs(),
            buffer.sample_rate()
        ));
        Ok(buffer)
    }
}

impl PipelineStep for ExtractVideoAudio {
    fn name(&self) -> &str {
        "ExtractVideoAudio"
    }

    fn description(&self) -> &str {
        "Extract video audio"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        require_file(&self.video)?;
        if !is_supported_video(&self.video) {
            ctx.logger.warn(&format!(
                "Unrecognized video extension: {}",
                self.video.display()
            ));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut FlowState) -> StepResult<()> {
        ctx.report_progress(10, "Extracting audio from video...");
        state.reference_audio = Some(self.ingest(ctx)?);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &FlowState) -> StepResult<()> {
        match state.reference_audio {
            Some(_) => Ok(()),
            None => Err(FlowError::internal("video audio was not recorded")),
        }
    }
}

/// Decodes the external audio file.
pub struct LoadExternalAudio {
    audio: PathBuf,
}

impl LoadExternalAudio {
    pub fn new(audio: impl Into<PathBuf>) -> Self {
        Self {
            audio: audio.into(),
        }
    }

    fn ingest(&self, ctx: &Context) -> StepResult<PcmBuffer> {
        let buffer = load_audio_file(&self.audio, ctx.sample_rate())?;
        ctx.logger.info(&format!(
            "External audio: {} samples ({:.2}s) at {} Hz",
            buffer.len(),
            buffer.duration_secs(),
            buffer.sample_rate()
        ));
        Ok(buffer)
    }
}

impl PipelineStep for LoadExternalAudio {
    fn name(&self) -> &str {
        "LoadExternalAudio"
    }

    fn description(&self) -> &str {
        "Load external audio"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        require_file(&self.audio)?;
        if !is_supported_audio(&self.audio) {
            ctx.logger.warn(&format!(
                "Unrecognized audio extension: {}",
                self.audio.display()
            ));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut FlowState) -> StepResult<()> {
        ctx.report_progress(30, "Loading external audio file...");
        state.other_audio = Some(self.ingest(ctx)?);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &FlowState) -> StepResult<()> {
        match state.other_audio {
            Some(_) => Ok(()),
            None => Err(FlowError::internal("external audio was not recorded")),
        }
    }
}

/// Runs both ingest steps on scoped threads.
///
/// On failure the video side's error wins when both fail.
pub struct IngestBoth {
    video: ExtractVideoAudio,
    audio: LoadExternalAudio,
}

impl IngestBoth {
    pub fn new(video: ExtractVideoAudio, audio: LoadExternalAudio) -> Self {
        Self { video, audio }
    }
}

impl PipelineStep for IngestBoth {
    fn name(&self) -> &str {
        "IngestBoth"
    }

    fn description(&self) -> &str {
        "Ingest video and external audio"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        self.video.validate_input(ctx)?;
        self.audio.validate_input(ctx)
    }

    fn execute(&self, ctx: &Context, state: &mut FlowState) -> StepResult<()> {
        ctx.report_progress(10, "Extracting audio from video...");

        let (video_result, audio_result) = std::thread::scope(|s| {
            let video = s.spawn(|| self.video.ingest(ctx));
            let audio = s.spawn(|| {
                ctx.report_progress(30, "Loading external audio file...");
                self.audio.ingest(ctx)
            });
            (join_ingest(video, "video"), join_ingest(audio, "audio"))
        });

        state.reference_audio = Some(video_result?);
        state.other_audio = Some(audio_result?);
        Ok(())
    }

    fn validate_output(&self, ctx: &Context, state: &FlowState) -> StepResult<()> {
        self.video.validate_output(ctx, state)?;
        self.audio.validate_output(ctx, state)
    }
}

fn join_ingest(
    handle: std::thread::ScopedJoinHandle<'_, StepResult<PcmBuffer>>,
    which: &str,
) -> StepResult<PcmBuffer> {
    handle
        .join()
        .map_err(|_| FlowError::TaskPanicked(format!("{} ingest thread panicked", which)))?
}

/// Cross-correlates the ingested buffers into a `SyncResult`.
pub struct EstimateOffset {
    config: EstimatorConfig,
}

impl EstimateOffset {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }
}

impl PipelineStep for EstimateOffset {
    fn name(&self) -> &str {
        "EstimateOffset"
    }

    fn description(&self) -> &str {
        "Estimate offset"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut FlowState) -> StepResult<()> {
        ctx.report_progress(50, "Performing cross-correlation analysis...");

        let reference = state
            .reference_audio
            .take()
            .ok_or_else(|| FlowError::internal("video audio missing before analysis"))?;
        let other = state
            .other_audio
            .take()
            .ok_or_else(|| FlowError::internal("external audio missing before analysis"))?;

        ctx.logger.debug(&format!(
            "Search bound {:.1}s, template cap {:.1}s",
            self.config.max_offset.seconds(),
            self.config.template_secs
        ));

        let result = estimate_offset(&reference, &other, &self.config)?;

        ctx.logger.info(&format!(
            "Offset {:+.3}s ({:+.1} ms), confidence {:.3} ({}), template from {}",
            result.offset_seconds,
            result.offset_ms(),
            result.confidence,
            result.confidence_level(),
            result.template_source
        ));
        ctx.logger.info(&result.interpretation());

        state.sync_result = Some(result);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &FlowState) -> StepResult<()> {
        match state.sync_result {
            Some(ref result) if result.offset_seconds.is_finite() => Ok(()),
            Some(_) => Err(FlowError::internal("analysis produced a non-finite offset")),
            None => Err(FlowError::internal("analysis result was not recorded")),
        }
    }
}
