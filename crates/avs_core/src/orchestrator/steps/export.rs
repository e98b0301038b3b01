//! Export flow steps: align the external audio, then run the encode plan.

use std::fs;
use std::path::PathBuf;

use crate::correction::{apply_offset, write_aligned};
use crate::ingest::{load_audio_file, DecodeError};
use crate::models::{ExportProfile, MixPolicy, OverTrimPolicy};
use crate::mux::{build_encode_plan, validate_profile, EncodePlanInput};
use crate::orchestrator::errors::{FlowError, StepResult};
use crate::orchestrator::runner::ToolRunner;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AlignedOutput, Context, EncodeOutput, FlowState};

const ALIGNED_SCRATCH: &str = "aligned_audio.wav";

/// Decodes the external audio and shifts it by the chosen offset.
pub struct ApplyOffset {
    audio: PathBuf,
    offset_seconds: f64,
    policy: OverTrimPolicy,
}

impl ApplyOffset {
    pub fn new(audio: impl Into<PathBuf>, offset_seconds: f64, policy: OverTrimPolicy) -> Self {
        Self {
            audio: audio.into(),
            offset_seconds,
            policy,
        }
    }
}

impl PipelineStep for ApplyOffset {
    fn name(&self) -> &str {
        "ApplyOffset"
    }

    fn description(&self) -> &str {
        "Apply audio offset"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        if !self.audio.is_file() {
            return Err(DecodeError::SourceNotFound(self.audio.clone()).into());
        }
        if !self.offset_seconds.is_finite() {
            return Err(FlowError::invalid_input(format!(
                "offset must be finite, got {}",
                self.offset_seconds
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut FlowState) -> StepResult<()> {
        ctx.report_progress(10, "Preparing files...");
        let buffer = load_audio_file(&self.audio, ctx.sample_rate())?;

        ctx.report_progress(30, "Applying audio offset...");
        let aligned = apply_offset(&buffer, self.offset_seconds, self.policy)?;
        drop(buffer);

        if aligned.is_empty() {
            ctx.logger.warn(&format!(
                "Offset {:+.3}s trims the whole external audio; exporting silence",
                self.offset_seconds
            ));
        }

        let path = ctx.scratch_file(ALIGNED_SCRATCH);
        write_aligned(&path, &aligned)?;
        ctx.logger.info(&format!(
            "Aligned audio: {} samples ({:+.3}s applied)",
            aligned.len(),
            self.offset_seconds
        ));

        state.aligned = Some(AlignedOutput {
            path,
            offset_seconds: self.offset_seconds,
            samples: aligned.len(),
            sample_rate: aligned.sample_rate(),
        });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &FlowState) -> StepResult<()> {
        match state.aligned {
            Some(ref aligned) if aligned.path.is_file() => Ok(()),
            Some(ref aligned) => Err(FlowError::internal(format!(
                "aligned audio missing at {}",
                aligned.path.display()
            ))),
            None => Err(FlowError::internal("aligned audio was not recorded")),
        }
    }
}

/// Builds the transcoder plan and runs it.
pub struct Encode {
    video: PathBuf,
    output: PathBuf,
    profile: ExportProfile,
    mix: MixPolicy,
}

impl Encode {
    pub fn new(
        video: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        profile: ExportProfile,
        mix: MixPolicy,
    ) -> Self {
        Self {
            video: video.into(),
            output: output.into(),
            profile,
            mix,
        }
    }
}

impl PipelineStep for Encode {
    fn name(&self) -> &str {
        "Encode"
    }

    fn description(&self) -> &str {
        "Encode output"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        if !self.video.is_file() {
            return Err(DecodeError::SourceNotFound(self.video.clone()).into());
        }
        if self.output == self.video {
            return Err(FlowError::invalid_input(
                "output path must differ from the source video",
            ));
        }
        validate_profile(&self.profile)?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut FlowState) -> StepResult<()> {
        ctx.report_progress(50, "Encoding video (this may take a while)...");

        let aligned_path = state
            .aligned
            .as_ref()
            .map(|a| a.path.clone())
            .ok_or_else(|| FlowError::internal("aligned audio missing before encode"))?;

        let plan = build_encode_plan(EncodePlanInput {
            program: ctx.ffmpeg_path(),
            video: &self.video,
            aligned_audio: &aligned_path,
            output: &self.output,
            profile: &self.profile,
            mix: self.mix,
        })?;

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| FlowError::io("creating output directory", e))?;
            }
        }

        let command = plan.to_command_line();
        ctx.logger.command(&command);
        if ctx.settings.logging.show_command_pretty {
            ctx.logger
                .log_command_pretty(&plan.program.to_string_lossy(), &plan.args);
        }
        ctx.logger.log_command_json(&plan.args);

        let runner = ToolRunner::new(&plan.program);
        let output = runner.run(&plan.args, |line| {
            ctx.logger.output_line(line, true);
            ctx.report_progress(75, "Encoding video...");
        });

        if let Err(e) = output {
            ctx.logger.show_tail("ffmpeg");
            return Err(e);
        }

        state.encode = Some(EncodeOutput {
            output_path: self.output.clone(),
            command,
            copied_video: plan.copies_video(),
        });
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, state: &FlowState) -> StepResult<()> {
        match state.encode {
            Some(ref encode) if encode.output_path.exists() => Ok(()),
            Some(ref encode) => Err(FlowError::internal(format!(
                "transcoder reported success but {} was not created",
                encode.output_path.display()
            ))),
            None => Err(FlowError::internal("encode result was not recorded")),
        }
    }
}
