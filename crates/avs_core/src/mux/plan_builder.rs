//! FFmpeg export plan builder.
//!
//! Turns an export profile and mix policy into the ordered argument list for
//! the transcoder. Pure: no I/O, no process spawning.
//!
//! # Modes
//!
//! - **Replace**: video from input 0, aligned audio from input 1, cut to the
//!   shorter stream. Video is stream-copied unless a resolution change is
//!   requested, in which case it is re-encoded through `-vf scale=WxH`.
//! - **Mix**: original and aligned audio are summed through a
//!   `filter_complex` graph; video is always re-encoded. A resolution change
//!   is folded into the same graph.

use std::path::{Path, PathBuf};

use crate::models::{ExportProfile, MixPolicy, PRESETS};

/// Error types for export plan building.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// A required field is blank.
    #[error("Export setting '{0}' must not be empty")]
    EmptyField(&'static str),

    /// CRF outside 0..=51.
    #[error("CRF must be between 0 and 51, got {0}")]
    InvalidCrf(u8),

    /// Preset not recognised by the encoder.
    #[error("Unknown encoder preset '{0}'")]
    InvalidPreset(String),

    /// Mix gain is negative or not finite.
    #[error("Mix gain '{name}' must be a non-negative number, got {value}")]
    InvalidGain { name: &'static str, value: f64 },
}

/// How audio is handled in the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    Replace,
    Mix,
}

/// Input data for building an encode plan.
pub struct EncodePlanInput<'a> {
    /// Transcoder program.
    pub program: &'a Path,
    /// Source video (input 0).
    pub video: &'a Path,
    /// Offset-corrected audio (input 1).
    pub aligned_audio: &'a Path,
    /// Output file.
    pub output: &'a Path,
    pub profile: &'a ExportProfile,
    pub mix: MixPolicy,
}

/// A ready-to-run transcoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodePlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub mode: PlanMode,
}

impl EncodePlan {
    /// Whether the video stream is copied without re-encoding.
    pub fn copies_video(&self) -> bool {
        self.args
            .windows(2)
            .any(|pair| pair[0] == "-c:v" && pair[1] == "copy")
    }

    /// Single-line command for logs.
    pub fn to_command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().to_string();
        for arg in &self.args {
            line.push(' ');
            if arg.contains([' ', ';', '[']) {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }

    /// Multi-line command for logs.
    pub fn format_pretty(&self) -> String {
        format!(
            "{} \\\n{}",
            self.program.to_string_lossy(),
            format_tokens_pretty(&self.args)
        )
    }
}

/// Build the transcoder plan for one export.
pub fn build_encode_plan(input: EncodePlanInput) -> Result<EncodePlan, PlanError> {
    validate_profile(input.profile)?;
    validate_path("video", input.video)?;
    validate_path("aligned_audio", input.aligned_audio)?;
    validate_path("output", input.output)?;

    let profile = input.profile;
    let scale = profile.resolution.scale_filter();

    let mut args = vec![
        "-i".to_string(),
        input.video.to_string_lossy().to_string(),
        "-i".to_string(),
        input.aligned_audio.to_string_lossy().to_string(),
    ];

    let mode = match input.mix {
        MixPolicy::Replace => {
            if let Some(ref scale) = scale {
                args.push("-vf".to_string());
                args.push(scale.clone());
            }
            let video_codec = if scale.is_some() {
                profile.video_codec.as_str()
            } else {
                "copy"
            };
            args.push("-c:v".to_string());
            args.push(video_codec.to_string());
            push_encoding_options(&mut args, profile);
            args.extend(
                ["-map", "0:v:0", "-map", "1:a:0", "-shortest"]
                    .iter()
                    .map(|s| s.to_string()),
            );
            PlanMode::Replace
        }
        MixPolicy::MixWithOriginal {
            original_gain,
            new_gain,
        } => {
            validate_gain("original_gain", original_gain)?;
            validate_gain("new_gain", new_gain)?;

            let audio_graph = format!(
                "[0:a]volume={}[original];[1:a]volume={}[new];[original][new]amix=inputs=2:duration=shortest",
                format_gain(original_gain),
                format_gain(new_gain)
            );
            let (graph, video_map) = match scale {
                Some(scale) => (format!("[0:v]{}[v];{}", scale, audio_graph), "[v]"),
                None => (audio_graph, "0:v:0"),
            };

            args.push("-filter_complex".to_string());
            args.push(graph);
            args.push("-c:v".to_string());
            args.push(profile.video_codec.clone());
            push_encoding_options(&mut args, profile);
            args.push("-map".to_string());
            args.push(video_map.to_string());
            PlanMode::Mix
        }
    };

    args.push("-y".to_string());
    args.push(input.output.to_string_lossy().to_string());

    Ok(EncodePlan {
        program: input.program.to_path_buf(),
        args,
        mode,
    })
}

fn push_encoding_options(args: &mut Vec<String>, profile: &ExportProfile) {
    args.push("-c:a".to_string());
    args.push(profile.audio_codec.clone());
    args.push("-b:v".to_string());
    args.push(profile.video_bitrate.clone());
    args.push("-b:a".to_string());
    args.push(profile.audio_bitrate.clone());
    args.push("-crf".to_string());
    args.push(profile.crf.to_string());
    args.push("-preset".to_string());
    args.push(profile.preset.clone());
}

/// Check an export profile without building a plan.
pub fn validate_profile(profile: &ExportProfile) -> Result<(), PlanError> {
    let required = [
        ("video_codec", &profile.video_codec),
        ("audio_codec", &profile.audio_codec),
        ("video_bitrate", &profile.video_bitrate),
        ("audio_bitrate", &profile.audio_bitrate),
        ("preset", &profile.preset),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(PlanError::EmptyField(name));
        }
    }

    if profile.crf > 51 {
        return Err(PlanError::InvalidCrf(profile.crf));
    }

    if !PRESETS.contains(&profile.preset.as_str()) {
        return Err(PlanError::InvalidPreset(profile.preset.clone()));
    }

    Ok(())
}

fn validate_path(name: &'static str, path: &Path) -> Result<(), PlanError> {
    if path.as_os_str().is_empty() {
        return Err(PlanError::EmptyField(name));
    }
    Ok(())
}

fn validate_gain(name: &'static str, value: f64) -> Result<(), PlanError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PlanError::InvalidGain { name, value });
    }
    Ok(())
}

/// `1.0` rather than `1`, so whole gains read like the fractional ones.
fn format_gain(gain: f64) -> String {
    if gain.fract() == 0.0 {
        format!("{:.1}", gain)
    } else {
        format!("{}", gain)
    }
}

/// Format command tokens one option per line, for logs.
pub fn format_tokens_pretty(tokens: &[String]) -> String {
    let mut result = String::new();
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];

        if token.starts_with('-') && i + 1 < tokens.len() && !tokens[i + 1].starts_with('-') {
            result.push_str(&format!("  {} {} \\\n", token, tokens[i + 1]));
            i += 2;
        } else if i + 1 == tokens.len() {
            result.push_str(&format!("  {}\n", token));
            i += 1;
        } else {
            result.push_str(&format!("  {} \\\n", token));
            i += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Resolution;

    fn plan(profile: &ExportProfile, mix: MixPolicy) -> EncodePlan {
        build_encode_plan(EncodePlanInput {
            program: Path::new("ffmpeg"),
            video: Path::new("/in/video.mp4"),
            aligned_audio: Path::new("/tmp/scratch/aligned.wav"),
            output: Path::new("/out/video_synced.mp4"),
            profile,
            mix,
        })
        .unwrap()
    }

    fn scaled(width: u32, height: u32) -> ExportProfile {
        ExportProfile {
            resolution: Resolution::Scaled { width, height },
            ..ExportProfile::default()
        }
    }

    #[test]
    fn replace_original_matches_contract() {
        let plan = plan(&ExportProfile::default(), MixPolicy::Replace);
        assert_eq!(plan.mode, PlanMode::Replace);
        assert_eq!(
            plan.args,
            vec![
                "-i",
                "/in/video.mp4",
                "-i",
                "/tmp/scratch/aligned.wav",
                "-c:v",
                "copy",
                "-c:a",
                "aac",
                "-b:v",
                "8M",
                "-b:a",
                "192k",
                "-crf",
                "23",
                "-preset",
                "medium",
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-shortest",
                "-y",
                "/out/video_synced.mp4"
            ]
        );
        assert!(plan.copies_video());
        assert!(!plan.args.iter().any(|a| a.starts_with("scale=")));
    }

    #[test]
    fn replace_with_scale_reencodes() {
        let plan = plan(&scaled(1280, 720), MixPolicy::Replace);
        let vf = plan.args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(plan.args[vf + 1], "scale=1280x720");
        assert!(!plan.copies_video());
        let cv = plan.args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(plan.args[cv + 1], "libx264");
    }

    #[test]
    fn mix_uses_filter_graph_and_never_copies() {
        let plan = plan(&ExportProfile::default(), MixPolicy::mix_default());
        assert_eq!(plan.mode, PlanMode::Mix);
        assert!(!plan.copies_video());

        let fc = plan.args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(
            plan.args[fc + 1],
            "[0:a]volume=0.3[original];[1:a]volume=1.0[new];[original][new]amix=inputs=2:duration=shortest"
        );
        assert!(!plan.args.iter().any(|a| a == "-shortest"));
        assert!(!plan.args.iter().any(|a| a == "1:a:0"));
        assert!(plan.args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:v:0"));
    }

    #[test]
    fn mix_with_scale_folds_into_graph() {
        let plan = plan(&scaled(854, 480), MixPolicy::mix_default());
        assert!(!plan.args.iter().any(|a| a == "-vf"));

        let fc = plan.args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(plan.args[fc + 1].starts_with("[0:v]scale=854x480[v];[0:a]volume=0.3"));
        assert!(plan.args.windows(2).any(|w| w[0] == "-map" && w[1] == "[v]"));
        assert!(!plan.copies_video());
    }

    #[test]
    fn custom_gains_are_substituted() {
        let plan = plan(
            &ExportProfile::default(),
            MixPolicy::MixWithOriginal {
                original_gain: 0.5,
                new_gain: 2.0,
            },
        );
        let fc = plan.args.iter().position(|a| a == "-filter_complex").unwrap();
        assert!(plan.args[fc + 1].contains("[0:a]volume=0.5[original]"));
        assert!(plan.args[fc + 1].contains("[1:a]volume=2.0[new]"));
    }

    #[test]
    fn output_is_last() {
        for mix in [MixPolicy::Replace, MixPolicy::mix_default()] {
            let plan = plan(&ExportProfile::default(), mix);
            let n = plan.args.len();
            assert_eq!(plan.args[n - 2], "-y");
            assert_eq!(plan.args[n - 1], "/out/video_synced.mp4");
        }
    }

    #[test]
    fn rejects_malformed_profile() {
        let input = |profile: &ExportProfile, mix: MixPolicy| {
            build_encode_plan(EncodePlanInput {
                program: Path::new("ffmpeg"),
                video: Path::new("v.mp4"),
                aligned_audio: Path::new("a.wav"),
                output: Path::new("o.mp4"),
                profile,
                mix,
            })
        };

        let mut profile = ExportProfile::default();
        profile.video_codec = " ".to_string();
        assert_eq!(
            input(&profile, MixPolicy::Replace).unwrap_err(),
            PlanError::EmptyField("video_codec")
        );

        let mut profile = ExportProfile::default();
        profile.crf = 52;
        assert_eq!(
            input(&profile, MixPolicy::Replace).unwrap_err(),
            PlanError::InvalidCrf(52)
        );

        let mut profile = ExportProfile::default();
        profile.preset = "warp".to_string();
        assert!(matches!(
            input(&profile, MixPolicy::Replace),
            Err(PlanError::InvalidPreset(_))
        ));

        let bad_gain = MixPolicy::MixWithOriginal {
            original_gain: -0.1,
            new_gain: 1.0,
        };
        assert!(matches!(
            input(&ExportProfile::default(), bad_gain),
            Err(PlanError::InvalidGain { name: "original_gain", .. })
        ));
    }

    #[test]
    fn rejects_empty_output_path() {
        let profile = ExportProfile::default();
        let err = build_encode_plan(EncodePlanInput {
            program: Path::new("ffmpeg"),
            video: Path::new("v.mp4"),
            aligned_audio: Path::new("a.wav"),
            output: Path::new(""),
            profile: &profile,
            mix: MixPolicy::Replace,
        })
        .unwrap_err();
        assert_eq!(err, PlanError::EmptyField("output"));
    }

    #[test]
    fn pretty_format_pairs_options() {
        let tokens: Vec<String> = ["-i", "in.mp4", "-y", "out.mp4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            format_tokens_pretty(&tokens),
            "  -i in.mp4 \\\n  -y out.mp4 \\\n"
        );
        let plan = plan(&ExportProfile::default(), MixPolicy::Replace);
        assert!(plan.format_pretty().starts_with("ffmpeg \\\n  -i /in/video.mp4"));
        assert!(plan.to_command_line().starts_with("ffmpeg -i /in/video.mp4 -i"));
    }
}
