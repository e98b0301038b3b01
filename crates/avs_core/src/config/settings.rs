//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::analysis::EstimatorConfig;
use crate::logging::{LogConfig, LogLevel};
use crate::models::{
    ExportProfile, MaxOffset, MixPolicy, ModelError, OverTrimPolicy, CANONICAL_SAMPLE_RATE,
};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Offset analysis settings.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Offset correction settings.
    #[serde(default)]
    pub correction: CorrectionSettings,

    /// Default export settings.
    #[serde(default)]
    pub export: ExportSettings,

    /// External tool locations.
    #[serde(default)]
    pub tools: ToolSettings,
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for exported files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for per-task scratch directories.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Last used video path.
    #[serde(default)]
    pub last_video_path: String,

    /// Last used external audio path.
    #[serde(default)]
    pub last_audio_path: String,
}

fn default_output_folder() -> String {
    "sync_output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
            last_video_path: String::new(),
            last_audio_path: String::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of transcoder stderr lines to show on failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Log the transcoder command one option per line.
    #[serde(default)]
    pub show_command_pretty: bool,

    /// Minimum level for job logs.
    #[serde(default)]
    pub level: LogLevel,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_command_pretty: false,
            level: LogLevel::default(),
        }
    }
}

impl LoggingSettings {
    /// Job logger configuration from these settings.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            progress_step: self.progress_step.max(1),
            error_tail: self.error_tail as usize,
            show_timestamps: true,
        }
    }
}

/// Offset analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Rate both inputs are decoded to, in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Largest offset searched, in seconds.
    #[serde(default = "default_max_offset_secs")]
    pub max_offset_secs: f64,

    /// Longest correlation template, in seconds.
    #[serde(default = "default_template_secs")]
    pub template_secs: f64,

    /// Decode the two inputs concurrently.
    #[serde(default = "default_true")]
    pub parallel_ingest: bool,
}

fn default_sample_rate() -> u32 {
    CANONICAL_SAMPLE_RATE
}

fn default_max_offset_secs() -> f64 {
    MaxOffset::DEFAULT_SECS
}

fn default_template_secs() -> f64 {
    30.0
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            max_offset_secs: default_max_offset_secs(),
            template_secs: default_template_secs(),
            parallel_ingest: true,
        }
    }
}

impl AnalysisSettings {
    /// Estimator configuration, validating the search bound.
    pub fn estimator_config(&self) -> Result<EstimatorConfig, ModelError> {
        Ok(EstimatorConfig {
            max_offset: MaxOffset::new(self.max_offset_secs)?,
            template_secs: self.template_secs,
            ..EstimatorConfig::default()
        })
    }
}

/// Offset correction configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectionSettings {
    /// Behavior when a negative offset trims the whole buffer.
    #[serde(default)]
    pub overtrim_policy: OverTrimPolicy,
}

/// Default export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Encode profile fields (format, codecs, bitrates, ...).
    #[serde(flatten)]
    pub profile: ExportProfile,

    /// Keep the original audio mixed under the new track.
    #[serde(default)]
    pub mix_original: bool,

    /// Gain applied to the original audio when mixing.
    #[serde(default = "default_original_gain")]
    pub original_gain: f64,

    /// Gain applied to the aligned audio when mixing.
    #[serde(default = "default_new_gain")]
    pub new_gain: f64,
}

fn default_original_gain() -> f64 {
    0.3
}

fn default_new_gain() -> f64 {
    1.0
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            profile: ExportProfile::default(),
            mix_original: false,
            original_gain: default_original_gain(),
            new_gain: default_new_gain(),
        }
    }
}

impl ExportSettings {
    /// Mix policy described by these settings.
    pub fn mix_policy(&self) -> MixPolicy {
        if self.mix_original {
            MixPolicy::MixWithOriginal {
                original_gain: self.original_gain,
                new_gain: self.new_gain,
            }
        } else {
            MixPolicy::Replace
        }
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Transcoder program (name on PATH or full path).
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl Settings {
    /// One section rendered as TOML, without its table header.
    pub fn section_toml(&self, section: ConfigSection) -> Result<String, toml::ser::Error> {
        match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.paths),
            ConfigSection::Logging => toml::to_string_pretty(&self.logging),
            ConfigSection::Analysis => toml::to_string_pretty(&self.analysis),
            ConfigSection::Correction => toml::to_string_pretty(&self.correction),
            ConfigSection::Export => toml::to_string_pretty(&self.export),
            ConfigSection::Tools => toml::to_string_pretty(&self.tools),
        }
    }
}

/// Top-level tables of the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Logging,
    Analysis,
    Correction,
    Export,
    Tools,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Analysis => "analysis",
            ConfigSection::Correction => "correction",
            ConfigSection::Export => "export",
            ConfigSection::Tools => "tools",
        }
    }

    /// Comment line written above the table.
    pub fn heading(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and working directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Analysis => "Offset analysis settings",
            ConfigSection::Correction => "Offset correction settings",
            ConfigSection::Export => "Default export profile and audio mix",
            ConfigSection::Tools => "External tools",
        }
    }

    /// All sections, in file order.
    pub fn all() -> &'static [ConfigSection] {
        &[
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Analysis,
            ConfigSection::Correction,
            ConfigSection::Export,
            ConfigSection::Tools,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerFormat, Resolution};

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[analysis]"));
        assert!(toml.contains("[export]"));
        assert!(toml.contains("video_codec = \"libx264\""));
        assert!(toml.contains("ffmpeg_path"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.paths.output_folder, settings.paths.output_folder);
        assert_eq!(parsed.export.profile, settings.export.profile);
        assert_eq!(parsed.analysis.sample_rate, 22050);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[export]\nformat = \"mkv\"\nresolution = \"1280x720\"\nmix_original = true\n";
        let parsed: Settings = toml::from_str(minimal).unwrap();

        assert_eq!(parsed.export.profile.format, ContainerFormat::Mkv);
        assert_eq!(
            parsed.export.profile.resolution,
            Resolution::Scaled {
                width: 1280,
                height: 720
            }
        );
        assert_eq!(parsed.export.profile.crf, 23);
        assert_eq!(parsed.export.mix_policy(), MixPolicy::mix_default());
        assert_eq!(parsed.analysis.max_offset_secs, 60.0);
        assert!(parsed.analysis.parallel_ingest);
        assert_eq!(parsed.correction.overtrim_policy, OverTrimPolicy::Empty);
        assert_eq!(parsed.tools.ffmpeg_path, "ffmpeg");
    }

    #[test]
    fn export_section_flattens_profile() {
        let rendered = Settings::default()
            .section_toml(ConfigSection::Export)
            .unwrap();
        assert!(rendered.contains("crf = 23"));
        assert!(rendered.contains("mix_original = false"));
        assert!(!rendered.contains("[export]"));
    }

    #[test]
    fn estimator_config_rejects_bad_bound() {
        let mut analysis = AnalysisSettings::default();
        assert_eq!(analysis.estimator_config().unwrap().max_offset.seconds(), 60.0);

        analysis.max_offset_secs = 0.0;
        assert!(analysis.estimator_config().is_err());
    }

    #[test]
    fn log_config_follows_settings() {
        let logging = LoggingSettings {
            compact: false,
            error_tail: 7,
            progress_step: 0,
            ..LoggingSettings::default()
        };
        let config = logging.log_config();
        assert!(!config.compact);
        assert_eq!(config.error_tail, 7);
        assert_eq!(config.progress_step, 1);
    }
}
