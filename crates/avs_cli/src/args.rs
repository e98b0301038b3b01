//! Command-line arguments.

use std::path::PathBuf;

use avs_core::logging::LogLevel;
use avs_core::models::{ContainerFormat, Resolution};
use clap::{ArgAction, Args, Parser, Subcommand};

/// Align an external audio recording to a video.
#[derive(Parser, Debug)]
#[command(name = "avs", version, about = "Align an external audio recording to a video")]
pub struct Cli {
    /// Settings file (default: .config/settings.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging and forward flow log lines to the terminal
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error); overrides the settings file
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Estimate the offset between the video's audio and an external file
    Analyze(AnalyzeArgs),
    /// Write a copy of the video with the external audio aligned
    Export(ExportArgs),
    /// Inspect or reset the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input video file
    #[arg(long)]
    pub video: PathBuf,

    /// External audio file
    #[arg(long)]
    pub audio: PathBuf,

    /// Largest offset to search for, in seconds
    #[arg(long)]
    pub max_offset: Option<f64>,

    /// Print the result as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Input video file
    #[arg(long)]
    pub video: PathBuf,

    /// External audio file
    #[arg(long)]
    pub audio: PathBuf,

    /// Output file (default: <output_folder>/<video>_synced.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Offset to apply, in seconds (positive delays the external audio)
    #[arg(
        long,
        allow_hyphen_values = true,
        conflicts_with = "analyze",
        required_unless_present = "analyze"
    )]
    pub offset: Option<f64>,

    /// Run the analysis first and export with its offset
    #[arg(long, action = ArgAction::SetTrue)]
    pub analyze: bool,

    /// Largest offset to search for when analyzing, in seconds
    #[arg(long, requires = "analyze")]
    pub max_offset: Option<f64>,

    /// Mix with the video's original audio instead of replacing it
    #[arg(long, action = ArgAction::SetTrue)]
    pub mix: bool,

    /// Gain for the original audio when mixing
    #[arg(long, requires = "mix")]
    pub original_gain: Option<f64>,

    /// Gain for the external audio when mixing
    #[arg(long, requires = "mix")]
    pub new_gain: Option<f64>,

    /// Output container (mp4, avi, mov, mkv)
    #[arg(long)]
    pub format: Option<ContainerFormat>,

    /// Output size: "original" or WIDTHxHEIGHT
    #[arg(long)]
    pub resolution: Option<Resolution>,

    #[arg(long)]
    pub video_codec: Option<String>,

    #[arg(long)]
    pub audio_codec: Option<String>,

    #[arg(long)]
    pub video_bitrate: Option<String>,

    #[arg(long)]
    pub audio_bitrate: Option<String>,

    /// Encoder speed preset (ultrafast ... veryslow)
    #[arg(long)]
    pub preset: Option<String>,

    /// Constant rate factor, 0-51
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    pub crf: Option<u8>,

    /// Print the outcome as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the current settings as TOML
    Show,
    /// Print the settings file path
    Path,
    /// Restore default settings
    Reset,
}
