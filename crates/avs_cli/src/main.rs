//! AV Sync command-line front end.

mod args;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use avs_core::config::{ConfigManager, ConfigSection, Settings};
use avs_core::logging::{init_tracing_with_file, LogLevel, WorkerGuard};
use avs_core::models::{JobDescriptor, MaxOffset, MixPolicy, SyncResult};
use avs_core::orchestrator::{
    spawn_analyze, spawn_export, AnalyzeRequest, FlowEvent, FlowTask, TaskSlot,
};
use clap::Parser;
use which::which;

use args::{AnalyzeArgs, Cli, Command, ConfigAction, ExportArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ConfigManager::default_path);
    let mut config = ConfigManager::new(&config_path);
    config
        .load_or_create()
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    let level = log_level(&cli, &config);
    match cli.command {
        Command::Config { action } => run_config(&mut config, action),
        Command::Analyze(args) => {
            let _guard = start_logging(&config, level)?;
            analyze(&mut config, args, cli.verbose).await
        }
        Command::Export(args) => {
            let _guard = start_logging(&config, level)?;
            export(&mut config, args, cli.verbose).await
        }
    }
}

/// `--verbose` wins, then `--log-level`, then the settings file.
fn log_level(cli: &Cli, config: &ConfigManager) -> LogLevel {
    if cli.verbose {
        LogLevel::Debug
    } else {
        cli.log_level.unwrap_or(config.settings().logging.level)
    }
}

fn start_logging(config: &ConfigManager, level: LogLevel) -> Result<WorkerGuard> {
    config
        .ensure_dirs_exist()
        .context("creating working directories")?;
    Ok(init_tracing_with_file(level, &config.logs_folder()))
}

fn run_config(config: &mut ConfigManager, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.generate_config_with_comments()?);
        }
        ConfigAction::Path => {
            println!("{}", config.path().display());
        }
        ConfigAction::Reset => {
            config.reset()?;
            println!("Settings reset to defaults: {}", config.path().display());
        }
    }
    Ok(())
}

async fn analyze(config: &mut ConfigManager, args: AnalyzeArgs, verbose: bool) -> Result<()> {
    let settings = config.settings().clone();
    ensure_tool(&settings)?;

    let mut request = AnalyzeRequest::new(&args.video, &args.audio);
    if let Some(seconds) = args.max_offset {
        request = request.with_max_offset(MaxOffset::new(seconds)?);
    }

    let slot = TaskSlot::new();
    let task = spawn_analyze(&slot, request, settings, verbose)?;
    let result = wait(task).await?;

    remember_inputs(config, &args.video, &args.audio);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_sync_result(&result);
    }
    Ok(())
}

async fn export(config: &mut ConfigManager, args: ExportArgs, verbose: bool) -> Result<()> {
    let settings = config.settings().clone();
    ensure_tool(&settings)?;

    let slot = TaskSlot::new();
    let offset = match args.offset {
        Some(offset) => {
            check_offset(offset)?;
            offset
        }
        None => {
            let mut request = AnalyzeRequest::new(&args.video, &args.audio);
            if let Some(seconds) = args.max_offset {
                request = request.with_max_offset(MaxOffset::new(seconds)?);
            }
            let task = spawn_analyze(&slot, request, settings.clone(), verbose)?;
            let result = wait(task).await?;
            print_sync_result(&result);
            result.offset_seconds
        }
    };

    let mut profile = settings.export.profile.clone();
    if let Some(format) = args.format {
        profile.format = format;
    }
    if let Some(resolution) = args.resolution {
        profile.resolution = resolution;
    }
    if let Some(codec) = args.video_codec {
        profile.video_codec = codec;
    }
    if let Some(codec) = args.audio_codec {
        profile.audio_codec = codec;
    }
    if let Some(rate) = args.video_bitrate {
        profile.video_bitrate = rate;
    }
    if let Some(rate) = args.audio_bitrate {
        profile.audio_bitrate = rate;
    }
    if let Some(preset) = args.preset {
        profile.preset = preset;
    }
    if let Some(crf) = args.crf {
        profile.crf = crf;
    }

    let mix_policy = if args.mix {
        MixPolicy::MixWithOriginal {
            original_gain: args.original_gain.unwrap_or(settings.export.original_gain),
            new_gain: args.new_gain.unwrap_or(settings.export.new_gain),
        }
    } else {
        settings.export.mix_policy()
    };

    let output = args.output.clone().unwrap_or_else(|| {
        let default = JobDescriptor::default_output_path(&args.video, profile.format);
        match default.file_name() {
            Some(name) => PathBuf::from(&settings.paths.output_folder).join(name),
            None => default.clone(),
        }
    });

    let job = JobDescriptor::new(&args.video, &args.audio, &output, offset)
        .with_profile(profile)
        .with_mix_policy(mix_policy);

    let task = spawn_export(&slot, job, settings, verbose)?;
    let outcome = wait(task).await?;

    remember_inputs(config, &args.video, &args.audio);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("Exported: {}", outcome.output_path.display());
        println!("Offset:   {:+.3} s", outcome.offset_seconds);
        if outcome.copied_video {
            println!("Video:    copied");
        }
    }
    Ok(())
}

/// Render events until the task ends, then return its result.
async fn wait<T: Send + 'static>(task: FlowTask<T>) -> Result<T> {
    let mut last: Option<(u32, String)> = None;
    let result = task
        .wait_with(|event| match event {
            FlowEvent::Progress(progress) => {
                let key = (progress.percent, progress.label);
                if last.as_ref() != Some(&key) {
                    eprintln!("[{:>3}%] {}", key.0, key.1);
                    last = Some(key);
                }
            }
            FlowEvent::Log(line) => eprintln!("{}", line),
        })
        .await?;
    Ok(result)
}

fn ensure_tool(settings: &Settings) -> Result<()> {
    let tool = &settings.tools.ffmpeg_path;
    which(tool).with_context(|| format!("`{tool}` not found in PATH"))?;
    Ok(())
}

fn remember_inputs(config: &mut ConfigManager, video: &Path, audio: &Path) {
    let paths = &mut config.settings_mut().paths;
    paths.last_video_path = video.to_string_lossy().to_string();
    paths.last_audio_path = audio.to_string_lossy().to_string();
    if let Err(e) = config.update_section(ConfigSection::Paths) {
        tracing::warn!("Failed to remember input paths: {}", e);
    }
}

fn print_sync_result(result: &SyncResult) {
    println!(
        "Offset:      {:+.3} s ({:+.1} ms)",
        result.offset_seconds,
        result.offset_ms()
    );
    println!(
        "Confidence:  {:.3} ({})",
        result.confidence,
        result.confidence_level()
    );
    println!("             {}", result.interpretation());
}

fn check_offset(offset: f64) -> Result<()> {
    if !offset.is_finite() {
        bail!("offset must be a finite number of seconds");
    }
    Ok(())
}
