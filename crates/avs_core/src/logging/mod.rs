//! Logging for AV Sync.
//!
//! Two layers are involved. Process diagnostics go through `tracing`, set up
//! once by the binary with [`init_tracing`] or [`init_tracing_with_file`].
//! Each analyze or export run also gets a [`JobLogger`]: a plain-text log
//! file of milestones, commands and tool output that can be mirrored to a
//! callback.
//!
//! ```no_run
//! use avs_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("export_1a2b3c4d", ".logs", LogConfig::default(), None).unwrap();
//! logger.phase("Encode");
//! logger.command("ffmpeg -y -i clip.mp4 ...");
//! logger.progress(50, "Encoding video (this may take a while)...");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LineKind, LogCallback, LogConfig, LogLevel};

use std::path::Path;

pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a stderr-only subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(stderr_layer())
        .with(env_filter(default_level))
        .init();
}

/// Install a subscriber writing to stderr and to a daily-rolling `avs.log`
/// in `log_dir`.
///
/// File output stops when the returned guard is dropped.
pub fn init_tracing_with_file(default_level: LogLevel, log_dir: &Path) -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "avs.log"));

    tracing_subscriber::registry()
        .with(stderr_layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(env_filter(default_level))
        .init();

    guard
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer().with_target(false).with_writer(std::io::stderr)
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()))
}

#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
