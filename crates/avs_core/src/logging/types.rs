//! Log levels, per-flow logger configuration, and line decorations.

use serde::{Deserialize, Serialize};

/// Minimum severity for flow logs and the process subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            other => return Err(format!("unknown log level '{}'", other)),
        };
        Ok(level)
    }
}

/// How a [`JobLogger`](super::JobLogger) filters and formats its output.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Only log progress when it crosses a `progress_step` boundary, and keep
    /// tool output out of the log unless a step fails.
    pub compact: bool,
    pub progress_step: u32,
    /// Tool output lines kept for failure reports.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

/// Receives every line a flow logger writes, already formatted.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Decoration applied to a flow log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Plain,
    /// `$ ffmpeg ...`
    Command,
    /// `=== Name ===`
    Phase,
    Success,
    Warning,
    Error,
}

impl LineKind {
    pub fn decorate(&self, message: &str) -> String {
        match self {
            LineKind::Plain => message.to_string(),
            LineKind::Command => format!("$ {}", message),
            LineKind::Phase => format!("=== {} ===", message),
            LineKind::Success => format!("[SUCCESS] {}", message),
            LineKind::Warning => format!("[WARNING] {}", message),
            LineKind::Error => format!("[ERROR] {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_accepts_aliases() {
        assert_eq!(" Warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::default().as_filter_str(), "info");
    }

    #[test]
    fn line_kinds_decorate() {
        assert_eq!(LineKind::Command.decorate("ffmpeg -y"), "$ ffmpeg -y");
        assert_eq!(LineKind::Phase.decorate("Export"), "=== Export ===");
        assert_eq!(LineKind::Plain.decorate("as is"), "as is");
    }
}
