//! Per-flow log file.
//!
//! A [`JobLogger`] owns `<logs_folder>/<flow>.log` for one analyze or export
//! run and mirrors every line to an optional callback. It also remembers the
//! last lines of transcoder output so a failed encode can be explained.

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LineKind, LogCallback, LogConfig, LogLevel};

pub struct JobLogger {
    log_path: PathBuf,
    file: Mutex<Option<BufWriter<File>>>,
    callback: Option<LogCallback>,
    config: LogConfig,
    tail: Mutex<Tail>,
    gate: Mutex<ProgressGate>,
}

impl JobLogger {
    /// Create `<log_dir>/<job_name>.log`, truncating any previous file.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_name: String = job_name.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", file_stem(&job_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            log_path,
            file: Mutex::new(Some(BufWriter::new(file))),
            callback,
            tail: Mutex::new(Tail::new(config.error_tail)),
            gate: Mutex::new(ProgressGate::new(config.compact, config.progress_step)),
            config,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn info(&self, message: &str) {
        self.emit(LogLevel::Info, LineKind::Plain, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, LineKind::Plain, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, LineKind::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, LineKind::Error, message);
    }

    pub fn success(&self, message: &str) {
        self.emit(LogLevel::Info, LineKind::Success, message);
    }

    pub fn command(&self, command_line: &str) {
        self.emit(LogLevel::Info, LineKind::Command, command_line);
    }

    pub fn phase(&self, name: &str) {
        self.emit(LogLevel::Info, LineKind::Phase, name);
    }

    /// Log a progress milestone unless the gate filters it.
    ///
    /// Returns whether a line was written.
    pub fn progress(&self, percent: u32, label: &str) -> bool {
        if !self.gate.lock().admit(percent) {
            return false;
        }
        self.info(&format!("Progress: {}% {}", percent, label));
        true
    }

    /// Record one line of tool output.
    ///
    /// The line always enters the tail; it reaches the log itself only when
    /// compact mode is off.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        self.tail.lock().push(line);
        if !self.config.compact {
            let origin = if is_stderr { "[stderr] " } else { "" };
            self.debug(&format!("{}{}", origin, line));
        }
    }

    /// Write the remembered tool output under a `[<tool>/tail]` header.
    pub fn show_tail(&self, tool: &str) {
        let lines = self.tail();
        if lines.is_empty() {
            return;
        }
        self.write_line(&format!("[{}/tail]", tool));
        for line in &lines {
            self.write_line(line);
        }
    }

    pub fn tail(&self) -> Vec<String> {
        self.tail.lock().lines.iter().cloned().collect()
    }

    /// Log the command one option per line.
    pub fn log_command_pretty(&self, program: &str, tokens: &[String]) {
        self.info(&format!(
            "{} \\\n{}",
            program,
            crate::mux::format_tokens_pretty(tokens)
        ));
    }

    /// Log the argument vector as JSON at debug level.
    pub fn log_command_json(&self, tokens: &[String]) {
        match serde_json::to_string(tokens) {
            Ok(json) => self.debug(&format!("ffmpeg args (json): {}", json)),
            Err(e) => tracing::debug!("Could not encode ffmpeg args: {}", e),
        }
    }

    pub fn flush(&self) {
        if let Some(file) = self.file.lock().as_mut() {
            let _ = file.flush();
        }
    }

    fn emit(&self, level: LogLevel, kind: LineKind, message: &str) {
        if level >= self.config.level {
            self.write_line(&kind.decorate(message));
        }
    }

    fn write_line(&self, line: &str) {
        let stamped = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), line)
        } else {
            line.to_string()
        };

        if let Some(file) = self.file.lock().as_mut() {
            let _ = writeln!(file, "{}", stamped);
        }
        if let Some(callback) = &self.callback {
            callback(&stamped);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        if let Some(mut file) = self.file.lock().take() {
            let _ = file.flush();
        }
    }
}

/// Bounded ring of the most recent tool output lines.
struct Tail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Tail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: &str) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }
}

/// Decides which progress values are worth a log line.
///
/// Compact mode admits a value when it enters a new `step`-wide bucket, and
/// always admits the first 100. Otherwise only exact repeats are dropped.
struct ProgressGate {
    compact: bool,
    step: u32,
    last: Option<u32>,
}

impl ProgressGate {
    fn new(compact: bool, step: u32) -> Self {
        Self {
            compact,
            step: step.max(1),
            last: None,
        }
    }

    fn admit(&mut self, percent: u32) -> bool {
        let admitted = match self.last {
            None => true,
            Some(prev) if self.compact => {
                percent / self.step > prev / self.step || (percent >= 100 && prev < 100)
            }
            Some(prev) => percent != prev,
        };
        if admitted {
            self.last = Some(percent);
        }
        admitted
    }
}

/// Replace characters that are not allowed in file names.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn untimed() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    fn read_log(logger: &JobLogger) -> String {
        logger.flush();
        fs::read_to_string(logger.log_path()).unwrap()
    }

    #[test]
    fn lines_land_in_named_file() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("analyze_1a2b3c4d", dir.path(), untimed(), None).unwrap();

        logger.phase("analyze");
        logger.command("ffmpeg -i clip.mp4");

        assert!(logger.log_path().ends_with("analyze_1a2b3c4d.log"));
        let content = read_log(&logger);
        assert!(content.contains("=== analyze ==="));
        assert!(content.contains("$ ffmpeg -i clip.mp4"));
    }

    #[test]
    fn callback_sees_lines_at_or_above_level() {
        let dir = tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: LogCallback = Box::new(move |line| sink.lock().push(line.to_string()));

        let logger = JobLogger::new("job", dir.path(), untimed(), Some(callback)).unwrap();
        logger.info("kept");
        logger.debug("dropped");
        logger.error("broken");

        assert_eq!(*seen.lock(), vec!["kept".to_string(), "[ERROR] broken".to_string()]);
    }

    #[test]
    fn timestamps_prefix_lines() {
        let dir = tempdir().unwrap();
        let logger = JobLogger::new("job", dir.path(), LogConfig::default(), None).unwrap();
        logger.info("hello");

        let content = read_log(&logger);
        let line = content.lines().next().unwrap();
        assert!(line.starts_with('['));
        assert!(line.ends_with("] hello"));
    }

    #[test]
    fn compact_progress_logs_bucket_changes() {
        let mut gate = ProgressGate::new(true, 20);
        let admitted: Vec<u32> = [10, 15, 30, 35, 50, 50, 75, 100]
            .into_iter()
            .filter(|p| gate.admit(*p))
            .collect();
        assert_eq!(admitted, vec![10, 30, 50, 75, 100]);
    }

    #[test]
    fn verbose_progress_drops_only_repeats() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: false,
            ..untimed()
        };
        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();

        assert!(logger.progress(75, "Encoding video..."));
        assert!(!logger.progress(75, "Encoding video..."));
        assert!(logger.progress(76, "Encoding video..."));
        assert!(read_log(&logger).contains("Progress: 76% Encoding video..."));
    }

    #[test]
    fn tail_keeps_latest_lines() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 3,
            ..untimed()
        };
        let logger = JobLogger::new("job", dir.path(), config, None).unwrap();

        for i in 0..6 {
            logger.output_line(&format!("frame={}", i), true);
        }
        assert_eq!(logger.tail(), vec!["frame=3", "frame=4", "frame=5"]);

        logger.show_tail("ffmpeg");
        let content = read_log(&logger);
        assert!(content.contains("[ffmpeg/tail]"));
        assert!(content.contains("frame=5"));
        assert!(!content.contains("frame=2"));
    }

    #[test]
    fn zero_tail_keeps_nothing() {
        let mut tail = Tail::new(0);
        tail.push("frame=1");
        assert!(tail.lines.is_empty());
    }

    #[test]
    fn unsafe_name_characters_are_replaced() {
        assert_eq!(file_stem("export_ab12"), "export_ab12");
        assert_eq!(file_stem("a/b:c"), "a_b_c");
    }
}
