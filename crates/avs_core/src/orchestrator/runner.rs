//! Transcoder process runner.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::errors::FlowError;

/// Output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Everything the tool wrote to stderr.
    pub stderr: String,
    /// Number of stderr lines seen.
    pub lines: usize,
}

/// Runs the transcoder, streaming stderr lines to a callback.
///
/// FFmpeg rewrites its status line with `\r`, so both `\r` and `\n` end a
/// line. The full stderr text is kept and returned verbatim in
/// [`FlowError::Encode`] when the tool exits non-zero.
pub struct ToolRunner {
    program: PathBuf,
}

impl ToolRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }


    /// Run with `args`, calling `on_line` for every non-empty stderr line.
    pub fn run<F>(&self, args: &[String], mut on_line: F) -> Result<ToolOutput, FlowError>
    where
        F: FnMut(&str),
    {
        let tool = self.program.to_string_lossy().to_string();
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        tracing::debug!("Running {}: {:?}", tool, args);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                FlowError::ToolMissing { tool: tool.clone() }
            } else {
                FlowError::io(format!("launching {}", tool), e)
            }
        })?;

        let mut raw = Vec::new();
        let mut lines = 0usize;
        if let Some(mut stderr) = child.stderr.take() {
            let mut chunk = [0u8; 4096];
            let mut pending = Vec::new();
            loop {
                let n = match stderr.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(FlowError::io(format!("reading {} output", tool), e));
                    }
                };
                raw.extend_from_slice(&chunk[..n]);
                for &byte in &chunk[..n] {
                    if byte == b'\n' || byte == b'\r' {
                        lines += emit_line(&mut pending, &mut on_line);
                    } else {
                        pending.push(byte);
                    }
                }
            }
            lines += emit_line(&mut pending, &mut on_line);
        }

        let status = child
            .wait()
            .map_err(|e| FlowError::io(format!("waiting for {}", tool), e))?;
        let stderr = String::from_utf8_lossy(&raw).into_owned();

        if !status.success() {
            return Err(FlowError::encode(status.code(), stderr));
        }

        Ok(ToolOutput { stderr, lines })
    }
}

fn emit_line<F: FnMut(&str)>(pending: &mut Vec<u8>, on_line: &mut F) -> usize {
    if pending.is_empty() {
        return 0;
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return 0;
    }
    on_line(trimmed);
    1
}
