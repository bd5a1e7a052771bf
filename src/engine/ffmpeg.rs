use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EditError, Result};
use crate::pipeline::MediaCommand;
use super::{Engine, EngineOutput, MediaInfo, ProgressCallback, ProgressParser};

/// Engine backed by an ffmpeg child process.
pub struct FfmpegEngine {
    config: EngineConfig,
}

impl FfmpegEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Check if ffmpeg is available
    pub fn check_availability(&self) -> Result<()> {
        let output = std::process::Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| EditError::EngineLaunch(format!("ffmpeg not found: {}", e)))?;

        if output.status.success() {
            info!("ffmpeg is available");
            Ok(())
        } else {
            Err(EditError::EngineExecution {
                code: output.status.code(),
                message: "ffmpeg version check failed".to_string(),
            })
        }
    }
}

#[async_trait]
impl Engine for FfmpegEngine {
    async fn execute(&self, command: &MediaCommand, on_progress: ProgressCallback) -> Result<EngineOutput> {
        let command = if self.config.report_progress {
            command.clone().with_global_args(["-progress", "pipe:1", "-nostats"])
        } else {
            command.clone()
        };

        debug!("Executing media processing command: {} {}", command.binary_path, command.command_line());
        debug!("Description: {}", command.description);

        let mut child = Command::new(&command.binary_path)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EditError::EngineLaunch(format!("{}: {}", command.binary_path, e)))?;

        // Drain stderr concurrently so a chatty engine never blocks on a full pipe.
        let tail_lines = self.config.stderr_tail_lines;
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_tail(stderr, tail_lines)));

        // Both pipes are read to EOF: closing one early would kill an engine
        // that still writes to it.
        if let Some(stdout) = child.stdout.take() {
            let mut parser = ProgressParser::new();
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            while let Some(line) = read_lossy_line(&mut reader, &mut buf).await {
                if let Some(seconds) = parser.feed(&line) {
                    on_progress(seconds);
                }
            }
        }

        let status = child.wait().await?;
        let tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        debug!("{} exited with {}", command.binary_path, status);

        if status.success() {
            Ok(EngineOutput::success(format!("{} completed", command.description)))
        } else {
            Ok(EngineOutput::failure(status.code(), tail.join("\n")))
        }
    }

    async fn version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .await
            .map_err(|e| EditError::EngineLaunch(format!("{}: {}", self.config.binary_path, e)))?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            let first_line = version_info.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(EditError::EngineExecution {
                code: output.status.code(),
                message: format!("version check failed: {}", stderr.trim()),
            })
        }
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        debug!("Probing {}", path.display());

        let output = Command::new(&self.config.probe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| EditError::EngineLaunch(format!("{}: {}", self.config.probe_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EditError::Probe(format!(
                "{} could not be probed: {}",
                path.display(),
                stderr.trim()
            )));
        }

        MediaInfo::from_json(&String::from_utf8_lossy(&output.stdout))
    }

    fn binary_path(&self) -> &str {
        &self.config.binary_path
    }
}

async fn collect_tail<R: AsyncRead + Unpin>(reader: R, keep: usize) -> Vec<String> {
    let mut tail = VecDeque::with_capacity(keep);
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    while let Some(line) = read_lossy_line(&mut reader, &mut buf).await {
        if keep == 0 {
            continue;
        }
        if tail.len() == keep {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into_iter().collect()
}

/// Next line without its terminator, with invalid UTF-8 replaced.
/// Returns `None` at EOF or on a read error.
async fn read_lossy_line<R: AsyncBufRead + Unpin>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String> {
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) => None,
        Ok(_) => {
            let line = String::from_utf8_lossy(&buf[..]);
            Some(line.trim_end_matches(['\r', '\n']).to_string())
        }
        Err(e) => {
            warn!("Failed to read engine output: {}", e);
            None
        }
    }
}
