use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{Result, EditError};

fn default_stderr_tail_lines() -> usize {
    20
}

fn default_overwrite() -> bool {
    true
}

fn default_progress_capacity() -> usize {
    64
}

fn default_event_capacity() -> usize {
    256
}

fn default_retain_finished() -> usize {
    1024
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub encode: EncodeConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary, used for metadata and overlay size lookup
    pub probe_path: String,
    /// Ask the engine for machine-readable progress on stdout
    pub report_progress: bool,
    /// Number of trailing stderr lines kept in failure messages
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Video encoder used when compositing overlays
    pub overlay_video_codec: String,
    /// Encoder preset used when compositing overlays
    /// (ultrafast, fast, medium, slow, veryslow)
    pub overlay_preset: String,
    /// Video encoder used by the compress operation
    pub compress_video_codec: String,
    /// Audio encoder used by the compress operation
    pub compress_audio_codec: String,
    /// Audio bitrate used by the compress operation
    pub compress_audio_bitrate: String,
    /// Color of burned-in captions
    pub text_color: String,
    /// Font file for burned-in captions; the engine's default font when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Overwrite existing output files (`-y`)
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
    /// Buffered progress updates per job before new ones are dropped
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,
    /// Buffered job events on the shared event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Finished jobs kept queryable by `status`; older ones are forgotten
    #[serde(default = "default_retain_finished")]
    pub retain_finished: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            probe_path: "ffprobe".to_string(),
            report_progress: true,
            stderr_tail_lines: default_stderr_tail_lines(),
        }
    }
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            overlay_video_codec: "libx264".to_string(),
            overlay_preset: "ultrafast".to_string(),
            compress_video_codec: "libx264".to_string(),
            compress_audio_codec: "aac".to_string(),
            compress_audio_bitrate: "128k".to_string(),
            text_color: "white".to_string(),
            font_file: None,
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            overwrite: default_overwrite(),
            progress_capacity: default_progress_capacity(),
            event_capacity: default_event_capacity(),
            retain_finished: default_retain_finished(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EditError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| EditError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EditError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| EditError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}
