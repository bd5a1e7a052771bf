// Transcoding engine abstraction
//
// The job executor only sees the `Engine` trait, so it can run against the
// real ffmpeg process adapter or against any substitute:
// - ffmpeg: process-backed implementation
// - progress: parsing of the engine's progress stream
// - ffprobe: container/stream metadata

pub mod ffmpeg;
pub mod probe;
pub mod progress;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use ffmpeg::FfmpegEngine;
pub use probe::MediaInfo;
pub use progress::{ProgressCallback, ProgressParser};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::pipeline::MediaCommand;

/// Result of one engine run that got as far as starting.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub succeeded: bool,
    /// Native return code; `None` when the process was killed by a signal
    pub return_code: Option<i32>,
    pub message: String,
}

impl EngineOutput {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { succeeded: true, return_code: Some(0), message: message.into() }
    }

    pub fn failure<S: Into<String>>(return_code: Option<i32>, message: S) -> Self {
        Self { succeeded: false, return_code, message: message.into() }
    }
}

/// Capability interface of the external transcoding engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Run one command to termination.
    ///
    /// Returns `Err(EditError::EngineLaunch)` when the engine could not be
    /// started; a started run always yields `Ok`, successful or not.
    async fn execute(&self, command: &MediaCommand, on_progress: ProgressCallback) -> Result<EngineOutput>;

    /// First line of the engine's version banner
    async fn version_info(&self) -> Result<String>;

    /// Container and stream metadata of a media file
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Binary that synthesized commands are addressed to
    fn binary_path(&self) -> &str;
}

/// Factory for creating engine instances
pub struct EngineFactory;

impl EngineFactory {
    /// Create the default engine implementation (ffmpeg process)
    pub fn create_engine(config: EngineConfig) -> Arc<dyn Engine> {
        Arc::new(FfmpegEngine::new(config))
    }
}
