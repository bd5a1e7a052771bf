//! Substitute engines shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reelcut::engine::{Engine, EngineOutput, MediaInfo, ProgressCallback};
use reelcut::pipeline::MediaCommand;
use reelcut::{EditError, Result};

/// One call the recording engine served.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Vec<String>,
    pub started: Instant,
    pub finished: Instant,
}

impl Invocation {
    /// Output path, always the last argument.
    pub fn output(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or_default()
    }

    /// Value following `flag`, if present.
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// What the recording engine does for outputs matching a marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    /// Run to completion with a non-zero return code
    ExitWith(i32),
    /// Fail before the run starts
    FailLaunch,
    Panic,
}

/// Engine that records every call and never touches a process.
///
/// Outputs whose path contains `fail`, `nolaunch` or `panic` select the
/// matching [`Behavior`]; anything else succeeds after `delay`.
pub struct RecordingEngine {
    delay: Duration,
    progress: Vec<f64>,
    calls: Mutex<Vec<Invocation>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingEngine {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            progress: Vec::new(),
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Report these processed-seconds values during every run.
    pub fn with_progress(mut self, values: &[f64]) -> Self {
        self.progress = values.to_vec();
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of runs observed in flight at once.
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn behavior_for(output: &str) -> Behavior {
        if output.contains("nolaunch") {
            Behavior::FailLaunch
        } else if output.contains("panic") {
            Behavior::Panic
        } else if output.contains("fail") {
            Behavior::ExitWith(1)
        } else {
            Behavior::Succeed
        }
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    async fn execute(&self, command: &MediaCommand, on_progress: ProgressCallback) -> Result<EngineOutput> {
        let started = Instant::now();
        let output = command.args.last().cloned().unwrap_or_default();
        let behavior = Self::behavior_for(&output);

        if behavior == Behavior::FailLaunch {
            self.calls.lock().unwrap().push(Invocation {
                args: command.args.clone(),
                started,
                finished: Instant::now(),
            });
            return Err(EditError::EngineLaunch("ffmpeg: No such file or directory".into()));
        }

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        for value in &self.progress {
            on_progress(*value);
        }
        tokio::time::sleep(self.delay).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Invocation {
            args: command.args.clone(),
            started,
            finished: Instant::now(),
        });

        match behavior {
            Behavior::Panic => panic!("engine crashed on {}", output),
            Behavior::ExitWith(rc) => Ok(EngineOutput::failure(Some(rc), "Conversion failed!")),
            _ => Ok(EngineOutput::success("")),
        }
    }

    async fn version_info(&self) -> Result<String> {
        Ok("ffmpeg version 6.1.1 Copyright (c) 2000-2023 the FFmpeg developers".to_string())
    }

    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        if path.to_string_lossy().contains("missing") {
            return Err(EditError::Probe(format!("{}: No such file or directory", path.display())));
        }
        let name = path.to_string_lossy();
        if name.ends_with(".mp4") {
            let duration = if name.contains("short") { "1.5" } else { "10.5" };
            return MediaInfo::from_json(&format!(
                r#"{{"streams": [{{"codec_type": "video", "width": 1280, "height": 720}}, {{"codec_type": "audio"}}],
                    "format": {{"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "{}"}}}}"#,
                duration
            ));
        }
        MediaInfo::from_json(
            r#"{"streams": [{"codec_type": "video", "width": 200, "height": 100}],
                "format": {"format_name": "png_pipe"}}"#,
        )
    }

    fn binary_path(&self) -> &str {
        "ffmpeg"
    }
}
