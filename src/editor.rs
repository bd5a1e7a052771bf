use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{Engine, EngineFactory, MediaInfo};
use crate::error::{EditError, Result};
use crate::jobs::{JobEvent, JobExecutor, JobHandle, JobRequest};
use crate::synth::{parse_text_items, CommandSynthesizer, EditIntent, Position, Size, TextItem};

/// Where and how an overlay image lands on the base video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPlacement {
    pub position: Position,
    pub scale: f64,
    pub rotation_degrees: f64,
    /// Overlay image size, when already known
    pub source_size: Option<Size>,
}

impl OverlayPlacement {
    pub fn new(x: i64, y: i64, scale: f64, rotation_degrees: f64) -> Self {
        Self {
            position: Position { x, y },
            scale,
            rotation_degrees,
            source_size: None,
        }
    }

    pub fn with_source_size(mut self, size: Size) -> Self {
        self.source_size = Some(size);
        self
    }
}

/// Entry point for callers: turns editing requests into queued jobs.
///
/// Parameter errors are returned synchronously; everything the engine does
/// is reported through the returned [`JobHandle`].
pub struct MediaEditor {
    synthesizer: CommandSynthesizer,
    executor: JobExecutor,
    engine: Arc<dyn Engine>,
}

impl MediaEditor {
    /// Editor backed by the ffmpeg process engine. Requires a tokio runtime.
    pub fn new(config: Config) -> Self {
        let engine = EngineFactory::create_engine(config.engine.clone());
        Self::with_engine(config, engine)
    }

    pub fn with_engine(config: Config, engine: Arc<dyn Engine>) -> Self {
        let executor = JobExecutor::spawn(Arc::clone(&engine), config.executor.clone());
        Self {
            synthesizer: CommandSynthesizer::new(config.encode),
            executor,
            engine,
        }
    }

    /// Synthesize and enqueue any intent.
    pub fn submit<P: AsRef<Path>>(&self, intent: EditIntent, sources: Vec<PathBuf>, output: P) -> Result<JobHandle> {
        let descriptor = self.synthesizer.synthesize(&intent, &sources, output.as_ref())?;
        info!("{}: {} -> {}", intent.operation(), describe_sources(&sources), output.as_ref().display());
        Ok(self.executor.submit(JobRequest::new(
            descriptor,
            intent.operation(),
            intent.success_message(),
        )))
    }

    /// Trim to `[start, start + duration)` and drop the audio track.
    pub fn trim_and_mute<P: AsRef<Path>>(&self, input: P, output: P, start: f64, duration: f64) -> Result<JobHandle> {
        self.submit(
            EditIntent::TrimMute { start, duration },
            vec![input.as_ref().to_path_buf()],
            output,
        )
    }

    /// Trim to `[start, start + duration)` keeping audio, without re-encoding.
    pub fn trim_keep_audio<P: AsRef<Path>>(&self, input: P, output: P, start: f64, duration: f64) -> Result<JobHandle> {
        self.submit(
            EditIntent::TrimKeepAudio { start, duration },
            vec![input.as_ref().to_path_buf()],
            output,
        )
    }

    /// Drop the audio track, copying the video untouched.
    pub fn mute<P: AsRef<Path>>(&self, input: P, output: P) -> Result<JobHandle> {
        self.submit(EditIntent::Mute, vec![input.as_ref().to_path_buf()], output)
    }

    /// Drop the last `seconds` of the input. The input duration comes from
    /// the media metadata, so this fails with `PROBE_ERROR` when it is unknown.
    pub async fn trim_tail<P: AsRef<Path>>(&self, input: P, output: P, seconds: f64) -> Result<JobHandle> {
        let info = self.engine.probe(input.as_ref()).await?;
        if info.duration_seconds <= 0.0 {
            return Err(EditError::Probe(format!(
                "{} has no known duration",
                input.as_ref().display()
            )));
        }
        self.submit(
            EditIntent::TrimTail { seconds, source_duration: info.duration_seconds },
            vec![input.as_ref().to_path_buf()],
            output,
        )
    }

    /// Still image of the first frame.
    pub fn generate_thumbnail<P: AsRef<Path>>(&self, input: P, output: P) -> Result<JobHandle> {
        self.generate_thumbnail_at(input, output, 0.0)
    }

    pub fn generate_thumbnail_at<P: AsRef<Path>>(&self, input: P, output: P, offset: f64) -> Result<JobHandle> {
        self.submit(
            EditIntent::Thumbnail { offset },
            vec![input.as_ref().to_path_buf()],
            output,
        )
    }

    /// Composite `overlay` onto `base` after scaling and rotating it.
    pub fn overlay<P: AsRef<Path>>(&self, base: P, overlay: P, output: P, placement: OverlayPlacement) -> Result<JobHandle> {
        self.submit(
            EditIntent::Overlay {
                position: placement.position,
                scale: placement.scale,
                rotation_degrees: placement.rotation_degrees,
                source_size: placement.source_size,
            },
            vec![base.as_ref().to_path_buf(), overlay.as_ref().to_path_buf()],
            output,
        )
    }

    pub fn compress<P: AsRef<Path>>(&self, input: P, output: P, crf: u8, preset: &str) -> Result<JobHandle> {
        self.submit(
            EditIntent::Compress { crf, preset: preset.to_string() },
            vec![input.as_ref().to_path_buf()],
            output,
        )
    }

    /// Burn captions into the video, re-encoding it.
    pub fn burn_text<P: AsRef<Path>>(&self, input: P, output: P, items: Vec<TextItem>) -> Result<JobHandle> {
        self.submit(
            EditIntent::TextOverlay { items },
            vec![input.as_ref().to_path_buf()],
            output,
        )
    }

    /// [`burn_text`](Self::burn_text) from a JSON overlay list.
    pub fn burn_text_json<P: AsRef<Path>>(&self, input: P, output: P, overlays: &str) -> Result<JobHandle> {
        self.burn_text(input, output, parse_text_items(overlays)?)
    }

    pub async fn engine_version(&self) -> Result<String> {
        self.engine.version_info().await
    }

    pub async fn probe<P: AsRef<Path>>(&self, path: P) -> Result<MediaInfo> {
        self.engine.probe(path.as_ref()).await
    }

    /// Overlay image size from its metadata, if it can be determined.
    pub async fn resolve_overlay_size<P: AsRef<Path>>(&self, path: P) -> Option<Size> {
        match self.engine.probe(path.as_ref()).await {
            Ok(info) => info.frame_size(),
            Err(e) => {
                warn!("Could not probe overlay {}: {}", path.as_ref().display(), e);
                None
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.executor.subscribe()
    }

    pub fn executor(&self) -> &JobExecutor {
        &self.executor
    }

    /// Finish queued jobs and stop the worker.
    pub async fn shutdown(self) -> Result<()> {
        self.executor.shutdown().await
    }
}

fn describe_sources(sources: &[PathBuf]) -> String {
    sources
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" + ")
}
