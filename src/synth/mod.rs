// Command synthesis
//
// Pure mapping from an editing intent to a validated pipeline descriptor.
// Nothing here touches the filesystem or spawns work.

pub mod geometry;
pub mod text;

use std::path::{Path, PathBuf};

pub use geometry::*;
pub use text::{parse_text_items, TextItem};

use crate::config::EncodeConfig;
use crate::error::{EditError, Result};
use crate::pipeline::{
    AudioPolicy, FilterStage, Label, OutputSpec, ParamValue, PipelineDescriptor, TimeWindow,
    VideoPolicy,
};

const SCALED: &str = "scaled";
const RGBA: &str = "rgba";
const ROTATED: &str = "rotated";
const COMPOSITED: &str = "composited";
const CAPTION: &str = "text";

/// Seconds dropped from the end of a clip when no length is given.
pub const DEFAULT_TAIL_SECONDS: f64 = 2.0;

/// Editing operation with its semantic parameters. Times are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum EditIntent {
    /// Copy video over `[start, start + duration)`, drop audio
    TrimMute { start: f64, duration: f64 },
    /// Copy video and audio over `[start, start + duration)`
    TrimKeepAudio { start: f64, duration: f64 },
    /// Copy video over the whole source, drop audio
    Mute,
    /// Copy both streams, dropping the last `seconds` of a source that
    /// runs for `source_duration` seconds
    TrimTail { seconds: f64, source_duration: f64 },
    /// Extract one still frame at `offset`
    Thumbnail { offset: f64 },
    /// Scale, rotate and composite the second source onto the first.
    /// `source_size` is the overlay image size when known; otherwise the
    /// engine evaluates the same geometry from the decoded frame.
    Overlay {
        position: Position,
        scale: f64,
        rotation_degrees: f64,
        source_size: Option<Size>,
    },
    /// Re-encode at a constant rate factor
    Compress { crf: u8, preset: String },
    /// Burn captions into the video, drawn in list order
    TextOverlay { items: Vec<TextItem> },
}

impl EditIntent {
    pub fn operation(&self) -> &'static str {
        match self {
            EditIntent::TrimMute { .. } => "Trim and mute",
            EditIntent::TrimKeepAudio { .. } => "Trim",
            EditIntent::Mute => "Mute",
            EditIntent::TrimTail { .. } => "Tail trim",
            EditIntent::Thumbnail { .. } => "Thumbnail generation",
            EditIntent::Overlay { .. } => "Overlay addition",
            EditIntent::Compress { .. } => "Compression",
            EditIntent::TextOverlay { .. } => "Text overlay",
        }
    }

    /// Message delivered with a successful completion.
    pub fn success_message(&self) -> &'static str {
        match self {
            EditIntent::TrimMute { .. } => "Video processed successfully",
            EditIntent::TrimKeepAudio { .. } => "Video trimmed successfully",
            EditIntent::Mute => "Video muted successfully",
            EditIntent::TrimTail { .. } => "Video tail trimmed successfully",
            EditIntent::Thumbnail { .. } => "Thumbnail generated successfully",
            EditIntent::Overlay { .. } => "Overlay added successfully",
            EditIntent::Compress { .. } => "Video compressed successfully",
            EditIntent::TextOverlay { .. } => "Text overlays burned successfully",
        }
    }

    fn source_count(&self) -> usize {
        match self {
            EditIntent::Overlay { .. } => 2,
            _ => 1,
        }
    }
}

/// Maps intents to pipeline descriptors using the configured encoders.
#[derive(Debug, Clone, Default)]
pub struct CommandSynthesizer {
    encode: EncodeConfig,
}

impl CommandSynthesizer {
    pub fn new(encode: EncodeConfig) -> Self {
        Self { encode }
    }

    pub fn synthesize<P: AsRef<Path>>(
        &self,
        intent: &EditIntent,
        sources: &[PathBuf],
        output: P,
    ) -> Result<PipelineDescriptor> {
        if sources.len() != intent.source_count() {
            return Err(EditError::invalid_parameter(format!(
                "{} takes {} source(s), got {}",
                intent.operation(),
                intent.source_count(),
                sources.len()
            )));
        }
        let output = output.as_ref();

        match intent {
            EditIntent::TrimMute { start, duration } => {
                trim(&sources[0], output, *start, *duration, AudioPolicy::Drop)
            }
            EditIntent::TrimKeepAudio { start, duration } => {
                trim(&sources[0], output, *start, *duration, AudioPolicy::Copy)
            }
            EditIntent::Mute => mute(&sources[0], output),
            EditIntent::TrimTail { seconds, source_duration } => {
                trim_tail(&sources[0], output, *seconds, *source_duration)
            }
            EditIntent::Thumbnail { offset } => thumbnail(&sources[0], output, *offset),
            EditIntent::Overlay { position, scale, rotation_degrees, source_size } => self.overlay(
                &sources[0],
                &sources[1],
                output,
                *position,
                *scale,
                *rotation_degrees,
                *source_size,
            ),
            EditIntent::Compress { crf, preset } => self.compress(&sources[0], output, *crf, preset),
            EditIntent::TextOverlay { items } => self.text_overlay(&sources[0], output, items),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn overlay(
        &self,
        base: &Path,
        overlay: &Path,
        output: &Path,
        position: Position,
        scale: f64,
        rotation_degrees: f64,
        source_size: Option<Size>,
    ) -> Result<PipelineDescriptor> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(EditError::invalid_parameter(format!(
                "scale must be positive, got {}",
                scale
            )));
        }
        if !rotation_degrees.is_finite() {
            return Err(EditError::invalid_parameter("rotation must be a finite angle"));
        }
        if let Some(size) = source_size {
            if !(size.width.is_finite() && size.height.is_finite())
                || size.width <= 0.0
                || size.height <= 0.0
            {
                return Err(EditError::invalid_parameter(format!(
                    "overlay source size must be positive, got {}x{}",
                    size.width, size.height
                )));
            }
        }

        // The rotation itself gets the raw angle; the bounding box uses the
        // normalized one.
        let angle = radians_expr(rotation_degrees);
        let bounds_angle = radians_expr(normalize_degrees(rotation_degrees));

        let (scale_w, scale_h, out_w, out_h) = match source_size {
            Some(size) => {
                let geometry = OverlayGeometry::compute(size, scale, rotation_degrees);
                let (sw, sh) = geometry.scaled.to_pixels();
                let (bw, bh) = geometry.bounds.to_pixels();
                (
                    ParamValue::Int(sw),
                    ParamValue::Int(sh),
                    ParamValue::Int(bw),
                    ParamValue::Int(bh),
                )
            }
            None => (
                ParamValue::Expr(format!("iw*{}", scale)),
                ParamValue::Expr(format!("ih*{}", scale)),
                ParamValue::Expr(format!("rotw({})", bounds_angle)),
                ParamValue::Expr(format!("roth({})", bounds_angle)),
            ),
        };

        PipelineDescriptor::builder()
            .input(base)
            .input(overlay)
            .stage(
                FilterStage::new("scale", SCALED)
                    .input(Label::video(1))
                    .param("w", scale_w)
                    .param("h", scale_h),
            )
            // Without an alpha channel the corners exposed by rotate stay opaque.
            .stage(
                FilterStage::new("format", RGBA)
                    .input(Label::named(SCALED))
                    .param("pix_fmts", ParamValue::Keyword(RGBA.to_string())),
            )
            .stage(
                FilterStage::new("rotate", ROTATED)
                    .input(Label::named(RGBA))
                    .param("a", ParamValue::Expr(angle))
                    .param("c", ParamValue::Keyword("none".to_string()))
                    .param("ow", out_w)
                    .param("oh", out_h),
            )
            .stage(
                FilterStage::new("overlay", COMPOSITED)
                    .input(Label::video(0))
                    .input(Label::named(ROTATED))
                    .param("x", ParamValue::Int(position.x))
                    .param("y", ParamValue::Int(position.y)),
            )
            .output(OutputSpec::new(
                output,
                VideoPolicy::Encode {
                    codec: self.encode.overlay_video_codec.clone(),
                    preset: Some(self.encode.overlay_preset.clone()),
                    crf: None,
                },
                AudioPolicy::Copy,
            ))
            .build()
    }

    /// One `drawtext` stage per caption, chained from the base video.
    fn text_overlay(&self, input: &Path, output: &Path, items: &[TextItem]) -> Result<PipelineDescriptor> {
        if items.is_empty() {
            return Err(EditError::invalid_parameter("no captions to burn"));
        }

        let mut builder = PipelineDescriptor::builder().input(input);
        let mut previous = Label::video(0);
        for (i, item) in items.iter().enumerate() {
            item.validate()?;
            let label = format!("{}{}", CAPTION, i);
            let mut stage = FilterStage::new("drawtext", &label)
                .input(previous)
                .param("text", ParamValue::Text(text::escape_drawtext(&item.text)))
                .param("x", ParamValue::Int(item.x as i64))
                .param("y", ParamValue::Int(item.y as i64))
                .param("fontsize", ParamValue::Int(item.font_size()))
                .param("fontcolor", ParamValue::Keyword(self.encode.text_color.clone()));
            if let Some(font) = &self.encode.font_file {
                stage = stage.param("fontfile", ParamValue::Text(font.clone()));
            }
            builder = builder.stage(stage);
            previous = Label::named(label);
        }

        builder
            .output(OutputSpec::new(
                output,
                VideoPolicy::Encode {
                    codec: self.encode.overlay_video_codec.clone(),
                    preset: Some(self.encode.overlay_preset.clone()),
                    crf: None,
                },
                AudioPolicy::Copy,
            ))
            .build()
    }

    fn compress(&self, input: &Path, output: &Path, crf: u8, preset: &str) -> Result<PipelineDescriptor> {
        if crf > 51 {
            return Err(EditError::invalid_parameter(format!(
                "crf must be within 0..=51, got {}",
                crf
            )));
        }
        if preset.is_empty() || preset.chars().any(char::is_whitespace) {
            return Err(EditError::invalid_parameter(format!("invalid preset '{}'", preset)));
        }

        PipelineDescriptor::builder()
            .input(input)
            .output(OutputSpec::new(
                output,
                VideoPolicy::Encode {
                    codec: self.encode.compress_video_codec.clone(),
                    preset: Some(preset.to_string()),
                    crf: Some(crf),
                },
                AudioPolicy::Encode {
                    codec: self.encode.compress_audio_codec.clone(),
                    bitrate: Some(self.encode.compress_audio_bitrate.clone()),
                },
            ))
            .build()
    }
}

fn trim(input: &Path, output: &Path, start: f64, duration: f64, audio: AudioPolicy) -> Result<PipelineDescriptor> {
    check_time("start", start)?;
    check_time("duration", duration)?;
    if duration == 0.0 {
        return Err(EditError::invalid_parameter("duration must be greater than zero"));
    }

    PipelineDescriptor::builder()
        .input(input)
        .output(
            OutputSpec::new(output, VideoPolicy::Copy, audio)
                .window(TimeWindow { start, duration: Some(duration) }),
        )
        .expected_duration(duration)
        .build()
}

fn mute(input: &Path, output: &Path) -> Result<PipelineDescriptor> {
    PipelineDescriptor::builder()
        .input(input)
        .output(OutputSpec::new(output, VideoPolicy::Copy, AudioPolicy::Drop))
        .build()
}

fn trim_tail(input: &Path, output: &Path, seconds: f64, source_duration: f64) -> Result<PipelineDescriptor> {
    check_time("tail length", seconds)?;
    check_time("source duration", source_duration)?;
    let keep = source_duration - seconds;
    if keep <= 0.0 {
        return Err(EditError::invalid_parameter(format!(
            "cannot drop {}s from a {}s source",
            seconds, source_duration
        )));
    }
    trim(input, output, 0.0, keep, AudioPolicy::Copy)
}

fn thumbnail(input: &Path, output: &Path, offset: f64) -> Result<PipelineDescriptor> {
    check_time("offset", offset)?;

    PipelineDescriptor::builder()
        .input(input)
        .output(
            OutputSpec::new(output, VideoPolicy::Still, AudioPolicy::Drop)
                .window(TimeWindow { start: offset, duration: None })
                .frames(1)
                .format("image2"),
        )
        .build()
}

fn check_time(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(EditError::invalid_parameter(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }
    Ok(())
}

fn radians_expr(degrees: f64) -> String {
    format!("{}*PI/180", degrees)
}
