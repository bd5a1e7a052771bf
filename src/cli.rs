use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::synth::DEFAULT_TAIL_SECONDS;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cut a segment out of a video and drop its audio
    TrimMute {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Start time in seconds
        #[arg(short, long, default_value = "0")]
        start: f64,

        /// Duration in seconds
        #[arg(short, long)]
        duration: f64,
    },

    /// Cut a segment out of a video, keeping audio
    Trim {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Start time in seconds
        #[arg(short, long, default_value = "0")]
        start: f64,

        /// Duration in seconds
        #[arg(short, long)]
        duration: f64,
    },

    /// Drop the audio track of a video
    Mute {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cut the last seconds off a video, keeping audio
    TrimTail {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Seconds removed from the end
        #[arg(short, long, default_value_t = DEFAULT_TAIL_SECONDS)]
        seconds: f64,
    },

    /// Extract a single frame as an image
    Thumbnail {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output image file
        #[arg(short, long)]
        output: PathBuf,

        /// Frame time in seconds
        #[arg(long, default_value = "0")]
        at: f64,
    },

    /// Composite a scaled, rotated image onto a video
    Overlay {
        /// Base video file
        #[arg(short, long)]
        base: PathBuf,

        /// Overlay image file
        #[arg(long)]
        image: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Left offset in pixels
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        x: i64,

        /// Top offset in pixels
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        y: i64,

        /// Uniform scale factor
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// Rotation in degrees
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        rotation: f64,

        /// Overlay image size as WIDTHxHEIGHT; read from the image when omitted
        #[arg(long, value_parser = parse_size)]
        overlay_size: Option<(u32, u32)>,
    },

    /// Burn text captions into a video
    Text {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with a list of {"type", "content", "x", "y", "scale"} overlays
        #[arg(long)]
        overlays: PathBuf,
    },

    /// Re-encode a video at a constant rate factor
    Compress {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Constant rate factor (0-51, lower = better quality)
        #[arg(long, default_value = "28")]
        crf: u8,

        /// Encoder preset
        #[arg(long, default_value = "faster")]
        preset: String,
    },

    /// Show container and stream metadata
    Probe {
        /// Media file
        input: PathBuf,
    },

    /// Show the engine version
    Version,
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".to_string());
    }
    Ok((w, h))
}
