use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};
use crate::synth::Size;

// Subset of `ffprobe -print_format json -show_format -show_streams`
#[derive(Debug, Clone, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub format: Option<FfprobeFormat>,
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FfprobeFormat {
    pub format_name: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Container and stream metadata of a media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub format: String,
    pub duration_seconds: f64,
    /// Bits per second
    pub bit_rate: Option<u64>,
    pub streams: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MediaInfo {
    pub fn from_json(json: &str) -> Result<Self> {
        let output: FfprobeOutput = serde_json::from_str(json)?;
        Self::try_from(output)
    }

    /// Size of the first video stream.
    pub fn frame_size(&self) -> Option<Size> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Size::new(w as f64, h as f64)),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        let bit_rate = self
            .bit_rate
            .map(|b| format!("{} kb/s", b / 1000))
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Format: {}\nDuration: {} seconds\nBit rate: {}\nStreams: {}",
            self.format, self.duration_seconds, bit_rate, self.streams
        )
    }
}

impl TryFrom<FfprobeOutput> for MediaInfo {
    type Error = EditError;

    fn try_from(output: FfprobeOutput) -> Result<Self> {
        let format = output
            .format
            .ok_or_else(|| EditError::Probe("probe output has no format section".to_string()))?;

        // Still images report no duration
        let duration_seconds = format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .map(f64::abs)
            .unwrap_or(0.0);

        let bit_rate = format.bit_rate.as_deref().and_then(|b| b.parse::<u64>().ok());

        let video = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));

        Ok(MediaInfo {
            format: format.format_name,
            duration_seconds,
            bit_rate,
            streams: output.streams.len(),
            width: video.and_then(|s| s.width),
            height: video.and_then(|s| s.height),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "width": 1920, "height": 1080},
            {"index": 1, "codec_type": "audio"}
        ],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "12.480000", "bit_rate": "4521000"}
    }"#;

    #[test]
    fn test_parses_video_metadata() {
        let info = MediaInfo::from_json(VIDEO_JSON).unwrap();
        assert_eq!(info.streams, 2);
        assert_eq!(info.duration_seconds, 12.48);
        assert_eq!(info.bit_rate, Some(4_521_000));
        assert_eq!(info.frame_size(), Some(Size::new(1920.0, 1080.0)));
        assert_eq!(
            info.summary(),
            "Format: mov,mp4,m4a,3gp,3g2,mj2\nDuration: 12.48 seconds\nBit rate: 4521 kb/s\nStreams: 2"
        );
    }

    #[test]
    fn test_image_without_duration() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 200, "height": 100}],
                       "format": {"format_name": "png_pipe"}}"#;
        let info = MediaInfo::from_json(json).unwrap();
        assert_eq!(info.duration_seconds, 0.0);
        assert_eq!(info.frame_size(), Some(Size::new(200.0, 100.0)));
    }

    #[test]
    fn test_missing_format_is_metadata_error() {
        let err = MediaInfo::from_json(r#"{"streams": []}"#).unwrap_err();
        assert_eq!(err.code(), "PROBE_ERROR");
    }
}
