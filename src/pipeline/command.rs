use std::path::Path;

use super::{AudioPolicy, PipelineDescriptor, VideoPolicy};

/// Engine invocation: binary plus ordered argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Serialize a validated pipeline into the engine's argument grammar:
    /// inputs, filter graph, output stream options, output path last.
    pub fn from_pipeline<S1: Into<String>, S2: Into<String>>(
        binary_path: S1,
        description: S2,
        descriptor: &PipelineDescriptor,
        overwrite: bool,
    ) -> Self {
        let mut cmd = Self::new(binary_path, description);
        if overwrite {
            cmd = cmd.overwrite();
        }

        for input in descriptor.inputs() {
            cmd = cmd.input(input);
        }

        let output = descriptor.output();

        if let Some(graph) = descriptor.filter_graph() {
            cmd = cmd.filter_complex(graph);
            if let Some(label) = descriptor.graph_output() {
                cmd = cmd.map(label.to_string());
            }
            if output.audio != AudioPolicy::Drop {
                cmd = cmd.map("0:a?");
            }
        }

        if let Some(window) = output.window {
            cmd = cmd.arg("-ss").arg(format_seconds(window.start));
            if let Some(duration) = window.duration {
                cmd = cmd.arg("-t").arg(format_seconds(duration));
            }
        }

        if let Some(frames) = output.frames {
            cmd = cmd.arg("-frames:v").arg(frames.to_string());
        }

        cmd = match &output.video {
            VideoPolicy::Copy => cmd.copy_video(),
            // The image muxer picks the encoder from the output name.
            VideoPolicy::Still => cmd,
            VideoPolicy::Encode { codec, preset, crf } => {
                let mut cmd = cmd.video_codec(codec.as_str());
                if let Some(crf) = crf {
                    cmd = cmd.arg("-crf").arg(crf.to_string());
                }
                if let Some(preset) = preset {
                    cmd = cmd.arg("-preset").arg(preset.as_str());
                }
                cmd
            }
        };

        cmd = match &output.audio {
            AudioPolicy::Copy => cmd.copy_audio(),
            AudioPolicy::Drop => cmd.no_audio(),
            AudioPolicy::Encode { codec, bitrate } => {
                let mut cmd = cmd.audio_codec(codec.as_str());
                if let Some(bitrate) = bitrate {
                    cmd = cmd.arg("-b:a").arg(bitrate.as_str());
                }
                cmd
            }
        };

        if let Some(format) = &output.format {
            cmd = cmd.arg("-f").arg(format.as_str());
        }

        cmd.output(&output.path)
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.arg("-filter_complex").arg(graph)
    }

    pub fn map<S: Into<String>>(self, spec: S) -> Self {
        self.arg("-map").arg(spec)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Insert arguments right after any leading `-y`, before the first input.
    pub fn with_global_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let at = usize::from(self.args.first().map(|a| a == "-y").unwrap_or(false));
        let extra: Vec<String> = args.into_iter().map(|s| s.into()).collect();
        self.args.splice(at..at, extra);
        self
    }

    /// Single-line textual form, quoting arguments that need it.
    pub fn command_line(&self) -> String {
        self.args.iter().map(|a| quote_arg(a)).collect::<Vec<_>>().join(" ")
    }
}

/// Seconds as the engine accepts them: `5`, `1.5`, `0.04`.
pub fn format_seconds(seconds: f64) -> String {
    format!("{}", seconds)
}

fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | '[' | ']' | '\'' | '"' | '?' | '*'));
    if needs_quotes {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{FilterStage, Label, OutputSpec, ParamValue, TimeWindow};

    #[test]
    fn test_trim_serializes_input_window_codecs_output() {
        let descriptor = PipelineDescriptor::builder()
            .input("in.mp4")
            .output(
                OutputSpec::new("out.mp4", VideoPolicy::Copy, AudioPolicy::Drop)
                    .window(TimeWindow { start: 3.0, duration: Some(2.5) }),
            )
            .build()
            .unwrap();

        let cmd = MediaCommand::from_pipeline("ffmpeg", "Trim", &descriptor, false);
        assert_eq!(
            cmd.args,
            vec!["-i", "in.mp4", "-ss", "3", "-t", "2.5", "-c:v", "copy", "-an", "out.mp4"]
        );
    }

    #[test]
    fn test_still_image_has_frame_limit_and_format() {
        let descriptor = PipelineDescriptor::builder()
            .input("in.mp4")
            .output(
                OutputSpec::new("thumb.jpg", VideoPolicy::Still, AudioPolicy::Drop)
                    .window(TimeWindow { start: 0.0, duration: None })
                    .frames(1)
                    .format("image2"),
            )
            .build()
            .unwrap();

        let cmd = MediaCommand::from_pipeline("ffmpeg", "Thumbnail", &descriptor, true);
        assert_eq!(
            cmd.args,
            vec!["-y", "-i", "in.mp4", "-ss", "0", "-frames:v", "1", "-an", "-f", "image2", "thumb.jpg"]
        );
    }

    #[test]
    fn test_filter_graph_is_one_flag_and_output_is_mapped() {
        let descriptor = PipelineDescriptor::builder()
            .input("base.mp4")
            .input("logo.png")
            .stage(
                FilterStage::new("overlay", "composited")
                    .input(Label::video(0))
                    .input(Label::video(1))
                    .param("x", ParamValue::Int(5))
                    .param("y", ParamValue::Int(6)),
            )
            .output(OutputSpec::new(
                "out.mp4",
                VideoPolicy::Encode {
                    codec: "libx264".into(),
                    preset: Some("ultrafast".into()),
                    crf: None,
                },
                AudioPolicy::Copy,
            ))
            .build()
            .unwrap();

        let cmd = MediaCommand::from_pipeline("ffmpeg", "Overlay", &descriptor, false);
        assert_eq!(
            cmd.args,
            vec![
                "-i", "base.mp4", "-i", "logo.png",
                "-filter_complex", "[0:v][1:v]overlay=x=5:y=6[composited]",
                "-map", "[composited]", "-map", "0:a?",
                "-c:v", "libx264", "-preset", "ultrafast", "-c:a", "copy",
                "out.mp4",
            ]
        );
        assert_eq!(cmd.args.iter().filter(|a| *a == "-filter_complex").count(), 1);
        assert_eq!(cmd.args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_global_args_go_after_overwrite_flag() {
        let cmd = MediaCommand::new("ffmpeg", "x")
            .overwrite()
            .input("a.mp4")
            .with_global_args(["-progress", "pipe:1"]);
        assert_eq!(cmd.args, vec!["-y", "-progress", "pipe:1", "-i", "a.mp4"]);

        let cmd = MediaCommand::new("ffmpeg", "x").input("a.mp4").with_global_args(["-nostats"]);
        assert_eq!(cmd.args, vec!["-nostats", "-i", "a.mp4"]);
    }

    #[test]
    fn test_command_line_quotes_graph() {
        let cmd = MediaCommand::new("ffmpeg", "x")
            .filter_complex("[0:v]null[out]")
            .output("my clip.mp4");
        assert_eq!(cmd.command_line(), "-filter_complex \"[0:v]null[out]\" \"my clip.mp4\"");
    }
}
