// Pipeline descriptor model
//
// A pipeline is the validated, engine-independent description of one
// transcoding run:
// - filter: labels, typed filter options and filter stages
// - command: serialization of a descriptor into engine arguments

pub mod command;
pub mod filter;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use command::*;
pub use filter::*;

use crate::error::{EditError, Result};

/// What happens to the video stream of the output.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoPolicy {
    /// Stream copy, no re-encoding
    Copy,
    /// Decode and write still frames with the output format's image encoder
    Still,
    /// Re-encode with the given encoder
    Encode {
        codec: String,
        preset: Option<String>,
        crf: Option<u8>,
    },
}

/// What happens to the audio stream of the output.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPolicy {
    Copy,
    Drop,
    Encode { codec: String, bitrate: Option<String> },
}

/// Output-side time restriction, half-open `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub duration: Option<f64>,
}

impl TimeWindow {
    pub fn end(&self) -> Option<f64> {
        self.duration.map(|d| self.start + d)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub path: PathBuf,
    pub video: VideoPolicy,
    pub audio: AudioPolicy,
    pub window: Option<TimeWindow>,
    /// Stop after this many video frames
    pub frames: Option<u32>,
    /// Force the output muxer
    pub format: Option<String>,
}

impl OutputSpec {
    pub fn new<P: Into<PathBuf>>(path: P, video: VideoPolicy, audio: AudioPolicy) -> Self {
        Self {
            path: path.into(),
            video,
            audio,
            window: None,
            frames: None,
            format: None,
        }
    }

    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn frames(mut self, frames: u32) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Finalized, immutable pipeline. Only obtainable through [`PipelineBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDescriptor {
    inputs: Vec<PathBuf>,
    stages: Vec<FilterStage>,
    output: OutputSpec,
    expected_duration: Option<f64>,
}

impl PipelineDescriptor {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn output(&self) -> &OutputSpec {
        &self.output
    }

    /// Output duration in seconds, when it is known up front.
    pub fn expected_duration(&self) -> Option<f64> {
        self.expected_duration
    }

    pub fn stage(&self, name: &str) -> Option<&FilterStage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Label of the last stage, which is what the output maps.
    pub fn graph_output(&self) -> Option<&Label> {
        self.stages.last().map(|s| &s.output)
    }

    pub fn filter_graph(&self) -> Option<String> {
        if self.stages.is_empty() {
            None
        } else {
            Some(render_graph(&self.stages))
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    inputs: Vec<PathBuf>,
    stages: Vec<FilterStage>,
    output: Option<OutputSpec>,
    expected_duration: Option<f64>,
}

impl PipelineBuilder {
    pub fn input<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inputs.push(path.as_ref().to_path_buf());
        self
    }

    pub fn stage(mut self, stage: FilterStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn output(mut self, output: OutputSpec) -> Self {
        self.output = Some(output);
        self
    }

    pub fn expected_duration(mut self, seconds: f64) -> Self {
        self.expected_duration = Some(seconds);
        self
    }

    /// Validate label connectivity and freeze the descriptor.
    pub fn build(self) -> Result<PipelineDescriptor> {
        if self.inputs.is_empty() {
            return Err(EditError::invalid_graph("pipeline has no input sources"));
        }
        let output = self
            .output
            .ok_or_else(|| EditError::invalid_graph("pipeline has no output"))?;

        if output.video == VideoPolicy::Still && output.frames.is_none() {
            return Err(EditError::invalid_graph("still image output needs a frame limit"));
        }

        let mut produced: HashSet<&str> = HashSet::new();
        let mut consumed: HashSet<&str> = HashSet::new();

        for stage in &self.stages {
            if stage.inputs.is_empty() {
                return Err(EditError::invalid_graph(format!(
                    "stage '{}' has no inputs",
                    stage.name
                )));
            }
            for input in &stage.inputs {
                match input {
                    Label::Source { index, .. } => {
                        if *index >= self.inputs.len() {
                            return Err(EditError::invalid_graph(format!(
                                "stage '{}' references source {} but only {} input(s) exist",
                                stage.name,
                                index,
                                self.inputs.len()
                            )));
                        }
                    }
                    Label::Named(name) => {
                        if !produced.contains(name.as_str()) {
                            return Err(EditError::invalid_graph(format!(
                                "stage '{}' references undefined label {}",
                                stage.name, input
                            )));
                        }
                        if !consumed.insert(name.as_str()) {
                            return Err(EditError::invalid_graph(format!(
                                "label {} is consumed more than once",
                                input
                            )));
                        }
                    }
                }
            }
            match &stage.output {
                Label::Named(name) => {
                    if !produced.insert(name.as_str()) {
                        return Err(EditError::invalid_graph(format!(
                            "label {} is produced by more than one stage",
                            stage.output
                        )));
                    }
                }
                Label::Source { .. } => {
                    return Err(EditError::invalid_graph(format!(
                        "stage '{}' writes to a source label",
                        stage.name
                    )));
                }
            }
        }

        // Every intermediate output feeds a later stage; only the last one is mapped.
        if let Some((last, rest)) = self.stages.split_last() {
            for stage in rest {
                if let Label::Named(name) = &stage.output {
                    if !consumed.contains(name.as_str()) {
                        return Err(EditError::invalid_graph(format!(
                            "output {} of stage '{}' is never used",
                            stage.output, stage.name
                        )));
                    }
                }
            }
            if let Label::Named(name) = &last.output {
                if consumed.contains(name.as_str()) {
                    return Err(EditError::invalid_graph(format!(
                        "final output {} is consumed inside the graph",
                        last.output
                    )));
                }
            }
            if output.video == VideoPolicy::Copy {
                return Err(EditError::invalid_graph(
                    "filtered video cannot be written with stream copy",
                ));
            }
        }

        Ok(PipelineDescriptor {
            inputs: self.inputs,
            stages: self.stages,
            output,
            expected_duration: self.expected_duration,
        })
    }
}
