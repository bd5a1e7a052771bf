//! Reelcut - Video Editing Jobs for ffmpeg
//!
//! Turns trim, mute, thumbnail, overlay, caption and compress requests into validated
//! ffmpeg filter pipelines and runs them one at a time on a background worker,
//! reporting progress and a single terminal result per job.

pub mod cli;
pub mod config;
pub mod editor;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod synth;

pub use editor::{MediaEditor, OverlayPlacement};
pub use error::{EditError, Result};
