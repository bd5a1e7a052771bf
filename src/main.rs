//! Reelcut - Video Editing Jobs for ffmpeg
//!
//! Command-line driver: builds one editing job, shows its progress and
//! prints the terminal result.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelcut::cli::{Args, Commands};
use reelcut::config::Config;
use reelcut::engine::FfmpegEngine;
use reelcut::jobs::{JobHandle, JobOutcome};
use reelcut::synth::Size;
use reelcut::{MediaEditor, OverlayPlacement};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("reelcut.toml").exists() {
                info!("Found reelcut.toml in current directory, loading...");
                Config::from_file("reelcut.toml")?
            } else {
                Config::default()
            }
        }
    };

    FfmpegEngine::new(config.engine.clone()).check_availability()?;

    let editor = MediaEditor::new(config);

    let handle = match args.command {
        Commands::Version => {
            println!("{}", editor.engine_version().await?);
            return Ok(());
        }
        Commands::Probe { input } => {
            let media = editor.probe(&input).await?;
            println!("{}", media.summary());
            if let (Some(w), Some(h)) = (media.width, media.height) {
                println!("Frame size: {}x{}", w, h);
            }
            return Ok(());
        }
        Commands::TrimMute { input, output, start, duration } => {
            editor.trim_and_mute(&input, &output, start, duration)?
        }
        Commands::Trim { input, output, start, duration } => {
            editor.trim_keep_audio(&input, &output, start, duration)?
        }
        Commands::Mute { input, output } => editor.mute(&input, &output)?,
        Commands::TrimTail { input, output, seconds } => editor.trim_tail(&input, &output, seconds).await?,
        Commands::Text { input, output, overlays } => {
            let overlays = std::fs::read_to_string(&overlays)?;
            editor.burn_text_json(&input, &output, &overlays)?
        }
        Commands::Thumbnail { input, output, at } => editor.generate_thumbnail_at(&input, &output, at)?,
        Commands::Overlay { base, image, output, x, y, scale, rotation, overlay_size } => {
            let source_size = match overlay_size {
                Some((w, h)) => Some(Size::new(w as f64, h as f64)),
                None => editor.resolve_overlay_size(&image).await,
            };
            let mut placement = OverlayPlacement::new(x, y, scale, rotation);
            if let Some(size) = source_size {
                placement = placement.with_source_size(size);
            }
            editor.overlay(&base, &image, &output, placement)?
        }
        Commands::Compress { input, output, crf, preset } => {
            editor.compress(&input, &output, crf, &preset)?
        }
    };

    let outcome = follow(handle).await;
    editor.shutdown().await?;

    match outcome {
        JobOutcome::Success { message } => {
            println!("{}", message);
            Ok(())
        }
        JobOutcome::Failure { code, message } => {
            eprintln!("{}: {}", code, message);
            std::process::exit(1);
        }
    }
}

/// Render progress until the job resolves.
async fn follow(mut handle: JobHandle) -> JobOutcome {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(120));

    if let Some(mut progress) = handle.take_progress() {
        let bar = bar.clone();
        tokio::spawn(async move {
            while let Some(update) = progress.recv().await {
                match update.fraction {
                    Some(fraction) => bar.set_message(format!("{:.0}%", fraction * 100.0)),
                    None => bar.set_message(format!("{:.1}s processed", update.seconds)),
                }
            }
        });
    }

    let outcome = handle.wait().await;
    bar.finish_and_clear();
    outcome
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".reelcut").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "reelcut.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("reelcut.log").display());

    Ok(())
}
