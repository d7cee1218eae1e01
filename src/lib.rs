//! Sign Recorder - prompts an experimenter through subjects and signs and
//! records one webcam clip per attempt.
//!
//! This is the library crate behind the `sign-recorder` binary. It provides
//! the experiment state machine, capture sessions and the terminal front end.

pub mod capture;
pub mod config;
pub mod experiment;
pub mod output;
pub mod recorder;
pub mod ui;
pub mod utils;

use anyhow::Context;
use capture::webcam::camera_index;
use capture::WebcamSource;
use clap::Parser;
use config::{Cli, RecorderConfig};
use experiment::ExperimentCursor;
use output::FfmpegWriterFactory;
use recorder::{RecordingController, SharedStatus};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing to a log file; the terminal is in raw mode while the
/// front end runs
fn init_tracing(log_path: &Path) -> anyhow::Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("cannot open log file {:?}", log_path))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sign_recorder_lib=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false),
        )
        .init();
    Ok(())
}

fn print_cameras() {
    let cameras = capture::get_cameras();
    if cameras.is_empty() {
        println!("No cameras found");
    }
    for camera in cameras {
        println!("{}\t{}\t{}", camera.id, camera.name, camera.description);
    }
}

/// Run the recorder
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.list_cameras {
        print_cameras();
        return Ok(());
    }

    let config = RecorderConfig::resolve(&cli)?;
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("cannot create output directory {:?}", config.output_dir))?;
    init_tracing(&config.log_path())?;

    tracing::info!("Starting Sign Recorder v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Configuration: {:?}", config);

    if !output::ffmpeg_available() {
        anyhow::bail!("FFmpeg not found. Please install FFmpeg and make sure it is on the PATH");
    }

    // Subject order is defined by the experiment, so any bad line aborts startup
    let subjects = experiment::stimulus::load(&config.subjects_path)
        .with_context(|| format!("cannot load subjects from {:?}", config.subjects_path))?;

    let status = SharedStatus::new();
    let mut controller = RecordingController::new(
        ExperimentCursor::new(subjects),
        config.capture_settings(),
        Arc::new(WebcamSource::new(camera_index(&config.camera))),
        Arc::new(FfmpegWriterFactory::new(config.container)),
        Box::new(status.clone()),
    );

    ui::install_panic_hook();
    let result = ui::run(&mut controller, status).await;

    if let Err(e) = &result {
        tracing::error!("Front end failed: {:#}", e);
        controller.flush();
    }
    tracing::info!("Sign Recorder exiting");
    result
}
