//! Command line and configuration file
//!
//! Settings come from an optional JSON file and are overridden by flags.

use crate::experiment::stimulus::SUBJECTS_FILE;
use crate::output::VideoContainer;
use crate::recorder::CaptureSettings;
use crate::utils::AppResult;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log file written inside the output directory
pub const LOG_FILE: &str = "sign-recorder.log";

#[derive(Debug, Parser)]
#[command(
    name = "sign-recorder",
    version,
    about = "Displays prompts and records one webcam clip per subject and sign"
)]
pub struct Cli {
    /// Subjects file, one `name: sign, sign, ...` record per line
    #[arg(short, long)]
    pub subjects: Option<PathBuf>,

    /// Directory receiving the recorded clips
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target frame rate of the written clips
    #[arg(long)]
    pub fps: Option<u32>,

    /// Write frames as the camera delivers them instead of mirrored
    #[arg(long)]
    pub no_mirror: bool,

    /// Camera index or device id (see --list-cameras)
    #[arg(long)]
    pub camera: Option<String>,

    /// Output container
    #[arg(long, value_enum)]
    pub container: Option<VideoContainer>,

    /// Print the available cameras and exit
    #[arg(long)]
    pub list_cameras: bool,
}

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    pub subjects_path: PathBuf,
    pub output_dir: PathBuf,
    pub frame_rate: u32,
    pub mirror: bool,
    pub camera: String,
    pub container: VideoContainer,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            subjects_path: PathBuf::from(SUBJECTS_FILE),
            output_dir: PathBuf::from("."),
            frame_rate: 30,
            mirror: true,
            camera: "0".to_string(),
            container: VideoContainer::Avi,
        }
    }
}

impl RecorderConfig {
    /// Read a JSON configuration file; missing keys keep their defaults
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: RecorderConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Configuration file (if any) with command line overrides applied
    pub fn resolve(cli: &Cli) -> AppResult<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(subjects) = &cli.subjects {
            config.subjects_path = subjects.clone();
        }
        if let Some(output_dir) = &cli.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(fps) = cli.fps {
            config.frame_rate = fps;
        }
        if cli.no_mirror {
            config.mirror = false;
        }
        if let Some(camera) = &cli.camera {
            config.camera = camera.clone();
        }
        if let Some(container) = cli.container {
            config.container = container;
        }

        Ok(config)
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            output_dir: self.output_dir.clone(),
            frame_rate: self.frame_rate.max(1),
            mirror: self.mirror,
            container: self.container,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.output_dir.join(LOG_FILE)
    }
}
