//! Output types
//!
//! Container selection, clip naming and the writer traits used by capture
//! sessions.

use crate::capture::{Frame, Resolution};
use crate::experiment::Prompt;
use crate::utils::AppResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output container options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    /// XVID-tagged MPEG-4 Part 2 in AVI
    #[default]
    Avi,
    /// H.264 in MP4
    Mp4,
}

impl VideoContainer {
    /// Get the file extension for this container
    pub fn extension(&self) -> &'static str {
        match self {
            VideoContainer::Avi => "avi",
            VideoContainer::Mp4 => "mp4",
        }
    }

    /// FFmpeg output codec arguments for this container
    pub fn codec_args(&self) -> &'static [&'static str] {
        match self {
            VideoContainer::Avi => &["-c:v", "mpeg4", "-vtag", "xvid", "-q:v", "3"],
            VideoContainer::Mp4 => &[
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-crf",
                "18",
                "-pix_fmt",
                "yuv420p",
            ],
        }
    }
}

/// Base clip name for one recording attempt: `"{subject} {sign}--Try{attempt}"`
pub fn clip_name(prompt: &Prompt, attempt: u32) -> String {
    format!("{} {}--Try{}", prompt.subject, prompt.sign, attempt)
}

/// Full path of a clip inside the output directory
pub fn clip_path(output_dir: &Path, name: &str, container: VideoContainer) -> PathBuf {
    output_dir.join(format!("{}.{}", name, container.extension()))
}

/// Accepts frames for one output file.
///
/// A writer dropped without `finish` still closes its file; frames written
/// so far are kept.
pub trait FrameWriter {
    fn write_frame(&mut self, frame: &Frame) -> AppResult<()>;

    /// Number of frames written
    fn frame_count(&self) -> u64;

    /// Flush and close the output
    fn finish(self: Box<Self>) -> AppResult<()>;
}

/// Creates writers sized to the capture device
pub trait WriterFactory: Send + Sync {
    fn create(
        &self,
        path: &Path,
        resolution: Resolution,
        frame_rate: u32,
    ) -> AppResult<Box<dyn FrameWriter>>;
}
