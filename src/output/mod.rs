//! Clip output
//!
//! Naming of recorded clips and the FFmpeg writer that encodes them.

pub mod ffmpeg;
pub mod types;

pub use ffmpeg::{ffmpeg_available, FfmpegWriterFactory};
pub use types::{clip_name, clip_path, FrameWriter, VideoContainer, WriterFactory};
