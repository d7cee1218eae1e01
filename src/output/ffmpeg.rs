//! FFmpeg clip writer
//!
//! Raw RGB24 frames are piped to an FFmpeg child process over stdin, which
//! encodes them into the configured container.

use crate::capture::{Frame, Resolution};
use crate::output::types::{FrameWriter, VideoContainer, WriterFactory};
use crate::utils::{AppError, AppResult};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

/// Check whether an `ffmpeg` binary is on the PATH
pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Build the FFmpeg argument list for one clip
fn encoder_args(
    path: &Path,
    resolution: Resolution,
    frame_rate: u32,
    container: VideoContainer,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-n", // Never overwrite an earlier clip
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgb24",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.extend([
        "-s".to_string(),
        format!("{}x{}", resolution.width, resolution.height),
        "-r".to_string(),
        frame_rate.to_string(),
        "-i".to_string(),
        "-".to_string(),
    ]);
    args.extend(container.codec_args().iter().map(|s| s.to_string()));
    args.push(path.to_string_lossy().to_string());
    args
}

/// Spawns one FFmpeg encoder per clip
#[derive(Debug, Clone, Default)]
pub struct FfmpegWriterFactory {
    container: VideoContainer,
}

impl FfmpegWriterFactory {
    pub fn new(container: VideoContainer) -> Self {
        Self { container }
    }

    pub fn container(&self) -> VideoContainer {
        self.container
    }
}

impl WriterFactory for FfmpegWriterFactory {
    fn create(
        &self,
        path: &Path,
        resolution: Resolution,
        frame_rate: u32,
    ) -> AppResult<Box<dyn FrameWriter>> {
        if path.exists() {
            return Err(AppError::WriterFailure(format!(
                "refusing to overwrite existing clip {:?}",
                path
            )));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::WriterFailure(format!("cannot create {:?}: {}", parent, e)))?;
        }

        let args = encoder_args(path, resolution, frame_rate, self.container);
        tracing::info!("Starting FFmpeg encoder: {:?}", args);

        let mut process = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::WriterFailure(format!("Failed to start FFmpeg encoder: {}", e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| AppError::WriterFailure("Failed to capture FFmpeg stdin".to_string()))?;

        Ok(Box::new(FfmpegWriter {
            process,
            stdin: Some(stdin),
            resolution,
            path: path.to_path_buf(),
            frame_count: 0,
        }))
    }
}

/// Encoder process for a single clip
pub struct FfmpegWriter {
    process: Child,
    /// `None` once the encoder has been told to finish
    stdin: Option<ChildStdin>,
    resolution: Resolution,
    path: PathBuf,
    frame_count: u64,
}

impl FfmpegWriter {
    /// Close stdin and wait for FFmpeg, returning its error output
    fn close(&mut self) -> AppResult<()> {
        // Closing stdin signals EOF to FFmpeg
        drop(self.stdin.take());

        let mut stderr = String::new();
        if let Some(mut pipe) = self.process.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }

        let status = self
            .process
            .wait()
            .map_err(|e| AppError::WriterFailure(format!("Failed to wait for FFmpeg: {}", e)))?;

        if !status.success() {
            return Err(AppError::WriterFailure(format!(
                "FFmpeg exited with {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl FrameWriter for FfmpegWriter {
    fn write_frame(&mut self, frame: &Frame) -> AppResult<()> {
        if frame.resolution != self.resolution
            || frame.data.len() != self.resolution.rgb_frame_len()
        {
            return Err(AppError::WriterFailure(format!(
                "frame is {}x{} ({} bytes), encoder expects {}x{}",
                frame.resolution.width,
                frame.resolution.height,
                frame.data.len(),
                self.resolution.width,
                self.resolution.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AppError::WriterFailure("encoder already closed".to_string()))?;
        stdin
            .write_all(&frame.data)
            .map_err(|e| AppError::WriterFailure(format!("Failed to write frame: {}", e)))?;

        self.frame_count += 1;
        Ok(())
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn finish(mut self: Box<Self>) -> AppResult<()> {
        self.close()?;
        tracing::info!(
            "FFmpeg encoder finished: {} frames written to {:?}",
            self.frame_count,
            self.path
        );
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!("Encoder for {:?} closed with error: {}", self.path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_encoder_args_avi() {
        let args = encoder_args(
            Path::new("Alice A--Try1.avi"),
            Resolution::new(640, 480),
            30,
            VideoContainer::Avi,
        );
        let joined = args.join(" ");
        assert!(joined.contains("-pix_fmt rgb24"));
        assert!(joined.contains("-s 640x480"));
        assert!(joined.contains("-r 30"));
        assert!(joined.contains("-vtag xvid"));
        assert!(args.contains(&"-n".to_string()));
        assert_eq!(args.last().unwrap(), "Alice A--Try1.avi");
    }

    #[test]
    fn test_encoder_args_mp4() {
        let args = encoder_args(
            Path::new("clip.mp4"),
            Resolution::new(1280, 720),
            25,
            VideoContainer::Mp4,
        );
        assert!(args.join(" ").contains("-c:v libx264"));
    }

    #[test]
    fn test_create_refuses_existing_clip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Alice A--Try1.avi");
        std::fs::write(&path, b"partial").unwrap();

        let factory = FfmpegWriterFactory::new(VideoContainer::Avi);
        let result = factory.create(&path, Resolution::new(2, 2), 30);
        assert!(matches!(result, Err(AppError::WriterFailure(_))));
        assert_eq!(std::fs::read(&path).unwrap(), b"partial");
    }
}
