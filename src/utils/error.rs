//! Error types and handling
//!
//! Common error types used across the recorder.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// A subjects line without the `name:signs` separator
    #[error("Malformed record on line {line}: {content:?} (expected `name: sign, sign, ...`)")]
    MalformedRecord { line: usize, content: String },

    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Frame read failed: {0}")]
    FrameReadFailure(String),

    #[error("Video writer failed: {0}")]
    WriterFailure(String),

    #[error("Already recording")]
    AlreadyRecording,

    #[error("No active prompt: {0}")]
    NoActivePrompt(String),
}

impl AppError {
    /// Stable code used as a structured log field
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::MalformedRecord { .. } => "MALFORMED_RECORD",
            AppError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            AppError::FrameReadFailure(_) => "FRAME_READ_FAILURE",
            AppError::WriterFailure(_) => "WRITER_FAILURE",
            AppError::AlreadyRecording => "ALREADY_RECORDING",
            AppError::NoActivePrompt(_) => "NO_ACTIVE_PROMPT",
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
