//! Recording state management
//!
//! Defines the controller's recording state and the per-session report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Current state of the recording controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    #[default]
    Idle,
    /// Currently recording
    Recording,
}

/// Why a capture session ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "camelCase")]
pub enum SessionOutcome {
    /// Stopped on request
    Stopped,
    /// The device stopped producing frames
    DeviceEnded(String),
    /// The output could not be written or finalized
    WriterFailed(String),
}

impl SessionOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, SessionOutcome::Stopped)
    }
}

/// Summary of one finished capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    /// Unique session ID for log correlation
    pub id: Uuid,

    /// Clip name without extension
    pub name: String,

    /// Output file path
    pub output_path: PathBuf,

    /// Frames read from the device, including discarded ones
    pub frames_read: u64,

    /// Frames written to the output file
    pub frames_written: u64,

    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,

    /// Wall clock duration in milliseconds
    pub duration_ms: f64,

    pub outcome: SessionOutcome,
}

impl SessionReport {
    /// Create a report for a session starting now
    pub fn begin(id: Uuid, name: String, output_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            output_path,
            frames_read: 0,
            frames_written: 0,
            started_at: now,
            ended_at: now,
            duration_ms: 0.0,
            outcome: SessionOutcome::Stopped,
        }
    }

    /// Close the report with its outcome
    pub fn end(&mut self, outcome: SessionOutcome) {
        self.ended_at = Utc::now();
        self.duration_ms = (self.ended_at - self.started_at).num_microseconds().unwrap_or(0) as f64 / 1000.0;
        self.outcome = outcome;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_end_sets_duration_and_outcome() {
        let mut report = SessionReport::begin(Uuid::new_v4(), "Alice A--Try1".into(), "a.avi".into());
        report.end(SessionOutcome::DeviceEnded("unplugged".into()));
        assert!(report.duration_ms >= 0.0);
        assert!(report.ended_at >= report.started_at);
        assert!(report.outcome.is_failure());
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_string(&SessionOutcome::WriterFailed("disk full".into())).unwrap();
        assert_eq!(json, r#"{"kind":"writerFailed","reason":"disk full"}"#);
        assert!(!SessionOutcome::Stopped.is_failure());
    }
}
