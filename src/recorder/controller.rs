//! Recording controller
//!
//! Turns front-end actions into cursor moves and capture session
//! starts/stops, keeping at most one session active.

use super::session::{CaptureSession, SessionRequest};
use super::state::{RecordingState, SessionOutcome, SessionReport};
use super::surface::{ControlSurface, StatusSink};
use crate::capture::{DeviceSource, Resolution};
use crate::experiment::{CursorState, CursorStep, ExperimentCursor, Prompt};
use crate::output::{clip_name, clip_path, VideoContainer, WriterFactory};
use crate::utils::{AppError, AppResult};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shown before the first prompt
pub const START_MESSAGE: &str = "Press Next to get started";

/// Shown once every subject is exhausted
pub const COMPLETE_MESSAGE: &str = "All data collected";

/// Stopped sessions still releasing their resources before we warn
const DRAINING_WARN_THRESHOLD: usize = 3;

/// Events emitted by the controller
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    /// Recording of a clip started
    Started { name: String },
    /// Stop was requested for a clip
    Stopped { name: String },
    /// A new prompt is active
    Advanced(Prompt),
    /// Every prompt has been shown
    Completed,
    /// A session released its device and writer
    SessionEnded(SessionReport),
    /// Error occurred
    Error(String),
}

/// How clips are captured and where they go
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub output_dir: PathBuf,
    pub frame_rate: u32,
    pub mirror: bool,
    pub container: VideoContainer,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            frame_rate: 30,
            mirror: true,
            container: VideoContainer::Avi,
        }
    }
}

/// Owns the cursor and the active capture session
pub struct RecordingController {
    cursor: ExperimentCursor,
    settings: CaptureSettings,
    devices: Arc<dyn DeviceSource>,
    writers: Arc<dyn WriterFactory>,
    status: Box<dyn StatusSink>,

    /// Current recording state
    state: RecordingState,

    /// Recordings started for the current prompt
    attempts_since_last_advance: u32,

    active: Option<CaptureSession>,

    /// Stopped sessions that have not reported back yet
    draining: Vec<CaptureSession>,

    exit_requested: bool,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl RecordingController {
    pub fn new(
        cursor: ExperimentCursor,
        settings: CaptureSettings,
        devices: Arc<dyn DeviceSource>,
        writers: Arc<dyn WriterFactory>,
        status: Box<dyn StatusSink>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        status.show_status(START_MESSAGE);
        Self {
            cursor,
            settings,
            devices,
            writers,
            status,
            state: RecordingState::Idle,
            attempts_since_last_advance: 0,
            active: None,
            draining: Vec::new(),
            exit_requested: false,
            event_tx,
        }
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn attempts_since_last_advance(&self) -> u32 {
        self.attempts_since_last_advance
    }

    pub fn cursor(&self) -> &ExperimentCursor {
        &self.cursor
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Name of the clip being recorded
    pub fn active_clip(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.name())
    }

    /// Resolution and index of the latest frame written by the active session
    pub fn preview(&self) -> Option<(Resolution, u64)> {
        self.active.as_ref().and_then(|s| s.preview_summary())
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: RecordingEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Start recording the current prompt, or stop the running recording
    pub fn toggle_record(&mut self) -> AppResult<()> {
        let result = match self.state {
            RecordingState::Recording => {
                self.stop_recording();
                Ok(())
            }
            RecordingState::Idle => self.start_recording(),
        };
        self.poll();
        result
    }

    /// Stop any recording, then move to the next prompt
    pub fn advance(&mut self) -> CursorStep {
        if self.state == RecordingState::Recording {
            self.stop_recording();
        }
        self.attempts_since_last_advance = 0;

        let step = self.cursor.advance();
        match &step {
            CursorStep::Prompt(prompt) => {
                self.status.show_status(&prompt.to_string());
                self.emit(RecordingEvent::Advanced(prompt.clone()));
            }
            CursorStep::Complete => {
                tracing::info!("All {} subjects complete", self.cursor.subject_count());
                self.status.show_status(COMPLETE_MESSAGE);
                self.emit(RecordingEvent::Completed);
            }
        }

        self.poll();
        step
    }

    /// Request termination. A running session is not stopped first.
    pub fn exit(&mut self) {
        if self.is_recording() {
            tracing::warn!(
                "Exit requested while recording {:?}; the clip ends where the process does",
                self.active_clip()
            );
        }
        self.exit_requested = true;
    }

    fn start_recording(&mut self) -> AppResult<()> {
        if self.active.is_some() {
            return Err(AppError::AlreadyRecording);
        }

        let Some(prompt) = self.cursor.current_prompt() else {
            let message = match self.cursor.state() {
                CursorState::Complete => COMPLETE_MESSAGE,
                _ => START_MESSAGE,
            };
            self.status.show_status(message);
            return Err(AppError::NoActivePrompt(message.to_string()));
        };

        self.attempts_since_last_advance += 1;
        let name = clip_name(&prompt, self.attempts_since_last_advance);
        let request = SessionRequest {
            output_path: clip_path(&self.settings.output_dir, &name, self.settings.container),
            name: name.clone(),
            frame_rate: self.settings.frame_rate,
            mirror: self.settings.mirror,
        };

        match CaptureSession::start(request, self.devices.clone(), self.writers.clone()) {
            Ok(session) => {
                self.active = Some(session);
                self.state = RecordingState::Recording;
                self.status.show_status(&prompt.to_string());
                self.emit(RecordingEvent::Started { name });
                Ok(())
            }
            Err(e) => {
                // No file was touched, so the attempt number can be reused
                if matches!(e, AppError::DeviceUnavailable(_)) {
                    self.attempts_since_last_advance -= 1;
                }
                self.state = RecordingState::Idle;
                self.status.show_status(&format!("Recording failed: {}", e));
                self.emit(RecordingEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Signal the active session to stop without waiting for it
    fn stop_recording(&mut self) {
        self.state = RecordingState::Idle;

        if let Some(session) = self.active.take() {
            session.stop();
            self.emit(RecordingEvent::Stopped {
                name: session.name().to_string(),
            });
            self.draining.push(session);

            if self.draining.len() > DRAINING_WARN_THRESHOLD {
                tracing::warn!(
                    "{} stopped sessions are still releasing their camera and encoder",
                    self.draining.len()
                );
            }
        }
    }

    /// Collect sessions that have finished.
    ///
    /// An active session that ended on its own flips the controller back to
    /// idle and its reason is shown in the status text.
    pub fn poll(&mut self) {
        let ended = self
            .active
            .as_mut()
            .and_then(|session| session.try_report().cloned());

        if let Some(report) = ended {
            self.active = None;
            self.state = RecordingState::Idle;

            let message = match &report.outcome {
                SessionOutcome::DeviceEnded(reason) => {
                    format!("Recording ended, camera stopped: {}", reason)
                }
                SessionOutcome::WriterFailed(reason) => format!("Recording failed: {}", reason),
                SessionOutcome::Stopped => format!("Recording ended: {}", report.name),
            };
            self.status.show_status(&message);
            self.emit(RecordingEvent::SessionEnded(report));
        }

        let mut finished = Vec::new();
        self.draining.retain_mut(|session| match session.try_report() {
            Some(report) => {
                finished.push(report.clone());
                false
            }
            None => true,
        });
        for report in finished {
            self.drained(report);
        }
    }

    /// Stop the active session and wait for every session to release its
    /// device and writer
    pub fn flush(&mut self) -> Vec<SessionReport> {
        self.stop_recording();

        let reports: Vec<SessionReport> = self
            .draining
            .drain(..)
            .map(CaptureSession::wait)
            .collect();
        for report in &reports {
            self.drained(report.clone());
        }
        reports
    }

    fn drained(&self, report: SessionReport) {
        if let SessionOutcome::WriterFailed(reason) = &report.outcome {
            tracing::error!(session = %report.id, "Clip '{}' failed: {}", report.name, reason);
            self.status
                .show_status(&format!("Clip {} failed: {}", report.name, reason));
        }
        self.emit(RecordingEvent::SessionEnded(report));
    }
}

impl ControlSurface for RecordingController {
    fn on_toggle_record(&mut self) {
        if let Err(e) = self.toggle_record() {
            tracing::warn!(code = e.code(), "Record toggle failed: {}", e);
        }
    }

    fn on_advance(&mut self) {
        self.advance();
    }

    fn on_exit(&mut self) {
        self.exit();
    }
}
