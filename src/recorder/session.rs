//! Capture session
//!
//! One session owns one device and one output writer for a single recording
//! attempt. Both live on a dedicated worker thread that reads a frame per
//! iteration and writes it while the session's signal allows.

use super::state::{SessionOutcome, SessionReport};
use crate::capture::{DeviceSource, Frame, Resolution};
use crate::output::WriterFactory;
use crate::utils::{AppError, AppResult};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use uuid::Uuid;

const WRITING: u8 = 0;
const PAUSED: u8 = 1;
const STOPPING: u8 = 2;

/// The only state shared between the controller and a capture worker
#[derive(Debug)]
pub struct CaptureSignal(AtomicU8);

impl CaptureSignal {
    fn new() -> Self {
        Self(AtomicU8::new(WRITING))
    }

    pub fn is_writing(&self) -> bool {
        self.0.load(Ordering::SeqCst) == WRITING
    }

    pub fn is_stopping(&self) -> bool {
        self.0.load(Ordering::SeqCst) == STOPPING
    }

    fn pause(&self) {
        let _ = self
            .0
            .compare_exchange(WRITING, PAUSED, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn resume(&self) {
        let _ = self
            .0
            .compare_exchange(PAUSED, WRITING, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.0.store(STOPPING, Ordering::SeqCst);
    }
}

/// What to record
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Clip name without extension
    pub name: String,
    pub output_path: PathBuf,
    pub frame_rate: u32,
    /// Flip frames left to right before writing
    pub mirror: bool,
}

/// Latest written frame, published for live preview.
///
/// Readers may see a frame one iteration stale.
type PreviewSlot = Arc<Mutex<Option<Frame>>>;

/// Handle to a running capture worker
pub struct CaptureSession {
    id: Uuid,
    name: String,
    output_path: PathBuf,
    resolution: Resolution,
    signal: Arc<CaptureSignal>,
    preview: PreviewSlot,
    completion: oneshot::Receiver<SessionReport>,
    report: Option<SessionReport>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Start a worker and wait until it has acquired the device and writer.
    ///
    /// Acquisition failures are returned here; the worker has already
    /// released anything it opened by the time this returns.
    pub fn start(
        request: SessionRequest,
        devices: Arc<dyn DeviceSource>,
        writers: Arc<dyn WriterFactory>,
    ) -> AppResult<Self> {
        let id = Uuid::new_v4();
        let signal = Arc::new(CaptureSignal::new());
        let preview: PreviewSlot = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = oneshot::channel();

        tracing::info!(session = %id, "Starting capture '{}' from {}", request.name, devices.describe());

        let worker = Worker {
            id,
            request: request.clone(),
            signal: signal.clone(),
            preview: preview.clone(),
        };
        let thread = std::thread::Builder::new()
            .name(format!("capture-{}", &id.to_string()[..8]))
            .spawn(move || worker.run(devices, writers, ready_tx, done_tx))
            .map_err(|e| AppError::DeviceUnavailable(format!("failed to spawn capture worker: {}", e)))?;

        let startup = ready_rx.recv().unwrap_or_else(|_| {
            Err(AppError::DeviceUnavailable(
                "capture worker exited during startup".to_string(),
            ))
        });

        match startup {
            Ok(resolution) => Ok(Self {
                id,
                name: request.name,
                output_path: request.output_path,
                resolution,
                signal,
                preview,
                completion: done_rx,
                report: None,
                thread: Some(thread),
            }),
            Err(e) => {
                let _ = thread.join();
                tracing::warn!(session = %id, code = e.code(), "Capture failed to start: {}", e);
                Err(e)
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Ask the worker to finish. Returns immediately; the worker notices at
    /// its next iteration.
    pub fn stop(&self) {
        tracing::debug!(session = %self.id, "Stop requested");
        self.signal.stop();
    }

    /// Keep reading frames but discard them
    pub fn pause(&self) {
        self.signal.pause();
    }

    /// Write frames again after `pause`
    pub fn resume(&self) {
        self.signal.resume();
    }

    pub fn is_writing(&self) -> bool {
        self.signal.is_writing()
    }

    /// Resolution and index of the latest previewed frame
    pub fn preview_summary(&self) -> Option<(Resolution, u64)> {
        self.preview.lock().as_ref().map(|f| (f.resolution, f.index))
    }

    /// Take the latest previewed frame, if any
    pub fn take_preview(&self) -> Option<Frame> {
        self.preview.lock().take()
    }

    /// The session report once the worker has released its resources
    pub fn try_report(&mut self) -> Option<&SessionReport> {
        if self.report.is_none() {
            let report = match self.completion.try_recv() {
                Ok(report) => report,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => self.lost_report(),
            };
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
            self.report = Some(report);
        }
        self.report.as_ref()
    }

    /// Block until the worker exits
    pub fn wait(mut self) -> SessionReport {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!(session = %self.id, "Capture worker panicked");
            }
        }
        match self.report.take() {
            Some(report) => report,
            None => self
                .completion
                .try_recv()
                .unwrap_or_else(|_| self.lost_report()),
        }
    }

    /// Report for a worker that exited without sending one
    fn lost_report(&self) -> SessionReport {
        let mut report = SessionReport::begin(self.id, self.name.clone(), self.output_path.clone());
        report.end(SessionOutcome::DeviceEnded(
            "capture worker exited unexpectedly".to_string(),
        ));
        report
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // A dropped handle can never be stopped later
        self.signal.stop();
    }
}

/// State moved onto the capture thread
struct Worker {
    id: Uuid,
    request: SessionRequest,
    signal: Arc<CaptureSignal>,
    preview: PreviewSlot,
}

impl Worker {
    fn run(
        self,
        devices: Arc<dyn DeviceSource>,
        writers: Arc<dyn WriterFactory>,
        ready_tx: mpsc::Sender<AppResult<Resolution>>,
        done_tx: oneshot::Sender<SessionReport>,
    ) {
        let mut report = SessionReport::begin(
            self.id,
            self.request.name.clone(),
            self.request.output_path.clone(),
        );

        let mut device = match devices.open() {
            Ok(device) => device,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        let resolution = device.resolution();

        let mut writer =
            match writers.create(&self.request.output_path, resolution, self.request.frame_rate) {
                Ok(writer) => writer,
                Err(e) => {
                    drop(device);
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

        let _ = ready_tx.send(Ok(resolution));
        tracing::info!(
            session = %self.id,
            "Capture started: {}x{} @ {}fps, mirror={}, output: {:?}",
            resolution.width,
            resolution.height,
            self.request.frame_rate,
            self.request.mirror,
            self.request.output_path
        );

        let outcome = loop {
            if self.signal.is_stopping() {
                break SessionOutcome::Stopped;
            }

            // Blocks until the device delivers the next frame
            let mut frame = match device.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(session = %self.id, "Device stopped producing frames: {}", e);
                    break SessionOutcome::DeviceEnded(e.to_string());
                }
            };
            report.frames_read += 1;

            if !self.signal.is_writing() {
                continue;
            }

            if self.request.mirror {
                frame.mirror_horizontally();
            }
            if let Err(e) = writer.write_frame(&frame) {
                tracing::error!(session = %self.id, "Aborting capture: {}", e);
                break SessionOutcome::WriterFailed(e.to_string());
            }
            *self.preview.lock() = Some(frame);
        };

        drop(device);

        report.frames_written = writer.frame_count();
        let outcome = match (writer.finish(), outcome) {
            (Ok(()), outcome) => outcome,
            (Err(e), SessionOutcome::Stopped) => SessionOutcome::WriterFailed(e.to_string()),
            (Err(e), outcome) => {
                tracing::warn!(session = %self.id, "Failed to finalize clip: {}", e);
                outcome
            }
        };
        report.end(outcome);

        tracing::info!(
            session = %self.id,
            "Capture '{}' ended ({:?}): {} of {} frames written in {:.0}ms",
            report.name,
            report.outcome,
            report.frames_written,
            report.frames_read,
            report.duration_ms
        );

        let _ = done_tx.send(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::fakes::{wait_until, FakeCamera, MemoryWriters};
    use std::time::Duration;

    fn request(name: &str, mirror: bool) -> SessionRequest {
        SessionRequest {
            name: name.to_string(),
            output_path: PathBuf::from(format!("{name}.avi")),
            frame_rate: 30,
            mirror,
        }
    }

    #[test]
    fn test_start_stop_releases_device_and_writer() {
        let camera = FakeCamera::default();
        let writers = MemoryWriters::default();

        let session = CaptureSession::start(
            request("Alice A--Try1", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();
        assert_eq!(session.resolution(), camera.resolution);
        assert!(wait_until(Duration::from_secs(2), || writers.frames(0) >= 3));

        session.stop();
        let report = session.wait();

        assert_eq!(report.outcome, SessionOutcome::Stopped);
        assert!(report.frames_written >= 3);
        assert_eq!(camera.released(), 1);
        let clip = writers.clip(0);
        assert!(clip.finished);
        assert_eq!(clip.frames, report.frames_written);
        assert_eq!(clip.path, PathBuf::from("Alice A--Try1.avi"));
    }

    #[test]
    fn test_unavailable_device_fails_start() {
        let camera = FakeCamera::unavailable();
        let writers = MemoryWriters::default();

        let result = CaptureSession::start(
            request("Alice A--Try1", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        );

        assert!(matches!(result, Err(AppError::DeviceUnavailable(_))));
        assert_eq!(writers.clip_count(), 0);
    }

    #[test]
    fn test_writer_create_failure_releases_device() {
        let camera = FakeCamera::default();
        let writers = MemoryWriters::failing_create();

        let result = CaptureSession::start(
            request("Alice A--Try1", false),
            Arc::new(camera.clone()),
            Arc::new(writers),
        );

        assert!(matches!(result, Err(AppError::WriterFailure(_))));
        assert_eq!(camera.opened(), 1);
        assert_eq!(camera.released(), 1);
    }

    #[test]
    fn test_read_failure_ends_session_and_keeps_frames() {
        let camera = FakeCamera::with_frame_limit(5);
        let writers = MemoryWriters::default();

        let mut session = CaptureSession::start(
            request("Bob C--Try1", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();

        assert!(wait_until(Duration::from_secs(2), || session.try_report().is_some()));
        let report = session.try_report().cloned().unwrap();

        assert!(matches!(report.outcome, SessionOutcome::DeviceEnded(_)));
        assert_eq!(report.frames_written, 5);
        assert_eq!(camera.released(), 1);
        assert!(writers.clip(0).finished);
    }

    #[test]
    fn test_writer_failure_aborts_session() {
        let camera = FakeCamera::default();
        let writers = MemoryWriters::failing_after(3);

        let session = CaptureSession::start(
            request("Bob C--Try1", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();
        let report = session.wait();

        assert!(matches!(report.outcome, SessionOutcome::WriterFailed(_)));
        assert_eq!(report.frames_written, 3);
        assert_eq!(camera.released(), 1);
        assert!(writers.clip(0).closed);
    }

    #[test]
    fn test_paused_session_reads_but_discards() {
        let camera = FakeCamera::default();
        let writers = MemoryWriters::default();

        let session = CaptureSession::start(
            request("Alice A--Try1", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();

        session.pause();
        assert!(!session.is_writing());
        std::thread::sleep(Duration::from_millis(30));
        let written = writers.frames(0);
        let read = camera.frames_served();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(writers.frames(0), written);
        assert!(camera.frames_served() > read);

        session.resume();
        assert!(wait_until(Duration::from_secs(2), || writers.frames(0) > written));

        session.stop();
        let report = session.wait();
        assert!(report.frames_read > report.frames_written);
    }

    #[test]
    fn test_mirror_flips_written_frames() {
        let camera = FakeCamera::default();
        let width = camera.resolution.width as u8;

        let writers = MemoryWriters::default();
        let session = CaptureSession::start(
            request("mirrored", true),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();
        assert!(wait_until(Duration::from_secs(2), || writers.frames(0) >= 1));
        session.stop();
        session.wait();
        let first = writers.clip(0).first_frame.unwrap();
        assert_eq!(first[0], width - 1);

        let writers = MemoryWriters::default();
        let session = CaptureSession::start(
            request("plain", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();
        assert!(wait_until(Duration::from_secs(2), || writers.frames(0) >= 1));
        session.stop();
        session.wait();
        let first = writers.clip(0).first_frame.unwrap();
        assert_eq!(first[0], 0);
    }

    #[test]
    fn test_preview_tracks_written_frames() {
        let camera = FakeCamera::default();
        let writers = MemoryWriters::default();

        let session = CaptureSession::start(
            request("preview", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();
        assert!(wait_until(Duration::from_secs(2), || session.preview_summary().is_some()));
        let (resolution, _) = session.preview_summary().unwrap();
        assert_eq!(resolution, camera.resolution);

        let frame = session.take_preview();
        assert!(frame.is_some());
        session.stop();
        session.wait();
    }

    #[test]
    fn test_dropping_handle_stops_worker() {
        let camera = FakeCamera::default();
        let writers = MemoryWriters::default();

        let session = CaptureSession::start(
            request("dropped", false),
            Arc::new(camera.clone()),
            Arc::new(writers.clone()),
        )
        .unwrap();
        drop(session);

        assert!(wait_until(Duration::from_secs(2), || camera.released() == 1));
        assert!(wait_until(Duration::from_secs(2), || writers.clip(0).finished));
    }
}
