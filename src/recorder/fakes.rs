//! In-memory capture devices and writers for tests

use crate::capture::{CaptureDevice, DeviceSource, Frame, Resolution};
use crate::output::{FrameWriter, WriterFactory};
use crate::utils::{AppError, AppResult};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Camera producing frames where every channel of pixel `x` equals `x`
#[derive(Clone)]
pub struct FakeCamera {
    pub resolution: Resolution,
    available: bool,
    frame_limit: Option<u64>,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    served: Arc<AtomicU64>,
}

impl Default for FakeCamera {
    fn default() -> Self {
        Self {
            resolution: Resolution::new(8, 4),
            available: true,
            frame_limit: None,
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
            served: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl FakeCamera {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Each opened device fails after `limit` frames
    pub fn with_frame_limit(limit: u64) -> Self {
        Self {
            frame_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn frames_served(&self) -> u64 {
        self.served.load(Ordering::SeqCst)
    }
}

impl DeviceSource for FakeCamera {
    fn open(&self) -> AppResult<Box<dyn CaptureDevice>> {
        if !self.available {
            return Err(AppError::DeviceUnavailable("no camera attached".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDevice {
            camera: self.clone(),
            read: 0,
        }))
    }

    fn describe(&self) -> String {
        "fake camera".to_string()
    }
}

struct FakeDevice {
    camera: FakeCamera,
    read: u64,
}

impl CaptureDevice for FakeDevice {
    fn resolution(&self) -> Resolution {
        self.camera.resolution
    }

    fn read_frame(&mut self) -> AppResult<Frame> {
        std::thread::sleep(Duration::from_millis(2));
        if self.camera.frame_limit.is_some_and(|limit| self.read >= limit) {
            return Err(AppError::FrameReadFailure("end of stream".to_string()));
        }

        let Resolution { width, height } = self.camera.resolution;
        let mut data = Vec::with_capacity(self.camera.resolution.rgb_frame_len());
        for _ in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[x as u8; 3]);
            }
        }

        let frame = Frame {
            resolution: self.camera.resolution,
            data,
            index: self.read,
        };
        self.read += 1;
        self.camera.served.fetch_add(1, Ordering::SeqCst);
        Ok(frame)
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.camera.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// What a memory writer received
#[derive(Debug, Clone)]
pub struct MemoryClip {
    pub path: PathBuf,
    pub frames: u64,
    pub first_frame: Option<Vec<u8>>,
    /// `finish` was called
    pub finished: bool,
    /// The writer was dropped
    pub closed: bool,
}

/// Writer factory recording clips in memory
#[derive(Clone, Default)]
pub struct MemoryWriters {
    clips: Arc<Mutex<Vec<MemoryClip>>>,
    fail_create: bool,
    fail_after: Option<u64>,
}

impl MemoryWriters {
    pub fn failing_create() -> Self {
        Self {
            fail_create: true,
            ..Self::default()
        }
    }

    /// Writers fail on the frame after `frames` successful writes
    pub fn failing_after(frames: u64) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::default()
        }
    }

    pub fn clip_count(&self) -> usize {
        self.clips.lock().len()
    }

    pub fn clip(&self, index: usize) -> MemoryClip {
        self.clips.lock()[index].clone()
    }

    /// Frames written to clip `index`, zero if it does not exist yet
    pub fn frames(&self, index: usize) -> u64 {
        self.clips.lock().get(index).map_or(0, |c| c.frames)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.clips.lock().iter().map(|c| c.path.clone()).collect()
    }
}

impl WriterFactory for MemoryWriters {
    fn create(
        &self,
        path: &Path,
        _resolution: Resolution,
        _frame_rate: u32,
    ) -> AppResult<Box<dyn FrameWriter>> {
        if self.fail_create {
            return Err(AppError::WriterFailure("read-only output".to_string()));
        }
        let mut clips = self.clips.lock();
        clips.push(MemoryClip {
            path: path.to_path_buf(),
            frames: 0,
            first_frame: None,
            finished: false,
            closed: false,
        });
        Ok(Box::new(MemoryWriter {
            clips: self.clips.clone(),
            index: clips.len() - 1,
            fail_after: self.fail_after,
            count: 0,
        }))
    }
}

struct MemoryWriter {
    clips: Arc<Mutex<Vec<MemoryClip>>>,
    index: usize,
    fail_after: Option<u64>,
    count: u64,
}

impl FrameWriter for MemoryWriter {
    fn write_frame(&mut self, frame: &Frame) -> AppResult<()> {
        if self.fail_after.is_some_and(|n| self.count >= n) {
            return Err(AppError::WriterFailure("disk full".to_string()));
        }
        self.count += 1;
        let mut clips = self.clips.lock();
        let clip = &mut clips[self.index];
        clip.frames = self.count;
        if clip.first_frame.is_none() {
            clip.first_frame = Some(frame.data.clone());
        }
        Ok(())
    }

    fn frame_count(&self) -> u64 {
        self.count
    }

    fn finish(self: Box<Self>) -> AppResult<()> {
        self.clips.lock()[self.index].finished = true;
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.clips.lock()[self.index].closed = true;
    }
}
