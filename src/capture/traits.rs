//! Capture trait definitions
//!
//! Platform-agnostic traits for capture sources.

use crate::utils::AppResult;
use serde::{Deserialize, Serialize};

/// Information about a camera/webcam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Backend-specific description
    pub description: String,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size in bytes of one packed RGB24 frame
    pub fn rgb_frame_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

/// Frames are packed RGB24
pub const BYTES_PER_PIXEL: usize = 3;

/// One decoded video frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub resolution: Resolution,

    /// Packed RGB24 pixel rows, top to bottom
    pub data: Vec<u8>,

    /// Index of this frame among the frames read by its session
    pub index: u64,
}

impl Frame {
    /// Flip the frame left to right in place
    pub fn mirror_horizontally(&mut self) {
        let row_len = self.resolution.width as usize * BYTES_PER_PIXEL;
        if row_len == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(row_len) {
            let width = row.len() / BYTES_PER_PIXEL;
            for x in 0..width / 2 {
                let left = x * BYTES_PER_PIXEL;
                let right = (width - 1 - x) * BYTES_PER_PIXEL;
                for c in 0..BYTES_PER_PIXEL {
                    row.swap(left + c, right + c);
                }
            }
        }
    }
}

/// An acquired capture device.
///
/// The device is released when dropped, so a session that ends on any path
/// gives the camera back.
pub trait CaptureDevice {
    /// Native frame resolution
    fn resolution(&self) -> Resolution;

    /// Block until the next frame arrives.
    ///
    /// An error means the device stopped producing frames.
    fn read_frame(&mut self) -> AppResult<Frame>;
}

/// Opens capture devices on behalf of capture sessions.
///
/// `open` is called on the capture worker thread, so the returned device
/// never crosses threads.
pub trait DeviceSource: Send + Sync {
    fn open(&self) -> AppResult<Box<dyn CaptureDevice>>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}
