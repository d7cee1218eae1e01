//! Webcam capture using nokhwa
//!
//! Cameras are opened on the capture worker thread and decoded to RGB24
//! frames so they can be mirrored before encoding.

use crate::capture::traits::{CameraInfo, CaptureDevice, DeviceSource, Frame, Resolution};
use crate::utils::{AppError, AppResult};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// Get list of available cameras
pub fn get_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => i.to_string(),
                    CameraIndex::String(s) => s.to_string(),
                };
                CameraInfo {
                    id,
                    name: info.human_name(),
                    description: info.description().to_string(),
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Parse a device id the way `get_cameras` reports it
pub fn camera_index(device_id: &str) -> CameraIndex {
    match device_id.parse::<u32>() {
        Ok(idx) => CameraIndex::Index(idx),
        Err(_) => CameraIndex::String(device_id.to_string()),
    }
}

/// Opens one webcam for each capture session
#[derive(Debug, Clone)]
pub struct WebcamSource {
    index: CameraIndex,
}

impl WebcamSource {
    pub fn new(index: CameraIndex) -> Self {
        Self { index }
    }
}

impl DeviceSource for WebcamSource {
    fn open(&self) -> AppResult<Box<dyn CaptureDevice>> {
        let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(self.index.clone(), format).map_err(|e| {
            AppError::DeviceUnavailable(format!("failed to open camera {}: {}", self.index, e))
        })?;

        camera.open_stream().map_err(|e| {
            AppError::DeviceUnavailable(format!("failed to open camera stream: {}", e))
        })?;

        let native = camera.resolution();
        let resolution = Resolution::new(native.width(), native.height());

        tracing::info!(
            "Webcam opened: {}x{} @ {}fps, format={:?}",
            resolution.width,
            resolution.height,
            camera.frame_rate(),
            camera.frame_format()
        );

        Ok(Box::new(WebcamDevice {
            camera,
            resolution,
            frames_read: 0,
        }))
    }

    fn describe(&self) -> String {
        format!("webcam {}", self.index)
    }
}

/// An open webcam stream
struct WebcamDevice {
    camera: Camera,
    resolution: Resolution,
    frames_read: u64,
}

impl CaptureDevice for WebcamDevice {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn read_frame(&mut self) -> AppResult<Frame> {
        // Blocks until the camera delivers the next frame
        let buffer = self
            .camera
            .frame()
            .map_err(|e| AppError::FrameReadFailure(e.to_string()))?;

        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| AppError::FrameReadFailure(format!("failed to decode frame: {}", e)))?;

        let frame = Frame {
            resolution: Resolution::new(image.width(), image.height()),
            data: image.into_raw(),
            index: self.frames_read,
        };
        self.frames_read += 1;
        Ok(frame)
    }
}

impl Drop for WebcamDevice {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Error stopping camera stream: {:?}", e);
        }
        tracing::debug!("Webcam released after {} frames", self.frames_read);
    }
}
