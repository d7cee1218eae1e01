//! Video capture sources
//!
//! Device traits used by capture sessions and the nokhwa webcam backend.

pub mod traits;
pub mod webcam;

// Re-export traits
pub use traits::{CameraInfo, CaptureDevice, DeviceSource, Frame, Resolution};
pub use webcam::{get_cameras, WebcamSource};
