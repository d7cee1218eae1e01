//! Recording system module
//!
//! - CaptureSession worker streaming one device into one clip
//! - RecordingController mediating front-end actions, cursor and sessions
//! - Front-end interfaces (control surface, status sink)

pub mod controller;
pub mod session;
pub mod state;
pub mod surface;

#[cfg(test)]
pub(crate) mod fakes;

pub use controller::{CaptureSettings, RecordingController, RecordingEvent};
pub use session::{CaptureSession, SessionRequest};
pub use state::{RecordingState, SessionOutcome, SessionReport};
pub use surface::{ControlSurface, SharedStatus, StatusSink};
