//! Front-end facing interfaces
//!
//! A front end drives the recorder through [`ControlSurface`] and shows the
//! text the recorder pushes into its [`StatusSink`].

use parking_lot::Mutex;
use std::sync::Arc;

/// The complete set of actions a front end can trigger
pub trait ControlSurface {
    /// Start a recording of the current prompt, or stop the running one
    fn on_toggle_record(&mut self);

    /// Move to the next prompt, stopping any recording first
    fn on_advance(&mut self);

    /// Request termination
    fn on_exit(&mut self);
}

/// Receives human readable status text
pub trait StatusSink: Send {
    fn show_status(&self, text: &str);
}

/// Status sink storing the latest text for a front end to render
#[derive(Debug, Clone, Default)]
pub struct SharedStatus(Arc<Mutex<String>>);

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.0.lock().clone()
    }
}

impl StatusSink for SharedStatus {
    fn show_status(&self, text: &str) {
        tracing::debug!("Status: {}", text);
        *self.0.lock() = text.to_string();
    }
}
