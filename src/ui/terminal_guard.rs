//! Terminal state guard for guaranteed cleanup.
//!
//! Restores the terminal when the front end exits, whether normally, via
//! early return, or panic.

use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, LeaveAlternateScreen},
};
use std::io::{self, Write};

/// Guard that restores terminal state when dropped.
///
/// Create it right after entering raw mode and the alternate screen.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn new() -> Self {
        Self { active: true }
    }

    /// Perform manual cleanup; Drop becomes a no-op afterwards
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        restore()
    }
}

impl Default for TerminalGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.active {
            if let Err(e) = restore() {
                tracing::debug!(error = %e, "Terminal cleanup failed in Drop");
            }
        }
    }
}

fn restore() -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen, Show)?;
    stdout.flush()?;
    Ok(())
}

/// Install a panic hook that restores the terminal before the panic
/// message is printed.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        if let Err(e) = restore() {
            tracing::debug!(error = %e, "Failed to restore terminal in panic hook");
        }
        original_hook(panic_info);
    }));
}
