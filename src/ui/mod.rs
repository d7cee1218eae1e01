//! Terminal front end
//!
//! Key bindings: space toggles recording, enter advances, escape exits.

pub mod terminal;
pub mod terminal_guard;

pub use terminal::{action_for_key, dispatch, run, ControlAction};
pub use terminal_guard::{install_panic_hook, TerminalGuard};
