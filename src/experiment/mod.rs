//! Experiment data and progression
//!
//! - Subject/sign list loading from the subjects file
//! - ExperimentCursor state machine over the loaded subjects

pub mod cursor;
pub mod stimulus;

pub use cursor::{CursorState, CursorStep, ExperimentCursor, Prompt};
pub use stimulus::Subject;
