//! Experiment progression state machine
//!
//! Tracks which subject and which of their signs is currently presented.

use super::stimulus::Subject;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of the experiment as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorState {
    /// No prompt shown yet
    NotStarted,
    /// A prompt is active
    InProgress,
    /// Every subject is exhausted
    Complete,
}

/// The `(subject, sign)` pair presented to the experimenter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub subject: String,
    pub sign: String,
}

impl Prompt {
    pub fn new(subject: impl Into<String>, sign: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            sign: sign.into(),
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; {}", self.subject, self.sign)
    }
}

/// Result of advancing the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorStep {
    Prompt(Prompt),
    Complete,
}

/// Walks subjects in order, and each subject's signs in order
#[derive(Debug, Clone)]
pub struct ExperimentCursor {
    subjects: Vec<Subject>,
    active_subject: usize,
}

impl ExperimentCursor {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self {
            subjects,
            active_subject: 0,
        }
    }

    pub fn state(&self) -> CursorState {
        match self.subjects.get(self.active_subject) {
            None => CursorState::Complete,
            Some(subject) if self.active_subject == 0 && !subject.has_started() => {
                CursorState::NotStarted
            }
            Some(_) => CursorState::InProgress,
        }
    }

    /// The prompt currently presented, `None` before the first advance and
    /// after completion
    pub fn current_prompt(&self) -> Option<Prompt> {
        let subject = self.subjects.get(self.active_subject)?;
        subject
            .current_sign()
            .map(|sign| Prompt::new(subject.name(), sign))
    }

    /// Move to the next sign, crossing into the next subject when the
    /// active one is exhausted.
    ///
    /// Subjects without signs are skipped in a single call. Once complete,
    /// every further call returns `CursorStep::Complete`.
    pub fn advance(&mut self) -> CursorStep {
        while let Some(subject) = self.subjects.get_mut(self.active_subject) {
            if let Some(sign) = subject.advance_sign().map(str::to_owned) {
                let prompt = Prompt::new(subject.name(), sign);
                tracing::debug!(
                    subject_index = self.active_subject,
                    "Advanced to {}",
                    prompt
                );
                return CursorStep::Prompt(prompt);
            }
            self.active_subject += 1;
        }

        CursorStep::Complete
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Total signs across all subjects
    pub fn total_signs(&self) -> usize {
        self.subjects.iter().map(|s| s.signs().len()).sum()
    }

    /// Index of the active subject; equals `subject_count()` when complete
    pub fn active_subject_index(&self) -> usize {
        self.active_subject
    }
}
