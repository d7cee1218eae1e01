//! Subject and sign list loading
//!
//! A subjects file holds one record per line:
//!
//! ```text
//! Alice: hello, thanks, goodbye
//! Bob: yes, no
//! ```
//!
//! The name is everything before the first colon; the signs are the
//! comma-separated values after it.

use crate::utils::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Default subjects file name
pub const SUBJECTS_FILE: &str = "subjects.csv";

/// One experiment participant and the signs to elicit from them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    name: String,
    signs: Vec<String>,
    /// `None` until the first sign is taken
    position: Option<usize>,
}

impl Subject {
    /// Create a subject that has not started yet
    pub fn new(name: impl Into<String>, signs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            signs,
            position: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signs(&self) -> &[String] {
        &self.signs
    }

    /// Move to the next sign and return it, or `None` once exhausted.
    ///
    /// The position never moves past `signs.len()`, so repeated calls on an
    /// exhausted subject keep returning `None`.
    pub fn advance_sign(&mut self) -> Option<&str> {
        let next = self.position.map_or(0, |i| i + 1).min(self.signs.len());
        self.position = Some(next);
        self.signs.get(next).map(String::as_str)
    }

    /// The sign currently presented, if any
    pub fn current_sign(&self) -> Option<&str> {
        self.position
            .and_then(|i| self.signs.get(i))
            .map(String::as_str)
    }

    pub fn has_started(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.position.is_some_and(|i| i >= self.signs.len())
    }
}

/// Read and parse a subjects file
pub fn load(path: &Path) -> AppResult<Vec<Subject>> {
    let content = fs::read_to_string(path)?;
    let subjects = parse(&content)?;

    tracing::debug!(
        "Loaded {} subjects ({} signs) from {:?}",
        subjects.len(),
        subjects.iter().map(|s| s.signs.len()).sum::<usize>(),
        path
    );

    Ok(subjects)
}

/// Parse subject records from text.
///
/// Fails on the first line without a colon; no partial list is returned.
pub fn parse(content: &str) -> AppResult<Vec<Subject>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut subjects = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let (name, sign_list) = line.split_once(':').ok_or_else(|| AppError::MalformedRecord {
            line: index + 1,
            content: line.to_string(),
        })?;

        let signs = sign_list
            .split(',')
            .map(str::trim)
            .filter(|sign| !sign.is_empty())
            .map(String::from)
            .collect();

        subjects.push(Subject::new(name.trim(), signs));
    }

    Ok(subjects)
}
