//! Error taxonomy for the plan engine.
//!
//! `PlanError` stops a run before it starts; `LaunchError` is fatal before
//! the first step; `ActionError` aborts the remaining steps of a strict-fail
//! action. Extraction misses are not errors at all and never appear here.

use thiserror::Error;

/// The raw plan document did not decode into a valid [`Plan`](crate::Plan).
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid plan document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("step {index} is not an object")]
    StepNotObject { index: usize },

    #[error("step {index} has no `action` key")]
    MissingAction { index: usize },

    #[error("step {index} ({action}): missing required field `{field}`")]
    MissingField {
        index: usize,
        action: &'static str,
        field: &'static str,
    },

    #[error("step {index} ({action}): field `{field}` {problem}")]
    InvalidField {
        index: usize,
        action: &'static str,
        field: &'static str,
        problem: &'static str,
    },
}

/// The browser session could not be opened. Nothing has run yet.
#[derive(Debug, Error)]
#[error("could not launch browser: {0}")]
pub struct LaunchError(pub String);

/// A browser primitive failed while a run was in progress.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no element matches selector `{0}`")]
    SelectorNotFound(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser command failed: {0}")]
    Protocol(String),

    #[error("could not write screenshot to {path}: {reason}")]
    Capture { path: String, reason: String },
}

/// The run log could not be written or read back.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("could not serialize run record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("run log I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
