//! Run log: one newline-delimited JSON record per run, append-only.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::RecordError;
use crate::runner::ExecutionResult;

/// Durable destination for run results. Prior content is never truncated or
/// rotated; independent runs (and independent processes) may append to the
/// same destination concurrently.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. The serialized line, newline included, goes out in
    /// a single `O_APPEND` write, so concurrent appenders cannot interleave
    /// partial lines.
    pub fn append(&self, result: &ExecutionResult) -> Result<(), RecordError> {
        let mut line = serde_json::to_string(result)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Read every record back, in append order. Used by status consumers and
    /// round-trip tests.
    pub fn read_all(&self) -> Result<Vec<ExecutionResult>, RecordError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let mut results = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            results.push(serde_json::from_str(&line)?);
        }
        Ok(results)
    }
}
