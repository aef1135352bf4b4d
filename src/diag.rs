//! Per-run diagnostics.
//!
//! The interpreter reports progress through an explicit [`DiagnosticSink`]
//! handed to it per run, instead of a process-wide logger. Hosts decide what
//! to do with the events: the CLI forwards them to `tracing`, the web host
//! additionally fans them out to SSE subscribers, and tests collect them.

use crate::runner::RunStatus;

/// One observable event in the life of a run.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    RunStarted { steps: usize },
    StepStarted { index: usize, action: String },
    /// A strict-fail step failed; the run is about to abort.
    StepFailed { index: usize, message: String },
    /// An extraction found nothing; an empty string was stored instead.
    ExtractionMissed { index: usize, selector: String },
    /// A step carried an action tag outside the known set and was skipped.
    UnknownAction { index: usize, action: String },
    /// The finished run could not be appended to the run log.
    RecordFailed { message: String },
    RunFinished { status: RunStatus },
}

/// Receiver for run diagnostics. Implementations must be cheap; the
/// interpreter calls this inline between steps.
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Adapter turning any closure over a [`Diagnostic`] into a sink.
pub struct FnSink<F>(pub F);

impl<F: Fn(Diagnostic)> DiagnosticSink for FnSink<F> {
    fn emit(&self, diagnostic: Diagnostic) {
        (self.0)(diagnostic)
    }
}

/// Default sink: forwards everything to `tracing`.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::RunStarted { steps } => tracing::info!(steps, "starting plan"),
            Diagnostic::StepStarted { index, action } => {
                tracing::info!(index, %action, "step");
            }
            Diagnostic::StepFailed { index, message } => {
                tracing::error!(index, %message, "step failed");
            }
            Diagnostic::ExtractionMissed { index, selector } => {
                tracing::warn!(index, %selector, "extraction found nothing, storing empty string");
            }
            Diagnostic::UnknownAction { index, action } => {
                tracing::warn!(index, %action, "unknown action, skipping");
            }
            Diagnostic::RecordFailed { message } => {
                tracing::error!(%message, "could not record run result");
            }
            Diagnostic::RunFinished { status } => tracing::info!(?status, "plan finished"),
        }
    }
}

/// Sink that drops everything. Handy for hosts that only want the result.
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}
