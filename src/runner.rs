//! Step interpreter: walks a plan against a live browser session, applies
//! the per-action failure policy, accumulates variables, and records one
//! result per run.
//!
//! A run is strictly sequential and blocking; `wait` steps and click delays
//! block the executing thread. The interpreter holds no state across runs,
//! so hosts may execute plans concurrently with independent sessions.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::{ActionError, LaunchError};
use crate::plan::{FailurePolicy, Plan, Step};
use crate::record::RunLog;
use crate::session::{BrowserControl, ChromeSession, SessionOptions};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Done,
    Error,
}

/// The always-produced outcome of one run. Serialized as one JSON line:
/// `{"status":"done"|"error","variables":{...},"error"?:"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: RunStatus,
    pub variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    fn done(variables: BTreeMap<String, String>) -> Self {
        Self {
            status: RunStatus::Done,
            variables,
            error: None,
        }
    }

    fn failed(variables: BTreeMap<String, String>, message: String) -> Self {
        Self {
            status: RunStatus::Error,
            variables,
            error: Some(message),
        }
    }
}

/// Interpreter state. `Running` is entered once the session opens; every
/// step is a self-loop within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// What a successfully executed step hands back to the loop.
enum StepOutcome {
    Done,
    /// Text captured by an extract step, to be stored under the step's name.
    Extracted(String),
}

struct Interpreter<'a, S: BrowserControl> {
    session: S,
    sink: &'a dyn DiagnosticSink,
    state: RunState,
    variables: BTreeMap<String, String>,
    unnamed_extractions: usize,
}

impl<'a, S: BrowserControl> Interpreter<'a, S> {
    fn new(session: S, sink: &'a dyn DiagnosticSink) -> Self {
        Self {
            session,
            sink,
            state: RunState::Idle,
            variables: BTreeMap::new(),
            unnamed_extractions: 0,
        }
    }

    /// Drive the plan to completion or abort. The session is closed on
    /// every path out of here.
    fn run(mut self, plan: &Plan) -> ExecutionResult {
        self.state = RunState::Running;
        self.sink.emit(Diagnostic::RunStarted {
            steps: plan.steps.len(),
        });

        let mut failure: Option<String> = None;
        for (number, step) in plan.steps.iter().enumerate().map(|(i, s)| (i + 1, s)) {
            self.sink.emit(Diagnostic::StepStarted {
                index: number,
                action: step.kind().to_string(),
            });

            match self.execute(number, step) {
                Ok(StepOutcome::Done) => {}
                Ok(StepOutcome::Extracted(text)) => {
                    if let Step::Extract { name, .. } = step {
                        self.assign(name.clone(), text);
                    }
                }
                Err(error) => match step.on_failure() {
                    FailurePolicy::Abort => {
                        let message = format!("step {number} ({}): {error}", step.kind());
                        self.sink.emit(Diagnostic::StepFailed {
                            index: number,
                            message: message.clone(),
                        });
                        failure = Some(message);
                        self.state = RunState::Aborted;
                        break;
                    }
                    FailurePolicy::Tolerate => {
                        // Only extract can fail softly: the miss becomes an
                        // empty-string variable and the run moves on.
                        if let Step::Extract { selector, name } = step {
                            self.sink.emit(Diagnostic::ExtractionMissed {
                                index: number,
                                selector: selector.clone(),
                            });
                            self.assign(name.clone(), String::new());
                        }
                    }
                },
            }
        }

        self.session.close();
        if self.state != RunState::Aborted {
            self.state = RunState::Completed;
        }

        let status = match self.state {
            RunState::Completed => RunStatus::Done,
            _ => RunStatus::Error,
        };
        self.sink.emit(Diagnostic::RunFinished { status });

        match failure {
            None => ExecutionResult::done(self.variables),
            Some(message) => ExecutionResult::failed(self.variables, message),
        }
    }

    fn execute(&mut self, number: usize, step: &Step) -> Result<StepOutcome, ActionError> {
        match step {
            Step::Navigate { url } => self.session.navigate(url)?,
            Step::Click {
                selector,
                times,
                delay,
            } => {
                for repetition in 1..=*times {
                    self.session.click(selector)?;
                    if repetition < *times {
                        sleep_seconds(*delay);
                    }
                }
            }
            Step::Input { selector, value } => self.session.fill(selector, value)?,
            Step::Wait { seconds } => sleep_seconds(*seconds),
            Step::Screenshot { path } => {
                let path = path.clone().unwrap_or_else(default_screenshot_path);
                self.session.screenshot(&path)?;
            }
            Step::Extract { selector, .. } => {
                return Ok(StepOutcome::Extracted(self.session.query_text(selector)?));
            }
            Step::Unknown { action } => {
                self.sink.emit(Diagnostic::UnknownAction {
                    index: number,
                    action: action.clone(),
                });
            }
        }
        Ok(StepOutcome::Done)
    }

    /// Store a captured value. Unnamed extractions get `var_1`, `var_2`, ...
    /// numbered by unnamed extractions alone; a later write to an existing
    /// key overwrites it.
    fn assign(&mut self, name: Option<String>, text: String) {
        let key = name.unwrap_or_else(|| {
            self.unnamed_extractions += 1;
            format!("var_{}", self.unnamed_extractions)
        });
        self.variables.insert(key, text);
    }
}

fn sleep_seconds(seconds: f64) {
    if seconds > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(seconds));
    }
}

fn default_screenshot_path() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("screenshot-{secs}.png")
}

/// Execute `plan` against a freshly launched Chrome, append the outcome to
/// `log`, and return it. Every fault is converted into the result; this
/// function never propagates an error.
pub fn run_plan(
    plan: &Plan,
    options: &SessionOptions,
    log: &RunLog,
    sink: &dyn DiagnosticSink,
) -> ExecutionResult {
    run_plan_with(plan, || ChromeSession::launch(options), log, sink)
}

/// Same as [`run_plan`], generic over how the session is opened. This is the
/// seam tests drive with a scripted session; a launch failure is recorded
/// with empty variables and no step executes.
pub fn run_plan_with<S, F>(
    plan: &Plan,
    open: F,
    log: &RunLog,
    sink: &dyn DiagnosticSink,
) -> ExecutionResult
where
    S: BrowserControl,
    F: FnOnce() -> Result<S, LaunchError>,
{
    let result = match open() {
        Ok(session) => Interpreter::new(session, sink).run(plan),
        Err(error) => {
            let result = ExecutionResult::failed(BTreeMap::new(), error.to_string());
            sink.emit(Diagnostic::RunFinished {
                status: result.status,
            });
            result
        }
    };

    if let Err(error) = log.append(&result) {
        sink.emit(Diagnostic::RecordFailed {
            message: error.to_string(),
        });
    }
    result
}
