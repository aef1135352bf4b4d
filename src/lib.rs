//! Planwright - declarative browser automation.
//!
//! Executes a plan (an ordered list of actions such as navigate, click,
//! input, wait, screenshot, extract) against Chrome over the DevTools
//! protocol, and appends one JSON record per run to a durable log.
//!
//! - **plan**: decoding and validation of the `{"steps": [...]}` document
//! - **session**: the browser primitives and their Chrome implementation
//! - **runner**: the step interpreter and the `run_plan` boundary
//! - **record**: the append-only run log
//! - **diag**: per-run diagnostic events
//!
//! ```no_run
//! use planwright::{run_plan, Plan, RunLog, SessionOptions, TracingSink};
//!
//! let plan = Plan::parse(r#"{"steps": [{"action": "navigate", "url": "https://example.com"}]}"#)?;
//! let result = run_plan(&plan, &SessionOptions::default(), &RunLog::new("run.log"), &TracingSink);
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod diag;
pub mod error;
pub mod plan;
pub mod record;
pub mod runner;
pub mod session;

pub use diag::{Diagnostic, DiagnosticSink, FnSink, NullSink, TracingSink};
pub use error::{ActionError, LaunchError, PlanError, RecordError};
pub use plan::{FailurePolicy, Plan, Step};
pub use record::RunLog;
pub use runner::{run_plan, run_plan_with, ExecutionResult, RunStatus};
pub use session::{BrowserControl, ChromeSession, SessionOptions};
