mod planner;

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use dotenvy::dotenv;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use planwright::{run_plan, Diagnostic, ExecutionResult, FnSink, Plan, RunLog, SessionOptions};

/// Web host for the plan engine: submit runs, poll status, stream progress.
#[derive(Parser)]
#[command(name = "planwright-server", version)]
struct Cli {
    /// Port to listen on (localhost only).
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Destination for the newline-delimited JSON run log.
    #[arg(long, default_value = "run.log")]
    log: PathBuf,

    /// Optional per-step timeout in seconds for browser commands.
    #[arg(long)]
    step_timeout: Option<u64>,
}

/// Mirror of the `/status` payload: whether a run is in flight, and the
/// last finished result.
#[derive(Debug, Default, Serialize)]
struct RunTracker {
    running: bool,
    last: Option<ExecutionResult>,
}

struct AppState {
    tracker: Mutex<RunTracker>,
    events: broadcast::Sender<Diagnostic>,
    log: RunLog,
    step_timeout: Option<Duration>,
    http: reqwest::Client,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let (events, _) = broadcast::channel::<Diagnostic>(64);

    let state = Arc::new(AppState {
        tracker: Mutex::new(RunTracker::default()),
        events,
        log: RunLog::new(&cli.log),
        step_timeout: cli.step_timeout.map(Duration::from_secs),
        http: reqwest::Client::new(),
    });

    let app = Router::new()
        .route("/run", post(run_handler))
        .route("/status", get(status_handler))
        .route("/generate", post(generate_handler))
        .route("/events", get(sse_handler))
        .with_state(state);

    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!(%addr, "planwright server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Accept a plan document, validate it, and start the run on a blocking
/// task. The response only acknowledges the submission; progress streams
/// over `/events` and the outcome lands in `/status` and the run log.
async fn run_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let headless = body
        .get("headless")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    let plan = match Plan::from_value(body) {
        Ok(plan) => plan,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"ok": false, "error": error.to_string()})),
            );
        }
    };

    let options = SessionOptions {
        headless,
        step_timeout: state.step_timeout,
    };

    state.tracker.lock().unwrap().running = true;
    let task_state = state.clone();
    tokio::spawn(async move {
        let worker = task_state.clone();
        let result = tokio::task::spawn_blocking(move || {
            let sink = FnSink(|diagnostic: Diagnostic| {
                let _ = worker.events.send(diagnostic);
            });
            run_plan(&plan, &options, &worker.log, &sink)
        })
        .await;

        let mut tracker = task_state.tracker.lock().unwrap();
        tracker.running = false;
        match result {
            Ok(result) => tracker.last = Some(result),
            Err(error) => tracing::error!(%error, "run task panicked"),
        }
    });

    (StatusCode::OK, Json(json!({"ok": true})))
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tracker = state.tracker.lock().unwrap();
    Json(serde_json::to_value(&*tracker).unwrap_or(Value::Null))
}

/// Turn a natural-language prompt into a plan document via the LLM backend.
async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let prompt = body.get("prompt").and_then(Value::as_str).unwrap_or("");
    match planner::generate_plan(&state.http, prompt).await {
        Ok(plan) => (StatusCode::OK, Json(plan)),
        Err(error) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": format!("{error:#}")})),
        ),
    }
}

async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(diagnostic) => Some(Ok::<_, Infallible>(to_sse_event(&diagnostic))),
        Err(_) => None,
    });
    Sse::new(stream)
}

fn to_sse_event(diagnostic: &Diagnostic) -> Event {
    match diagnostic {
        Diagnostic::RunStarted { steps } => Event::default()
            .event("run_started")
            .data(json!({"steps": steps}).to_string()),
        Diagnostic::StepStarted { index, action } => Event::default()
            .event("step")
            .data(json!({"index": index, "action": action}).to_string()),
        Diagnostic::StepFailed { index, message } => Event::default()
            .event("step_failed")
            .data(json!({"index": index, "message": message}).to_string()),
        Diagnostic::ExtractionMissed { index, selector } => Event::default()
            .event("extraction_missed")
            .data(json!({"index": index, "selector": selector}).to_string()),
        Diagnostic::UnknownAction { index, action } => Event::default()
            .event("unknown_action")
            .data(json!({"index": index, "action": action}).to_string()),
        Diagnostic::RecordFailed { message } => Event::default()
            .event("record_failed")
            .data(json!({"message": message}).to_string()),
        Diagnostic::RunFinished { status } => Event::default()
            .event("run_finished")
            .data(json!({"status": status}).to_string()),
    }
}
