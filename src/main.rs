use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use planwright::{run_plan, Plan, RunLog, RunStatus, SessionOptions, TracingSink};
use tracing_subscriber::EnvFilter;

/// Run a browser automation plan from a JSON file.
#[derive(Parser)]
#[command(name = "planwright", version)]
struct Cli {
    /// Path to the plan document ({"steps": [...]}).
    plan: PathBuf,

    /// Show the browser window instead of running headless.
    #[arg(long)]
    headed: bool,

    /// Destination for the newline-delimited JSON run log.
    #[arg(long, default_value = "run.log")]
    log: PathBuf,

    /// Optional per-step timeout in seconds for browser commands.
    #[arg(long)]
    step_timeout: Option<u64>,
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.plan)
        .with_context(|| format!("could not read plan file {}", cli.plan.display()))?;
    let plan = Plan::parse(&text).context("plan did not validate")?;

    let options = SessionOptions {
        headless: !cli.headed,
        step_timeout: cli.step_timeout.map(Duration::from_secs),
    };

    let result = run_plan(&plan, &options, &RunLog::new(&cli.log), &TracingSink);
    println!("{}", serde_json::to_string(&result)?);

    if result.status == RunStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}
