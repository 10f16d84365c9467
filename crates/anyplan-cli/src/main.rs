//! anyplan - run command-line planners and report typed results
//!
//! ## Commands
//!
//! - `solve`: run the planner once and print the final result
//! - `anytime`: run in anytime mode, printing each improved plan as it arrives
//! - `scan`: interpret planner output captured earlier
//! - `config`: print the effective planner dialect
//!
//! Results are printed to stdout as JSON lines; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use anyplan_core::{
    init_tracing, LogFormat, PlanResult, PlanTranslator, Planner, PlannerConfig, PlannerOutcome,
    PlannerRunner, RawPlanTranslator, TimedPlanTranslator,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "anyplan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Typed results from command-line automated planners", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Planner dialect file (TOML); defaults to POPF
    #[arg(short, long, global = true, env = "ANYPLAN_CONFIG")]
    config: Option<PathBuf>,

    /// Override the planner executable
    #[arg(long, global = true, env = "ANYPLAN_PLANNER_BIN")]
    planner_bin: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the planner once and print the final result
    Solve {
        /// PDDL domain file
        domain: PathBuf,

        /// PDDL problem file
        problem: PathBuf,

        /// Wall-clock limit in seconds (0 = unlimited)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// How plan lines are reported
        #[arg(long, value_enum, default_value = "timed")]
        format: PlanFormat,
    },

    /// Run in anytime mode and print every improved plan
    Anytime {
        /// PDDL domain file
        domain: PathBuf,

        /// PDDL problem file
        problem: PathBuf,

        /// Wall-clock limit in seconds (0 = unlimited)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// How plan lines are reported
        #[arg(long, value_enum, default_value = "timed")]
        format: PlanFormat,
    },

    /// Interpret captured planner output
    Scan {
        /// File holding the planner's stdout
        stdout: PathBuf,

        /// File holding the planner's stderr
        #[arg(long)]
        stderr: Option<PathBuf>,

        /// Exit code the planner returned
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        exit_code: i32,

        /// How plan lines are reported
        #[arg(long, value_enum, default_value = "timed")]
        format: PlanFormat,
    },

    /// Print the effective planner dialect as TOML
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlanFormat {
    /// Lines exactly as the planner printed them
    Raw,
    /// Parsed timed actions
    Timed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(LogFormat::from_json_flag(cli.json), level);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bin) = cli.planner_bin {
        config.binary = bin;
    }

    match cli.command {
        Commands::Solve {
            domain,
            problem,
            timeout,
            format,
        } => {
            apply_timeout(&mut config, timeout);
            match format {
                PlanFormat::Raw => cmd_solve(config, RawPlanTranslator, &domain, &problem).await,
                PlanFormat::Timed => {
                    cmd_solve(config, TimedPlanTranslator::permissive(), &domain, &problem).await
                }
            }
        }
        Commands::Anytime {
            domain,
            problem,
            timeout,
            format,
        } => {
            apply_timeout(&mut config, timeout);
            match format {
                PlanFormat::Raw => cmd_anytime(config, RawPlanTranslator, &domain, &problem).await,
                PlanFormat::Timed => {
                    cmd_anytime(config, TimedPlanTranslator::permissive(), &domain, &problem)
                        .await
                }
            }
        }
        Commands::Scan {
            stdout,
            stderr,
            exit_code,
            format,
        } => match format {
            PlanFormat::Raw => {
                cmd_scan(config, RawPlanTranslator, &stdout, stderr.as_deref(), exit_code)
            }
            PlanFormat::Timed => cmd_scan(
                config,
                TimedPlanTranslator::permissive(),
                &stdout,
                stderr.as_deref(),
                exit_code,
            ),
        },
        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    match path {
        Some(path) => PlannerConfig::load(path)
            .with_context(|| format!("Failed to load planner config {}", path.display())),
        None => Ok(PlannerConfig::popf()),
    }
}

fn apply_timeout(config: &mut PlannerConfig, timeout: Option<u64>) {
    if let Some(secs) = timeout {
        config.timeout_secs = secs;
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Flip the cancel flag on Ctrl-C so the run ends with a final result.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping planner");
            tx.send(true).ok();
        }
    });
    rx
}

async fn cmd_solve<T>(
    config: PlannerConfig,
    translator: T,
    domain: &Path,
    problem: &Path,
) -> Result<()>
where
    T: PlanTranslator + 'static,
    T::Plan: Serialize,
{
    let runner = PlannerRunner::new(config, translator).with_cancel(cancel_on_ctrl_c());
    let outcome = runner
        .solve(domain, problem)
        .await
        .context("Planner run failed")?;

    report(&outcome);
    print_json(&outcome)
}

async fn cmd_anytime<T>(
    config: PlannerConfig,
    translator: T,
    domain: &Path,
    problem: &Path,
) -> Result<()>
where
    T: PlanTranslator + 'static,
    T::Plan: Serialize,
{
    let runner = PlannerRunner::new(config, translator).with_cancel(cancel_on_ctrl_c());
    let (tx, mut rx) = mpsc::unbounded_channel::<PlanResult<T::Plan>>();

    let printer = tokio::spawn(async move {
        while let Some(result) = rx.recv().await {
            if !result.is_final() {
                print_json(&result)?;
            }
        }
        anyhow::Ok(())
    });

    let outcome = runner
        .solve_anytime(domain, problem, tx)
        .await
        .context("Planner run failed")?;
    printer.await.context("Result printer panicked")??;

    report(&outcome);
    print_json(&outcome)
}

fn cmd_scan<T>(
    config: PlannerConfig,
    translator: T,
    stdout: &Path,
    stderr: Option<&Path>,
    exit_code: i32,
) -> Result<()>
where
    T: PlanTranslator + 'static,
    T::Plan: Serialize,
{
    let read = |path: &Path| -> Result<Vec<String>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(raw.lines().map(str::to_string).collect())
    };
    let stdout_lines = read(stdout)?;
    let stderr_lines = match stderr {
        Some(path) => read(path)?,
        None => Vec::new(),
    };

    let runner = PlannerRunner::new(config, translator);
    let (status, result) = runner
        .interpret(stdout_lines, stderr_lines, exit_code)
        .context("Failed to interpret planner output")?;
    info!(%status, exit_code, "scanned planner output");

    print_json(&result)
}

fn cmd_config(config: &PlannerConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn report<P>(outcome: &PlannerOutcome<P>) {
    info!(
        run_id = %outcome.run_id,
        engine = %outcome.engine_name,
        status = %outcome.status,
        exit_code = outcome.exit_code,
        termination = ?outcome.termination,
        computation_time = ?outcome.result.computation_time,
        duration_ms = outcome.duration_ms,
        "run complete"
    );
    for failure in &outcome.translation_failures {
        warn!(error = %failure, "intermediate plan could not be translated");
    }
}
