//! taskloom - action scheduling and workflow inspection
//!
//! CLI entry point for resolving action batches and checking or simulating
//! role workflows.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde::Deserialize;
use tracing::info;

use taskloom::cli::{Cli, Command, OutputFormat};
use taskloom::config::Config;
use taskloom::domain::{Action, ProposedAction, RolePayload, RoleResponse};
use taskloom::events::create_event_bus;
use taskloom::resolver;
use taskloom::scheduler::{BoundedScheduler, SchedulerConfig};
use taskloom::tools::ToolCatalog;
use taskloom::workflow::{Role, RoleRegistry, WorkflowExecutor, WorkflowGraph, WorkflowReport};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskloom")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file, keeping stdout for command output
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("taskloom.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        "taskloom loaded config: tool-parallelism={}, role-parallelism={}",
        config.concurrency.tool_parallelism, config.concurrency.role_parallelism
    );

    match cli.command {
        Command::Resolve { file } => cmd_resolve(&file, cli.format),
        Command::Check { file } => cmd_check(&file, cli.format),
        Command::Simulate {
            file,
            parallelism,
            time_scale,
        } => cmd_simulate(&config, &file, parallelism, time_scale, cli.format).await,
    }
}

/// Batch file layout: a bare list or `actions: [...]`
#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    List(Vec<ProposedAction>),
    Wrapped { actions: Vec<ProposedAction> },
}

impl BatchFile {
    fn into_actions(self) -> Vec<ProposedAction> {
        match self {
            Self::List(actions) | Self::Wrapped { actions } => actions,
        }
    }
}

/// Validate and resolve a batch, printing the annotated actions
fn cmd_resolve(file: &Path, format: OutputFormat) -> Result<()> {
    let content = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    // YAML is a superset of JSON, so one parser covers both
    let batch: BatchFile = serde_yaml::from_str(&content).context("Failed to parse action batch")?;

    let catalog = ToolCatalog::standard();
    let mut calls = Vec::new();
    for (index, proposed) in batch.into_actions().into_iter().enumerate() {
        let call = catalog
            .validate(proposed, &format!("1-{}", index + 1))
            .context(format!("Action {} rejected", index + 1))?;
        calls.push(call);
    }
    let actions = resolver::resolve(calls).context("Failed to resolve batch")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&actions)?),
        OutputFormat::Text => print_actions(&actions),
    }
    Ok(())
}

fn print_actions(actions: &[Action]) {
    println!("{} actions", actions.len());
    for action in actions {
        let mode = if action.parallel_safe {
            "parallel".green()
        } else {
            "exclusive".yellow()
        };
        let deps = if action.deps.is_empty() {
            "-".to_string()
        } else {
            action.deps.join(", ")
        };
        println!(
            "  {} {} [{}] priority={} deps={}",
            action.id.bold(),
            action.tool,
            mode,
            action.priority,
            deps
        );
        println!("      {}", action.fingerprint.as_str().dimmed());
    }
}

fn load_workflow(file: &Path) -> Result<WorkflowGraph> {
    let content = fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?;
    WorkflowGraph::from_yaml(&content).context("Failed to parse workflow")
}

/// Validate a workflow and print its execution waves
fn cmd_check(file: &Path, format: OutputFormat) -> Result<()> {
    let graph = load_workflow(file)?;
    let waves = graph.execution_waves()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "name": graph.name,
                "tasks": graph.len(),
                "waves": waves,
                "estimated_serial_ms": graph.estimated_serial().as_millis() as u64,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            let name = graph.name.as_deref().unwrap_or("workflow");
            println!("{} {}: {} tasks in {} waves", "valid".green(), name, graph.len(), waves.len());
            for (index, wave) in waves.iter().enumerate() {
                println!("  wave {}: {}", index + 1, wave.join(", "));
            }
        }
    }
    Ok(())
}

/// Role that sleeps for each task's estimate, scaled
///
/// A task whose description contains `[fail]` reports failure.
struct SimulatedRole {
    estimates: HashMap<String, u64>,
    time_scale: f64,
}

#[async_trait]
impl Role for SimulatedRole {
    async fn execute_task(&self, description: &str) -> RoleResponse {
        let ms = self.estimates.get(description).copied().unwrap_or_default();
        tokio::time::sleep(Duration::from_secs_f64(ms as f64 * self.time_scale / 1000.0)).await;

        if description.contains("[fail]") {
            return RoleResponse::failed(format!("simulated failure after {ms}ms"));
        }
        RoleResponse::ok(RolePayload {
            content: format!("simulated {ms}ms"),
            actions: Vec::new(),
            suggestions: Vec::new(),
        })
    }
}

/// Run a workflow against simulated roles
async fn cmd_simulate(
    config: &Config,
    file: &Path,
    parallelism: Option<usize>,
    time_scale: f64,
    format: OutputFormat,
) -> Result<()> {
    if !time_scale.is_finite() || time_scale < 0.0 {
        return Err(eyre::eyre!("--time-scale must be a non-negative number"));
    }

    let graph = load_workflow(file)?;
    let estimates: HashMap<String, u64> = graph
        .tasks
        .iter()
        .map(|t| (t.description.clone(), t.estimated_ms))
        .collect();
    let role: Arc<dyn Role> = Arc::new(SimulatedRole { estimates, time_scale });

    let mut roles = RoleRegistry::new();
    for task in &graph.tasks {
        if !roles.has_role(&task.role) {
            roles.register(task.role.clone(), role.clone());
        }
    }

    let parallelism = parallelism.unwrap_or(config.concurrency.role_parallelism);
    let scheduler = BoundedScheduler::new(
        SchedulerConfig::new(parallelism).with_timeout_ms(config.timeouts.task_timeout_ms),
    );
    // The bus traces every node transition to the log file
    let executor = WorkflowExecutor::new(Arc::new(roles), scheduler).with_events(create_event_bus());
    let report = executor.execute(&graph).await.context("Workflow rejected")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report, parallelism),
    }
    Ok(())
}

fn print_report(report: &WorkflowReport, parallelism: usize) {
    let synthesis = &report.synthesis;
    let status = if synthesis.success {
        "succeeded".green()
    } else {
        "failed".red()
    };
    println!("Workflow {} {}", report.workflow_id.dimmed(), status);
    for result in &report.results {
        let mark = if result.success { "ok".green() } else { "failed".red() };
        println!("  {:<6} {} ({}) {}ms", mark, result.task_id, result.role, result.duration_ms);
    }

    let stats = &synthesis.stats;
    println!();
    println!("Parallelism: {}", parallelism);
    println!(
        "Tasks: {} total, {} succeeded, {} failed ({:.0}%)",
        stats.total,
        stats.succeeded,
        stats.failed,
        stats.success_rate * 100.0
    );
    println!(
        "Time: {}ms wall, {}ms summed, {}ms average",
        stats.wall_time_ms, stats.total_duration_ms, stats.average_duration_ms
    );
    println!("Parallelization gain: {:.0}%", stats.parallelization_gain * 100.0);
    println!();
    println!("{}", synthesis.content);
}
