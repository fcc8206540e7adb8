//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// taskloom - bounded-concurrency action scheduling for reasoning agents
#[derive(Parser)]
#[command(
    name = "taskloom",
    about = "Inspect, validate and simulate action batches and role workflows",
    version,
    after_help = "Logs are written to: ~/.local/share/taskloom/logs/taskloom.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Validate and resolve a batch of proposed actions (JSON or YAML)
    Resolve {
        /// Batch file: a list of actions, or a map with an `actions` list
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Validate a workflow and print its execution waves
    Check {
        /// Workflow YAML file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run a workflow against simulated roles that sleep for each task's estimate
    Simulate {
        /// Workflow YAML file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Role tasks running at once (defaults to the configured role parallelism)
        #[arg(short, long)]
        parallelism: Option<usize>,

        /// Multiplier applied to every estimated duration
        #[arg(long, default_value = "1.0")]
        time_scale: f64,
    },
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskloom")
        .join("logs")
        .join("taskloom.log")
}
