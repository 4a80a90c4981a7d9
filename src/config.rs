//! CLI configuration and runtime settings for a partial functions deployment.

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::DeployError;
use crate::invoker::{InvokeOptions, OutputMode};
use crate::selector::{BatchSpec, SelectionMode};

/// Deploy a subset of a Firebase project's functions
#[derive(Parser, Debug)]
#[command(name = "ffdh")]
#[command(version)]
#[command(about = "Firebase Functions Deployment Helper: deploy a subset of a project's functions")]
pub struct Cli {
    /// Firebase project directory
    #[arg(default_value = ".")]
    pub project_dir: PathBuf,

    /// Deploy functions whose name starts with this string
    #[arg(short, long, value_name = "STR")]
    pub start: Option<String>,

    /// Deploy functions whose name ends with this string
    #[arg(short, long, value_name = "STR")]
    pub end: Option<String>,

    /// Split the function list into this many batches (1-25)
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub batches: Option<i64>,

    /// Batch to deploy, starting at 1
    #[arg(
        short = 'i',
        long,
        value_name = "I",
        requires = "batches",
        allow_negative_numbers = true
    )]
    pub batch: Option<i64>,

    /// Output extra information and print the deploy command instead of running it
    #[arg(short, long)]
    pub debug: bool,

    /// Print the deploy command instead of running it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Capture the deploy tool's output instead of streaming it
    #[arg(long)]
    pub capture: bool,

    /// Give up on the deploy command after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Deploy tool to run
    #[arg(long, default_value = "firebase")]
    pub tool: String,
}

/// Runtime configuration parsed from CLI
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase project directory
    pub project_dir: PathBuf,
    /// How functions are selected
    pub mode: SelectionMode,
    /// Enable debug output
    pub debug: bool,
    /// Print the command without running it
    pub dry_run: bool,
    /// Deploy tool name or path
    pub tool: String,
    /// `PATH`-style search path for the tool (None = inherit `PATH`)
    pub search_path: Option<OsString>,
    /// Output handling and timeout for the deploy command
    pub invoke: InvokeOptions,
}

impl Config {
    /// Create Config from CLI arguments.
    ///
    /// Batch options win over search options when both are given.
    pub fn from_cli(cli: Cli) -> Result<Self, DeployError> {
        let project_dir = cli.project_dir.canonicalize().unwrap_or(cli.project_dir);

        let mode = match cli.batches {
            Some(total) => {
                if cli.start.is_some() || cli.end.is_some() {
                    warn!("--batches given; ignoring --start/--end");
                }
                SelectionMode::Batch(BatchSpec::new(total, cli.batch.unwrap_or(1))?)
            }
            None => SelectionMode::search(cli.start, cli.end),
        };

        let output = if cli.capture {
            OutputMode::Capture
        } else {
            OutputMode::Inherit
        };

        Ok(Config {
            project_dir,
            mode,
            debug: cli.debug,
            dry_run: cli.dry_run || cli.debug,
            tool: cli.tool,
            search_path: std::env::var_os("PATH"),
            invoke: InvokeOptions {
                output,
                timeout: cli.timeout.filter(|t| *t > 0).map(Duration::from_secs),
                progress: true,
                interrupted: None,
            },
        })
    }
}
