//! Deployment orchestration: validate the project, select functions,
//! run the deploy tool.

use tracing::{debug, info};

use crate::config::Config;
use crate::error::DeployError;
use crate::invoker::{invoke, CommandLine, ExecutionOutcome, InvokeOptions};
use crate::selector::{only_argument, select, SelectionMode};
use crate::validator::{validate, ValidatedContext};

/// What a deployment did
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// Selected function names, in manifest order
    pub selected: Vec<String>,
    /// Size of the full function list
    pub total_functions: usize,
    /// The command that was (or would have been) run
    pub command: CommandLine,
    /// `None` for a dry run
    pub outcome: Option<ExecutionOutcome>,
}

impl DeployReport {
    pub fn is_dry_run(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Selected names and the command that deploys them
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub selected: Vec<String>,
    pub total_functions: usize,
    pub command: CommandLine,
}

/// Select functions from a validated project and build the deploy command.
///
/// An empty selection is an error; the tool is never run with an empty `--only`.
pub fn plan(ctx: &ValidatedContext, mode: &SelectionMode) -> Result<DeployPlan, DeployError> {
    let selected = select(&ctx.functions, mode)?;
    info!(
        "Selected {} of {} functions",
        selected.len(),
        ctx.functions.len()
    );
    if selected.is_empty() {
        return Err(DeployError::EmptySelection);
    }
    debug!("Selected functions: {selected:?}");

    let only = only_argument(&selected);
    let command = CommandLine::deploy(&ctx.tool_path, &only, &ctx.project_dir);

    Ok(DeployPlan {
        selected: selected.into_iter().map(str::to_string).collect(),
        total_functions: ctx.functions.len(),
        command,
    })
}

/// Run a plan, or skip running it when `dry_run` is set
pub fn execute(plan: DeployPlan, dry_run: bool, options: &InvokeOptions) -> Result<DeployReport, DeployError> {
    let outcome = if dry_run {
        info!("Dry run, not executing: {}", plan.command);
        None
    } else {
        info!("Executing {}", plan.command);
        Some(invoke(&plan.command, options)?)
    };

    Ok(DeployReport {
        selected: plan.selected,
        total_functions: plan.total_functions,
        command: plan.command,
        outcome,
    })
}

/// Full pipeline for one run: validate, select, invoke
pub fn deploy(config: &Config) -> Result<DeployReport, DeployError> {
    let ctx = validate(
        &config.project_dir,
        &config.tool,
        config.search_path.as_deref(),
    )?;
    let plan = plan(&ctx, &config.mode)?;
    execute(plan, config.dry_run, &config.invoke)
}
