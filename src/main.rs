use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ffdh::config::{Cli, Config};
use ffdh::deployer::deploy;
use ffdh::error::DeployError;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            if let Some(DeployError::ExternalToolFailure { stdout, .. }) = e.downcast_ref() {
                if !stdout.is_empty() {
                    print!("{stdout}");
                }
            }
            eprintln!("Exiting: {e:#}");
            match e.downcast_ref::<DeployError>() {
                Some(err) => ExitCode::from(err.exit_code()),
                None => ExitCode::from(2),
            }
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    println!(
        "Firebase Functions Deployment Helper (ffdh) v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::debug!("{cli:?}");

    let mut config = Config::from_cli(cli)?;

    // Ctrl+C reaches the deploy tool too; stay alive until it has exited
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;
    config.invoke.interrupted = Some(interrupted.clone());

    let result = deploy(&config);

    if interrupted.load(Ordering::Relaxed) {
        eprintln!("\nDeployment interrupted");
        return Ok(ExitCode::from(130));
    }

    let report = result?;

    if report.is_dry_run() {
        println!("{}", report.command);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(outcome) = &report.outcome {
        if !outcome.stdout.is_empty() {
            print!("{}", outcome.stdout);
        }
        if !outcome.stderr.is_empty() {
            eprint!("{}", outcome.stderr);
        }

        println!(
            "Deployed {} of {} functions in {:.2}s",
            report.selected.len(),
            report.total_functions,
            outcome.duration.as_secs_f64()
        );
    }

    Ok(ExitCode::SUCCESS)
}
