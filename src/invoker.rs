//! Running `firebase deploy --only ...` for the selected functions.
//!
//! The command is spawned with discrete arguments (no shell), waited on to
//! completion and never retried.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::error::DeployError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the deploy tool's output goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Child writes straight to this process's stdout/stderr
    #[default]
    Inherit,
    /// Output is collected and handed back after the child exits
    Capture,
}

/// Options for a single invocation
#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    pub output: OutputMode,
    /// Kill the child after this long; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Show a spinner while waiting (capture mode only)
    pub progress: bool,
    /// Set by the Ctrl+C handler; forwarded to the tool's process group
    pub interrupted: Option<Arc<AtomicBool>>,
}

/// `<tool> deploy --only <functions>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl CommandLine {
    pub fn deploy(program: &Path, only: &str, working_dir: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: vec!["deploy".to_string(), "--only".to_string(), only.to_string()],
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Tool name for messages (file name of the program)
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(&self.working_dir);
        command
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tool_name())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Exit code (0 unless the platform reports none)
    pub code: Option<i32>,
    /// Captured stdout (empty when inherited)
    pub stdout: String,
    /// Captured stderr (empty when inherited)
    pub stderr: String,
    pub duration: Duration,
}

/// Run the command to completion.
///
/// A non-zero exit, a spawn failure and a timeout are all errors; captured
/// output travels with the error.
///
/// With a timeout the tool runs in its own process group, so hooks and other
/// processes it starts are killed along with it.
pub fn invoke(command: &CommandLine, options: &InvokeOptions) -> Result<ExecutionOutcome, DeployError> {
    let start = Instant::now();
    let tool = command.tool_name();

    let mut cmd = command.to_command();
    match options.output {
        OutputMode::Inherit => {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }
        OutputMode::Capture => {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }
    }

    if options.timeout.is_some() {
        own_process_group(&mut cmd);
    }

    debug!("Spawning {:?} {:?}", command.program, command.args);
    let mut child = cmd.spawn().map_err(|source| DeployError::ExternalToolSpawn {
        path: command.program.clone(),
        source,
    })?;

    // Drain pipes on their own threads so a chatty child cannot block on a full pipe
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let spinner = (options.progress && options.output == OutputMode::Capture)
        .then(|| deploy_spinner(&tool));

    let waited = wait_with_timeout(&mut child, options.timeout, options.interrupted.as_deref());
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    // On timeout or wait failure the readers are left detached: a process
    // outside the killed group may still hold the pipes open
    let status = match waited {
        Ok(Some(status)) => status,
        Ok(None) => {
            return Err(DeployError::ExternalToolTimeout {
                tool,
                timeout: options.timeout.unwrap_or_default(),
            })
        }
        Err(source) => {
            return Err(DeployError::ExternalToolSpawn {
                path: command.program.clone(),
                source,
            })
        }
    };

    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    let duration = start.elapsed();
    debug!("{tool} exited with {status} after {:.2}s", duration.as_secs_f64());

    if status.success() {
        Ok(ExecutionOutcome {
            code: status.code(),
            stdout,
            stderr,
            duration,
        })
    } else {
        Err(DeployError::ExternalToolFailure {
            tool,
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

/// Wait for the child; `Ok(None)` means the timeout expired and the child was killed
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    interrupted: Option<&AtomicBool>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        // Same process group as us: Ctrl+C reaches the child directly
        return child.wait().map(Some);
    };

    let deadline = Instant::now() + timeout;
    let mut forwarded = false;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if !forwarded && interrupted.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!("Forwarding interrupt to the deploy command");
            if let Err(e) = signal_group(child, Signal::Interrupt) {
                warn!("Failed to interrupt deploy command: {e}");
            }
            forwarded = true;
        }
        if Instant::now() >= deadline {
            warn!("Deploy command exceeded {}s, killing it", timeout.as_secs());
            if let Err(e) = signal_group(child, Signal::Kill) {
                warn!("Failed to kill deploy command process group: {e}");
                // Already exited between try_wait and kill is fine
                let _ = child.kill();
            }
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Interrupt,
    Kill,
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// Signal every process in the child's group (the child is the group leader)
#[cfg(unix)]
fn signal_group(child: &Child, signal: Signal) -> std::io::Result<()> {
    let pgid = libc::pid_t::try_from(child.id())
        .map_err(|_| std::io::Error::other("process id out of range"))?;
    let signal = match signal {
        Signal::Interrupt => libc::SIGINT,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: killpg has no memory-safety preconditions
    if unsafe { libc::killpg(pgid, signal) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn signal_group(child: &mut Child, signal: Signal) -> std::io::Result<()> {
    match signal {
        Signal::Kill => child.kill(),
        Signal::Interrupt => Ok(()),
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buf) {
            warn!("Failed to read deploy command output: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn deploy_spinner(tool: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Running {tool} deploy..."));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
