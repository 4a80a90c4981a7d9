//! Preflight checks run before anything is deployed.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. `functions.json` exists and parses
//! 2. `firebase.json` exists and parses
//! 3. the functions source directory exists
//! 4. the deploy tool is on the search path

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::DeployError;
use crate::manifest::{
    functions_file_path, load_function_list, load_project_config, project_config_path,
    resolve_functions_dir, FunctionList,
};

/// Everything later stages need, produced by a successful [`validate`]
#[derive(Debug, Clone)]
pub struct ValidatedContext {
    /// Project directory the files were read from
    pub project_dir: PathBuf,
    /// Function names from `functions.json`
    pub functions: FunctionList,
    /// Resolved functions source directory
    pub functions_dir: PathBuf,
    /// Absolute path of the deploy tool
    pub tool_path: PathBuf,
}

/// Validate a Firebase project directory and locate the deploy tool.
///
/// `search_path` uses the `PATH` syntax of the host; `None` reads `PATH`
/// from the environment.
pub fn validate(
    project_dir: &Path,
    tool: &str,
    search_path: Option<&OsStr>,
) -> Result<ValidatedContext, DeployError> {
    info!("Validating Firebase project in {}", project_dir.display());

    let functions_file = functions_file_path(project_dir);
    debug!("Checking {}", functions_file.display());
    let functions = load_function_list(&functions_file)?;
    info!(
        "Located {} ({} functions)",
        functions_file.display(),
        functions.len()
    );

    let config_file = project_config_path(project_dir);
    debug!("Checking {}", config_file.display());
    let project_config = load_project_config(&config_file)?;
    info!("Located {}", config_file.display());

    let functions_dir = resolve_functions_dir(project_dir, &project_config);
    debug!("Functions source folder: {}", functions_dir.display());
    if !functions_dir.is_dir() {
        return Err(DeployError::MissingFunctionsDirectory {
            path: functions_dir,
        });
    }
    info!("Located {}", functions_dir.display());

    debug!("Looking for the {tool} command");
    let env_path;
    let search_path = match search_path {
        Some(path) => Some(path),
        None => {
            env_path = std::env::var_os("PATH");
            env_path.as_deref()
        }
    };
    let tool_path = find_executable(tool, search_path).ok_or_else(|| {
        DeployError::MissingExternalTool {
            tool: tool.to_string(),
        }
    })?;
    info!("{tool} command found at {}", tool_path.display());

    Ok(ValidatedContext {
        project_dir: project_dir.to_path_buf(),
        functions,
        functions_dir,
        tool_path,
    })
}

/// Find `name` the way a shell would.
///
/// Names containing a path separator are checked as given; bare names are
/// looked up in each directory of `search_path`.
pub fn find_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let as_path = Path::new(name);
    if as_path.components().count() > 1 {
        return is_executable(as_path).then(|| as_path.to_path_buf());
    }

    let search_path = search_path?;
    std::env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let extensions = std::env::var_os("PATHEXT").unwrap_or_else(|| OsString::from(".COM;.EXE;.BAT;.CMD"));
    let mut paths = vec![dir.join(name)];
    for ext in extensions.to_string_lossy().split(';').filter(|e| !e.is_empty()) {
        paths.push(dir.join(format!("{name}{}", ext.to_ascii_lowercase())));
        paths.push(dir.join(format!("{name}{ext}")));
    }
    paths
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Join directories into a `PATH`-style value
pub fn join_search_path<I, P>(dirs: I) -> Option<OsString>
where
    I: IntoIterator<Item = P>,
    P: AsRef<OsStr>,
{
    std::env::join_paths(dirs).ok()
}
