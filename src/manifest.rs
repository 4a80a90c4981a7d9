//! Project files read before a deployment: the functions list and the
//! Firebase project configuration.
//!
//! Both are JSON documents in the project directory:
//! - `functions.json`: an ordered array of function names
//! - `firebase.json`: the Firebase CLI configuration, of which only
//!   `functions.source` is used

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DeployError;

/// File listing every deployable function name
pub const FUNCTIONS_FILE: &str = "functions.json";

/// Firebase CLI project configuration
pub const FIREBASE_CONFIG_FILE: &str = "firebase.json";

/// Functions directory used when `firebase.json` does not name one
pub const DEFAULT_FUNCTIONS_SOURCE: &str = "functions";

/// Ordered list of function names, exactly as written in `functions.json`.
/// Duplicates are kept; order defines batch boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FunctionList(Vec<String>);

impl FunctionList {
    /// Parse a JSON array of strings
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FunctionList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The `functions` entry of `firebase.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FunctionsSection {
    #[serde(default)]
    pub source: Option<String>,
}

/// `functions` is a single object for one codebase, an array for several
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FunctionsConfig {
    Codebases(Vec<FunctionsSection>),
    Single(FunctionsSection),
}

/// Typed view of `firebase.json`. Unknown keys (hosting, firestore, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub functions: Option<FunctionsConfig>,
}

impl ProjectConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Relative path of the functions source directory.
    ///
    /// First non-empty `source` wins; falls back to [`DEFAULT_FUNCTIONS_SOURCE`].
    pub fn functions_source(&self) -> &str {
        let sections: &[FunctionsSection] = match &self.functions {
            Some(FunctionsConfig::Single(section)) => std::slice::from_ref(section),
            Some(FunctionsConfig::Codebases(sections)) => sections,
            None => &[],
        };

        sections
            .iter()
            .filter_map(|s| s.source.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(DEFAULT_FUNCTIONS_SOURCE)
    }
}

/// Path of `functions.json` inside the project directory
pub fn functions_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(FUNCTIONS_FILE)
}

/// Path of `firebase.json` inside the project directory
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(FIREBASE_CONFIG_FILE)
}

/// Read and parse `functions.json`
pub fn load_function_list(path: &Path) -> Result<FunctionList, DeployError> {
    let content = read_existing(
        path,
        || DeployError::MissingFunctionsFile {
            path: path.to_path_buf(),
        },
        |source| DeployError::UnreadableFunctionsFile {
            path: path.to_path_buf(),
            source,
        },
    )?;
    FunctionList::from_json(&content).map_err(|source| DeployError::MalformedFunctionsFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse `firebase.json`
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, DeployError> {
    let content = read_existing(
        path,
        || DeployError::MissingProjectConfig {
            path: path.to_path_buf(),
        },
        |source| DeployError::UnreadableProjectConfig {
            path: path.to_path_buf(),
            source,
        },
    )?;
    ProjectConfig::from_json(&content).map_err(|source| DeployError::MalformedProjectConfig {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the functions directory named by the project config
pub fn resolve_functions_dir(project_dir: &Path, config: &ProjectConfig) -> PathBuf {
    project_dir.join(config.functions_source())
}

fn read_existing(
    path: &Path,
    missing: impl FnOnce() -> DeployError,
    unreadable: impl FnOnce(std::io::Error) -> DeployError,
) -> Result<String, DeployError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(missing()),
        Err(e) => Err(unreadable(e)),
    }
}
