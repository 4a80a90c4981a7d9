use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification of [`DeployError`], stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingFunctionsFile,
    MalformedFunctionsFile,
    MissingProjectConfig,
    MalformedProjectConfig,
    MissingFunctionsDirectory,
    MissingExternalTool,
    NoSelectionCriteria,
    InvalidBatchCount,
    InvalidBatchIndex,
    EmptySelection,
    ExternalToolFailure,
}

/// Deployment error types
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Unable to locate the {path} file")]
    MissingFunctionsFile { path: PathBuf },

    #[error("Invalid functions list: {path}")]
    MalformedFunctionsFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unable to read {path}")]
    UnreadableFunctionsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to locate the {path} file")]
    MissingProjectConfig { path: PathBuf },

    #[error("Invalid Firebase configuration: {path}")]
    MalformedProjectConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unable to read {path}")]
    UnreadableProjectConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to locate the {path} folder")]
    MissingFunctionsDirectory { path: PathBuf },

    #[error("Unable to locate the {tool} command")]
    MissingExternalTool { tool: String },

    #[error("No search criteria: use --start and/or --end, or --batches")]
    NoSelectionCriteria,

    #[error("Invalid batch count: {count} (must be 1-{max})")]
    InvalidBatchCount { count: i64, max: usize },

    #[error("Invalid batch index: {index} (must be 1-{total})")]
    InvalidBatchIndex { index: i64, total: usize },

    #[error("No function match for specified options")]
    EmptySelection,

    #[error(
        "{tool} deploy failed with exit code {}{}",
        display_code(.code),
        display_stderr(.stderr)
    )]
    ExternalToolFailure {
        tool: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to run {path}")]
    ExternalToolSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} deploy did not finish within {}s", display_secs(.timeout))]
    ExternalToolTimeout { tool: String, timeout: Duration },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

fn display_stderr(stderr: &str) -> String {
    match stderr.trim() {
        "" => String::new(),
        trimmed => format!(": {trimmed}"),
    }
}

fn display_secs(timeout: &Duration) -> u64 {
    timeout.as_secs()
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::MissingFunctionsFile { .. } => ErrorKind::MissingFunctionsFile,
            DeployError::MalformedFunctionsFile { .. }
            | DeployError::UnreadableFunctionsFile { .. } => ErrorKind::MalformedFunctionsFile,
            DeployError::MissingProjectConfig { .. } => ErrorKind::MissingProjectConfig,
            DeployError::MalformedProjectConfig { .. }
            | DeployError::UnreadableProjectConfig { .. } => ErrorKind::MalformedProjectConfig,
            DeployError::MissingFunctionsDirectory { .. } => ErrorKind::MissingFunctionsDirectory,
            DeployError::MissingExternalTool { .. } => ErrorKind::MissingExternalTool,
            DeployError::NoSelectionCriteria => ErrorKind::NoSelectionCriteria,
            DeployError::InvalidBatchCount { .. } => ErrorKind::InvalidBatchCount,
            DeployError::InvalidBatchIndex { .. } => ErrorKind::InvalidBatchIndex,
            DeployError::EmptySelection => ErrorKind::EmptySelection,
            DeployError::ExternalToolFailure { .. }
            | DeployError::ExternalToolSpawn { .. }
            | DeployError::ExternalToolTimeout { .. } => ErrorKind::ExternalToolFailure,
        }
    }

    /// Process exit code for this error.
    ///
    /// A failing deploy tool passes its own exit code through; every
    /// precondition failure exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            DeployError::ExternalToolFailure {
                code: Some(code), ..
            } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_external_failures() {
        let spawn = DeployError::ExternalToolSpawn {
            path: PathBuf::from("/usr/bin/firebase"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let timeout = DeployError::ExternalToolTimeout {
            tool: "firebase".to_string(),
            timeout: Duration::from_secs(5),
        };

        assert_eq!(spawn.kind(), ErrorKind::ExternalToolFailure);
        assert_eq!(timeout.kind(), ErrorKind::ExternalToolFailure);
        assert_eq!(DeployError::EmptySelection.kind(), ErrorKind::EmptySelection);
    }

    #[test]
    fn test_exit_code_passes_tool_code_through() {
        let err = DeployError::ExternalToolFailure {
            tool: "firebase".to_string(),
            code: Some(3),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_falls_back_to_one() {
        let unknown = DeployError::ExternalToolFailure {
            tool: "firebase".to_string(),
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        let out_of_range = DeployError::ExternalToolFailure {
            tool: "firebase".to_string(),
            code: Some(-9),
            stdout: String::new(),
            stderr: String::new(),
        };

        assert_eq!(unknown.exit_code(), 1);
        assert_eq!(out_of_range.exit_code(), 1);
        assert_eq!(DeployError::NoSelectionCriteria.exit_code(), 1);
        assert_eq!(
            DeployError::InvalidBatchCount { count: 0, max: 25 }.exit_code(),
            1
        );
    }

    #[test]
    fn test_display_messages() {
        let err = DeployError::InvalidBatchIndex { index: 4, total: 3 };
        assert_eq!(err.to_string(), "Invalid batch index: 4 (must be 1-3)");

        let err = DeployError::ExternalToolFailure {
            tool: "firebase".to_string(),
            code: None,
            stdout: String::new(),
            stderr: "quota\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "firebase deploy failed with exit code unknown: quota"
        );
    }

    #[test]
    fn test_display_failure_without_stderr() {
        let err = DeployError::ExternalToolFailure {
            tool: "firebase".to_string(),
            code: Some(3),
            stdout: "Error: quota exceeded".to_string(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "firebase deploy failed with exit code 3");
    }

    #[test]
    fn test_unreadable_files_classified_as_malformed() {
        let io = || std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let functions = DeployError::UnreadableFunctionsFile {
            path: PathBuf::from("functions.json"),
            source: io(),
        };
        let config = DeployError::UnreadableProjectConfig {
            path: PathBuf::from("firebase.json"),
            source: io(),
        };

        assert_eq!(functions.kind(), ErrorKind::MalformedFunctionsFile);
        assert_eq!(config.kind(), ErrorKind::MalformedProjectConfig);
        assert_eq!(functions.exit_code(), 1);
    }
}
