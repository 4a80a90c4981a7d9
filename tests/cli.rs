#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

/// Firebase project with a fake `firebase` that records its arguments
struct Project {
    dir: TempDir,
}

impl Project {
    fn new(functions: &[&str]) -> Self {
        let dir = tempdir().unwrap();
        let names: Vec<String> = functions.iter().map(|f| format!("\"{f}\"")).collect();
        fs::write(
            dir.path().join("functions.json"),
            format!("[{}]", names.join(", ")),
        )
        .unwrap();
        fs::write(
            dir.path().join("firebase.json"),
            r#"{"functions": {"source": "functions"}}"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("functions")).unwrap();

        let project = Self { dir };
        project.install_tool("exit 0");
        project
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn bin_dir(&self) -> PathBuf {
        self.path().join("bin")
    }

    fn record_file(&self) -> PathBuf {
        self.path().join("firebase-args.txt")
    }

    fn install_tool(&self, tail: &str) {
        fs::create_dir_all(self.bin_dir()).unwrap();
        let tool = self.bin_dir().join("firebase");
        fs::write(
            &tool,
            format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n{tail}\n",
                self.record_file().display()
            ),
        )
        .unwrap();
        let mut perms = fs::metadata(&tool).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&tool, perms).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_ffdh"))
            .current_dir(self.path())
            .env("PATH", self.bin_dir())
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .unwrap()
    }

    fn recorded_args(&self) -> Option<Vec<String>> {
        fs::read_to_string(self.record_file())
            .ok()
            .map(|s| s.lines().map(str::to_string).collect())
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_batch_deploys_contiguous_slice() {
    let project = Project::new(&["a", "b", "c", "d", "e"]);

    let output = project.run(&["--batches", "2", "--batch", "2"]);

    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    assert_eq!(
        project.recorded_args().unwrap(),
        vec!["deploy", "--only", "functions:d,functions:e"]
    );
    assert!(stdout(&output).contains("Deployed 2 of 5 functions"));
}

#[test]
fn test_search_deploys_matches() {
    let project = Project::new(&["fnAX", "fnB", "other"]);

    let output = project.run(&["--start", "fn", "--end", "X"]);

    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    assert_eq!(
        project.recorded_args().unwrap(),
        vec!["deploy", "--only", "functions:fnAX"]
    );
}

#[test]
fn test_batch_wins_over_search() {
    let project = Project::new(&["a", "b", "c"]);

    let output = project.run(&["-s", "zzz", "-b", "3", "-i", "1"]);

    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    assert_eq!(
        project.recorded_args().unwrap(),
        vec!["deploy", "--only", "functions:a"]
    );
}

#[test]
fn test_no_match_exits_one_without_deploying() {
    let project = Project::new(&["a", "b"]);

    let output = project.run(&["--start", "zzz"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("No function match"));
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_empty_batch_exits_one_without_deploying() {
    let project = Project::new(&["a", "b"]);

    let output = project.run(&["--batches", "5", "--batch", "4"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_no_criteria_exits_one() {
    let project = Project::new(&["a"]);

    let output = project.run(&[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_invalid_batch_parameters_exit_one() {
    let project = Project::new(&["a", "b"]);

    for args in [
        vec!["--batches", "0"],
        vec!["--batches", "26"],
        vec!["--batches", "-1"],
        vec!["--batches", "2", "--batch", "3"],
        vec!["--batches", "2", "--batch", "0"],
        vec!["--batches", "2", "--batch", "-2"],
    ] {
        let output = project.run(&args);
        assert_eq!(output.status.code(), Some(1), "{args:?}");
        assert!(stderr(&output).contains("Invalid batch"), "{args:?}");
    }
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_missing_functions_file_stops_before_deploy() {
    let project = Project::new(&["a"]);
    fs::remove_file(project.path().join("functions.json")).unwrap();

    let output = project.run(&["--start", "a"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("functions.json"));
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_missing_functions_directory_stops_before_deploy() {
    let project = Project::new(&["a"]);
    fs::remove_dir(project.path().join("functions")).unwrap();

    let output = project.run(&["--start", "a"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_missing_tool_exits_one() {
    let project = Project::new(&["a"]);
    fs::remove_file(project.bin_dir().join("firebase")).unwrap();

    let output = project.run(&["--start", "a"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unable to locate the firebase command"));
}

#[test]
fn test_tool_failure_passes_exit_code_through() {
    let project = Project::new(&["a"]);
    project.install_tool("echo 'quota exceeded' >&2\nexit 3");

    let output = project.run(&["--start", "a", "--capture"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("quota exceeded"));
}

#[test]
fn test_tool_failure_keeps_captured_stdout() {
    let project = Project::new(&["a"]);
    project.install_tool("echo 'Error: quota exceeded for function a'\nexit 2");

    let output = project.run(&["--start", "a", "--capture"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stdout(&output).contains("Error: quota exceeded for function a"));
    assert!(stderr(&output).contains("firebase deploy failed with exit code 2"));
    assert!(!stderr(&output).contains("exit code 2:"));
}

#[test]
fn test_dry_run_prints_command_without_deploying() {
    let project = Project::new(&["apiA", "apiB", "web"]);

    let output = project.run(&["--start", "api", "--dry-run"]);

    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    assert!(stdout(&output).contains("firebase deploy --only functions:apiA,functions:apiB"));
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_debug_implies_dry_run() {
    let project = Project::new(&["apiA"]);

    let output = project.run(&["--start", "api", "--debug"]);

    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    assert!(stdout(&output).contains("firebase deploy --only functions:apiA"));
    assert!(project.recorded_args().is_none());
}

#[test]
fn test_project_dir_argument() {
    let project = Project::new(&["a", "b"]);
    let elsewhere = tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_ffdh"))
        .current_dir(elsewhere.path())
        .env("PATH", project.bin_dir())
        .env_remove("RUST_LOG")
        .args(["--end", "b"])
        .arg(project.path())
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr:\n{}", stderr(&output));
    assert_eq!(
        project.recorded_args().unwrap(),
        vec!["deploy", "--only", "functions:b"]
    );
}
