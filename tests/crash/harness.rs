//! Crash test harness for subprocess management
//!
//! Runs the `ondiskxy` binary with `ODXY_CRASH_POINT` set and captures how it
//! exited.

use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use ondiskxy::crash_point::CRASH_POINT_ENV;
use ondiskxy::observability::LOG_LEVEL_ENV;

/// Result of a crash test execution
#[derive(Debug)]
pub struct CrashTestResult {
    /// Whether the process terminated unsuccessfully
    pub crashed: bool,
    pub exit_status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `ondiskxy write` over `input`, optionally aborting at `crash_point`.
pub fn write_with_crash_point(
    crash_point: Option<&str>,
    store: &Path,
    config: &Path,
    input: &str,
) -> CrashTestResult {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ondiskxy"));
    command
        .arg("write")
        .arg("--store")
        .arg(store)
        .arg("--config")
        .arg(config)
        .env_remove(CRASH_POINT_ENV)
        .env_remove(LOG_LEVEL_ENV)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(point) = crash_point {
        command.env(CRASH_POINT_ENV, point);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return CrashTestResult {
                crashed: true,
                exit_status: None,
                stdout: String::new(),
                stderr: format!("Failed to execute: {}", e),
            }
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        // The child may abort before reading everything
        let _ = stdin.write_all(input.as_bytes());
    }

    match child.wait_with_output() {
        Ok(output) => CrashTestResult {
            crashed: !output.status.success(),
            exit_status: Some(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        },
        Err(e) => CrashTestResult {
            crashed: true,
            exit_status: None,
            stdout: String::new(),
            stderr: format!("Failed to wait: {}", e),
        },
    }
}

/// Runs `ondiskxy read` and returns its stdout lines.
pub fn read_lines(store: &Path) -> Vec<String> {
    let output = Command::new(env!("CARGO_BIN_EXE_ondiskxy"))
        .arg("read")
        .arg("--store")
        .arg(store)
        .env_remove(CRASH_POINT_ENV)
        .env_remove(LOG_LEVEL_ENV)
        .output()
        .expect("failed to run ondiskxy read");
    assert!(
        output.status.success(),
        "read failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}
