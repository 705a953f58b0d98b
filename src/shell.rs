//! Shell command execution
//!
//! Commands run through `bash -c` with stdout and stderr captured. Every
//! output line is logged; callers may require a success pattern to appear.

use crate::error::{DeployError, DeployResult};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Captured result of a shell command
#[derive(Debug, Clone)]
pub struct ShellOutput {
    /// Whether the process exited with status zero
    pub success: bool,
    /// Exit code, if the process was not killed by a signal
    pub code: Option<i32>,
    /// Non-empty stdout lines followed by non-empty stderr lines
    pub lines: Vec<String>,
}

impl ShellOutput {
    /// Whether any output line contains `pattern`
    pub fn contains(&self, pattern: &str) -> bool {
        self.lines.iter().any(|line| line.contains(pattern))
    }

    fn tail(&self, n: usize) -> String {
        let start = self.lines.len().saturating_sub(n);
        self.lines[start..].join("\n")
    }
}

/// Run `command` and return its output regardless of exit status
pub async fn run(command: &str, cwd: Option<&Path>) -> DeployResult<ShellOutput> {
    debug!("Executing: bash -c {:?}", command);

    let mut cmd = Command::new("bash");
    cmd.arg("-c").arg(command);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd
        .output()
        .await
        .map_err(|e| DeployError::command_failed(command, e))?;

    let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .chain(String::from_utf8_lossy(&output.stderr).lines())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    for line in &lines {
        info!("{}", line);
    }

    Ok(ShellOutput {
        success: output.status.success(),
        code: output.status.code(),
        lines,
    })
}

/// Run `command`, failing on a non-zero exit
pub async fn run_checked(command: &str, cwd: Option<&Path>) -> DeployResult<ShellOutput> {
    let output = run(command, cwd).await?;
    if !output.success {
        warn!("Command exited with {:?}: {}", output.code, command);
        return Err(DeployError::command_exec(
            command,
            format!("exit code {:?}\n{}", output.code, output.tail(20)),
        ));
    }
    Ok(output)
}

/// Run `command`, failing unless some output line contains `pattern`
pub async fn run_expecting(
    command: &str,
    cwd: Option<&Path>,
    pattern: &str,
) -> DeployResult<ShellOutput> {
    let output = run(command, cwd).await?;
    if !output.contains(pattern) {
        return Err(DeployError::command_exec(
            command,
            format!("expected output containing {:?}\n{}", pattern, output.tail(20)),
        ));
    }
    Ok(output)
}

/// Quote a value for safe interpolation into a bash command line
pub fn quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+%,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}
