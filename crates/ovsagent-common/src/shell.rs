//! Shell command execution utilities for the OVS agent.
//!
//! This module provides safe shell command execution with proper quoting
//! to prevent command injection. Flow batches are fed to `ovs-ofctl`
//! through stdin, so an [`exec_with_input`] variant is provided as well.
//!
//! # Example
//!
//! ```ignore
//! use ovsagent_common::shell::{self, OVS_VSCTL_CMD, shellquote};
//!
//! let bridge = "br-int";
//! let cmd = format!("{} br-exists {}", OVS_VSCTL_CMD, shellquote(bridge));
//! let result = shell::exec(&cmd).await?;
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{OvsError, OvsResult};

/// Path to the `ovs-vsctl` command for OVSDB configuration.
pub const OVS_VSCTL_CMD: &str = "/usr/bin/ovs-vsctl";

/// Path to the `ovs-ofctl` command for OpenFlow flow management.
pub const OVS_OFCTL_CMD: &str = "/usr/bin/ovs-ofctl";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// Wraps the string in double quotes and escapes any characters that
/// have special meaning inside double quotes: `$`, `` ` ``, `"`, `\`
/// and newline.
///
/// # Example
///
/// ```
/// use ovsagent_common::shell::shellquote;
///
/// assert_eq!(shellquote("br-int"), "\"br-int\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The trimmed stdout output.
    pub stdout: String,
    /// The trimmed stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes a shell command asynchronously.
///
/// The command runs through `/bin/sh -c` to support pipes and
/// redirects. Returns `Err` only if the command could not be spawned;
/// a non-zero exit is reported through [`ExecResult`].
pub async fn exec(cmd: &str) -> OvsResult<ExecResult> {
    exec_with_input(cmd, None).await
}

/// Executes a shell command, optionally piping `input` to its stdin.
///
/// `ovs-ofctl add-flows <bridge> -` reads one flow expression per line
/// from stdin; this is how flow batches are applied.
pub async fn exec_with_input(cmd: &str, input: Option<&str>) -> OvsResult<ExecResult> {
    tracing::debug!(command = %cmd, "Executing shell command");

    let mut child = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| OvsError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    if let Some(data) = input {
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(data.as_bytes())
                .await
                .map_err(|e| OvsError::ShellExec {
                    command: cmd.to_string(),
                    source: e,
                })?;
            // Drop closes the pipe so the child sees EOF.
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| OvsError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %cmd, exit_code = exit_code, "Command succeeded");
    } else {
        tracing::warn!(
            command = %cmd,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a shell command and returns an error on non-zero exit.
pub async fn exec_or_throw(cmd: &str) -> OvsResult<String> {
    let result = exec(cmd).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(OvsError::CommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

/// Executes a shell command with stdin input, erroring on non-zero exit.
pub async fn exec_with_input_or_throw(cmd: &str, input: &str) -> OvsResult<String> {
    let result = exec_with_input(cmd, Some(input)).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(OvsError::CommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}
