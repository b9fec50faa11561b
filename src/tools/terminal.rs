//! Shell command execution tool.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;

use super::Tool;

const MAX_OUTPUT_CHARS: usize = 10_000;

/// Run a command, directly or through the shell.
pub struct RunCommand;

#[async_trait]
impl Tool for RunCommand {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Execute a command in the workspace directory. Returns the exit code, stdout, and stderr. Set 'shell' to run through sh -c (pipes, globs, redirects)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to execute"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 60)"
                },
                "shell": {
                    "type": "boolean",
                    "description": "Run through the shell instead of splitting into argv (default: false)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, workspace: &Path) -> anyhow::Result<String> {
        let command = args["command"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'command' argument"))?;
        let timeout_secs = args["timeout_secs"].as_u64().unwrap_or(60);
        let shell = args["shell"].as_bool().unwrap_or(false);

        tracing::info!(command = %command, shell = shell, "Running command");

        let mut cmd = if shell {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        } else {
            // Naive whitespace split, like a shell with no quoting.
            let mut parts = command.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("Empty command"))?;
            let mut c = Command::new(program);
            c.args(parts);
            c
        };

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(timeout_secs),
            cmd.current_dir(workspace)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| anyhow::anyhow!("Command timed out after {} seconds", timeout_secs))?
        .map_err(|e| anyhow::anyhow!("Failed to execute command: {}", e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        if exit_code != 0 {
            tracing::warn!(exit_code = exit_code, "Command returned non-zero exit code");
        }

        let mut result = String::new();
        result.push_str(&format!("Exit code: {}\n", exit_code));

        if !stdout.is_empty() {
            result.push_str("\n--- stdout ---\n");
            result.push_str(&stdout);
        }

        if !stderr.is_empty() {
            result.push_str("\n--- stderr ---\n");
            result.push_str(&stderr);
        }

        if result.len() > MAX_OUTPUT_CHARS {
            let mut end = MAX_OUTPUT_CHARS;
            while !result.is_char_boundary(end) {
                end -= 1;
            }
            result.truncate(end);
            result.push_str("\n... [output truncated]");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = RunCommand
            .execute(json!({"command": "echo hello"}), Path::new("."))
            .await
            .unwrap();
        assert!(out.starts_with("Exit code: 0"));
        assert!(out.contains("hello"));
    }

    #[tokio::test]
    async fn shell_mode_supports_pipes() {
        let out = RunCommand
            .execute(
                json!({"command": "echo one two | wc -w", "shell": true}),
                Path::new("."),
            )
            .await
            .unwrap();
        assert!(out.contains('2'));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let out = RunCommand
            .execute(json!({"command": "exit 3", "shell": true}), Path::new("."))
            .await
            .unwrap();
        assert!(out.starts_with("Exit code: 3"));
    }

    #[tokio::test]
    async fn timeout_aborts_the_command() {
        let err = RunCommand
            .execute(
                json!({"command": "sleep 5", "timeout_secs": 1}),
                Path::new("."),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn empty_command_is_an_error() {
        let err = RunCommand
            .execute(json!({"command": "   "}), Path::new("."))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Empty command"));
    }
}
