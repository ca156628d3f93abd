//! Bounded external command execution
//!
//! Every shell-out in the pipeline (git, docker, aws) goes through
//! [`run_command`], which enforces a wall-clock budget and kills the child
//! when it is exceeded.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("`{program}` exited with status {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A command line to execute
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Text piped to the child's stdin, e.g. a registry password
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `spec` to completion, failing on spawn error, timeout or non-zero exit
pub async fn run_command(spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
    debug!(program = %spec.program, args = ?redacted_args(&spec.args), "Running command");

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|source| CommandError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    if let Some(input) = &spec.stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|source| CommandError::Io {
                    program: spec.program.clone(),
                    source,
                })?;
            // dropping the pipe closes stdin so the child sees EOF
        }
    }

    let output = match tokio::time::timeout(spec.timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| CommandError::Io {
            program: spec.program.clone(),
            source,
        })?,
        Err(_) => {
            return Err(CommandError::Timeout {
                program: spec.program.clone(),
                timeout: spec.timeout,
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(CommandError::NonZeroExit {
            program: spec.program.clone(),
            code: output.status.code(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(CommandOutput { stdout, stderr })
}

/// Hides values following credential-bearing flags in debug logs
fn redacted_args(args: &[String]) -> Vec<String> {
    let mut hide_next = false;
    args.iter()
        .map(|arg| {
            if hide_next {
                hide_next = false;
                return "***".to_string();
            }
            if arg == "-c" {
                hide_next = true;
            }
            arg.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_command_success() {
        let spec = CommandSpec::new("sh", Duration::from_secs(5)).args(["-c", "echo hello"]);
        let output = run_command(&spec).await.unwrap();
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_command_non_zero_exit() {
        let spec =
            CommandSpec::new("sh", Duration::from_secs(5)).args(["-c", "echo boom >&2; exit 3"]);
        match run_command(&spec).await {
            Err(CommandError::NonZeroExit { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected NonZeroExit, got {:?}", other),
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_command_timeout() {
        let spec = CommandSpec::new("sleep", Duration::from_millis(100)).arg("5");
        assert!(matches!(
            run_command(&spec).await,
            Err(CommandError::Timeout { .. })
        ));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_command_stdin() {
        let spec = CommandSpec::new("cat", Duration::from_secs(5)).stdin("secret");
        let output = run_command(&spec).await.unwrap();
        assert_eq!(output.stdout, "secret");
    }

    #[tokio::test]
    async fn test_run_command_missing_program() {
        let spec = CommandSpec::new("definitely-not-a-real-binary-xyz", Duration::from_secs(1));
        assert!(matches!(
            run_command(&spec).await,
            Err(CommandError::Spawn { .. })
        ));
    }

    #[test]
    fn test_redacted_args() {
        let args = vec![
            "-c".to_string(),
            "http.extraHeader=Authorization: Bearer x".to_string(),
            "clone".to_string(),
        ];
        assert_eq!(redacted_args(&args), vec!["-c", "***", "clone"]);
    }
}
