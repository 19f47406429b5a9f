//! sitemon-exec — bounded external process execution.
//!
//! Spawns an executable with optional bytes on stdin, captures exit
//! code, stdout, and stderr, and enforces a deadline. On expiry the
//! child is killed (`kill_on_drop`) and [`ExecError::Timeout`] is
//! returned; the caller decides whether that is fatal (it never is for
//! remediation actions).

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Captured outcome of one finished process.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code; -1 when the process was terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors from a single execution attempt.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Run `program` with `args`, feeding `stdin` if given, under `timeout`.
///
/// Stdout and stderr are fully captured; the child is killed if the
/// deadline expires before it exits.
pub async fn run_command(
    stdin: Option<Vec<u8>>,
    program: &Path,
    args: &[String],
    timeout: Duration,
) -> Result<CommandResult, ExecError> {
    let label = program.display().to_string();
    debug!(program = %label, ?args, stdin = stdin.is_some(), "exec");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        program: label.clone(),
        source,
    })?;

    // One deadline covers the stdin write and the wait: a child that
    // never drains its pipe must still time out. The future owns the
    // child, so expiry drops and kills it.
    let io_program = label.clone();
    let run = async move {
        if let Some(input) = stdin {
            // Taking stdin and dropping it closes the pipe, so the
            // child sees EOF once the bytes are written.
            if let Some(mut handle) = child.stdin.take() {
                handle
                    .write_all(&input)
                    .await
                    .map_err(|source| ExecError::Io {
                        program: io_program.clone(),
                        source,
                    })?;
            }
        }
        child
            .wait_with_output()
            .await
            .map_err(|source| ExecError::Io {
                program: io_program,
                source,
            })
    };

    let output = tokio::time::timeout(timeout, run)
        .await
        .map_err(|_| ExecError::Timeout {
            program: label.clone(),
            timeout,
        })??;

    Ok(CommandResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a shell command line via `/bin/sh -c`.
///
/// The command string is passed through verbatim; callers own any
/// quoting of arguments embedded in it.
pub async fn run_shell(command: &str, timeout: Duration) -> Result<CommandResult, ExecError> {
    run_command(
        None,
        Path::new("/bin/sh"),
        &["-c".to_string(), command.to_string()],
        timeout,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let result = run_shell("printf hello; exit 0", TIMEOUT).await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.stderr, "");
    }

    #[tokio::test]
    async fn captures_nonzero_exit_and_stderr() {
        let result = run_shell("printf oops >&2; exit 3", TIMEOUT).await.unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stderr, "oops");
    }

    #[tokio::test]
    async fn stdin_bytes_reach_the_child() {
        let result = run_command(
            Some(b"piped body".to_vec()),
            Path::new("/bin/cat"),
            &[],
            TIMEOUT,
        )
        .await
        .unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "piped body");
    }

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout_error() {
        let err = run_shell("sleep 30", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[tokio::test]
    async fn stalled_stdin_write_still_times_out() {
        // The input exceeds the pipe buffer and the child never reads,
        // so the write itself blocks; the deadline must still fire.
        let err = run_command(
            Some(vec![b'x'; 1 << 20]),
            Path::new("/bin/sh"),
            &["-c".to_string(), "sleep 30".to_string()],
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run_command(
            None,
            Path::new("/nonexistent/sitemon-no-such-binary"),
            &[],
            TIMEOUT,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
