//! External process invocation.
//!
//! Helpers shared by the adapter tool, the package manager and the executor
//! host: capture output for JSON requests, or stream it into the log for
//! long-running package manager actions.

use std::ffi::OsStr;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ExternalError, Result};

/// Output of a completed process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs a process to completion, capturing its output.
///
/// `stdin`, when given, is written to the child and then closed.
///
/// # Errors
///
/// Returns an error if the process cannot be started or exits unsuccessfully.
pub async fn run_captured<I, S>(program: &str, args: I, stdin: Option<&[u8]>) -> Result<ProcessOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running {program}");
    let mut child = command
        .spawn()
        .map_err(|e| ExternalError::spawn(program, e.to_string()))?;

    if let Some(input) = stdin
        && let Some(mut pipe) = child.stdin.take()
    {
        pipe.write_all(input)
            .await
            .map_err(|e| ExternalError::spawn(program, format!("failed to write stdin: {e}")))?;
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| ExternalError::spawn(program, e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(ExternalError::ProcessFailed {
            program: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        }
        .into());
    }

    Ok(ProcessOutput { stdout, stderr })
}

/// Runs a process to completion, logging stdout lines at info level and
/// stderr lines at warn level as they arrive.
///
/// # Errors
///
/// Returns an error if the process cannot be started or exits unsuccessfully.
pub async fn run_streamed<I, S>(program: &str, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExternalError::spawn(program, e.to_string()))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_task = async {
        if let Some(out) = stdout {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!("{line}");
            }
        }
    };

    let stderr_task = async {
        let mut collected = Vec::new();
        if let Some(err) = stderr {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!("{line}");
                collected.push(line);
            }
        }
        collected
    };

    let ((), stderr_lines) = tokio::join!(stdout_task, stderr_task);

    let status = child
        .wait()
        .await
        .map_err(|e| ExternalError::spawn(program, e.to_string()))?;

    if status.success() {
        Ok(())
    } else {
        Err(ExternalError::ProcessFailed {
            program: program.to_string(),
            status: status.code().unwrap_or(-1),
            stderr: stderr_lines.join("\n"),
        }
        .into())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::UpgradeError;

    #[tokio::test]
    async fn test_run_captured_reads_stdout() {
        let output = run_captured("sh", ["-c", "printf hello"], None)
            .await
            .expect("sh should run");
        assert_eq!(output.stdout, "hello");
    }

    #[tokio::test]
    async fn test_run_captured_passes_stdin() {
        let output = run_captured("sh", ["-c", "cat"], Some(b"[1,2]".as_slice()))
            .await
            .expect("cat should run");
        assert_eq!(output.stdout, "[1,2]");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_process_failure() {
        let err = run_captured("sh", ["-c", "echo bad >&2; exit 3"], None)
            .await
            .expect_err("must fail");
        match err {
            UpgradeError::External(ExternalError::ProcessFailed { status, stderr, .. }) => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let err = run_streamed("definitely-not-a-real-program-xyz", Vec::<String>::new())
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            UpgradeError::External(ExternalError::SpawnFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_streamed_reports_stderr_on_failure() {
        let err = run_streamed("sh", ["-c", "echo out; echo oops >&2; exit 1"])
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("oops"));
    }
}
