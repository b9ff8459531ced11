//! Async subprocess execution.
//!
//! Used by the codex re-auth fallback, which shells out to the provider's
//! own CLI. Children are spawned with kill-on-drop so a cancelled poll
//! cannot leave orphans, and an elapsed timeout kills the process tree
//! explicitly before returning.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{QpaceError, Result};

/// Default timeout for CLI commands.
pub const CLI_TIMEOUT: Duration = Duration::from_secs(10);

/// Output from a CLI command.
#[derive(Debug)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CliOutput {
    /// Check if the command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a CLI command with a bounded timeout.
///
/// # Errors
///
/// Returns error if the binary is missing, the command times out, or it
/// fails to execute at all. A non-zero exit code is not an error here;
/// callers check [`CliOutput::success`].
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout_duration: Duration,
) -> Result<CliOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QpaceError::Network(format!("{program}: command not found"))
            } else {
                QpaceError::Io(e)
            }
        })?;

    let result = timeout(timeout_duration, async {
        // Drain stdout and stderr concurrently; reading them sequentially can
        // deadlock when the child fills one pipe while we wait on the other.
        let stdout_handle = async {
            let mut stdout = String::new();
            if let Some(mut out) = child.stdout.take() {
                out.read_to_string(&mut stdout).await?;
            }
            Ok::<_, std::io::Error>(stdout)
        };

        let stderr_handle = async {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                err.read_to_string(&mut stderr).await?;
            }
            Ok::<_, std::io::Error>(stderr)
        };

        let (stdout_result, stderr_result) = tokio::join!(stdout_handle, stderr_handle);
        let stdout = stdout_result?;
        let stderr = stderr_result?;

        let status = child.wait().await?;

        Ok::<_, std::io::Error>(CliOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        })
    })
    .await;

    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(QpaceError::Io(e)),
        Err(_) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            Err(QpaceError::Timeout(timeout_duration.as_secs()))
        }
    }
}
