//! Subprocess plumbing shared by the command-line adapters.

use crate::error::CommandError;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried into an error.
const STDERR_TAIL_CHARS: usize = 400;

/// Run `command` to completion within `timeout` and require a zero exit.
///
/// A non-zero exit becomes an error carrying the tail of stderr.
pub(crate) async fn run_checked(
    command: &mut Command,
    name: &str,
    timeout: Duration,
) -> Result<Output, CommandError> {
    let output = run_captured(command, name, timeout).await?;
    if !output.status.success() {
        return Err(CommandError::Failed {
            command: name.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr_tail: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL_CHARS),
        });
    }
    Ok(output)
}

/// Run `command` to completion within `timeout`, capturing output without
/// judging the exit status. The child is killed when the timeout hits.
pub(crate) async fn run_captured(
    command: &mut Command,
    name: &str,
    timeout: Duration,
) -> Result<Output, CommandError> {
    command.kill_on_drop(true);
    debug!(command = name, "Running external command");

    tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| CommandError::TimedOut {
            command: name.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::Missing {
                command: name.to_string(),
            },
            _ => CommandError::Failed {
                command: name.to_string(),
                status: -1,
                stderr_tail: e.to_string(),
            },
        })
}

fn tail(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    trimmed
        .chars()
        .skip(count.saturating_sub(max_chars))
        .collect()
}
