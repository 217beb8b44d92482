//! Running external tools

use curfew_host_api::{ControlError, ControlResult};
use tokio::process::Command;
use tracing::debug;

/// Captured output of a successful run
pub(crate) struct CommandOutput {
    pub stdout: String,
}

/// Run a program to completion, mapping failures to [`ControlError`]
pub(crate) async fn run(program: &str, args: &[&str]) -> ControlResult<CommandOutput> {
    debug!(program, ?args, "Running command");

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => ControlError::PermissionDenied(format!(
                "{}: {}",
                program, e
            )),
            _ => ControlError::SystemError(format!("failed to run {}: {}", program, e)),
        })?;

    if output.status.success() {
        return Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        });
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(classify_failure(program, output.status.code(), stderr.trim()))
}

/// Map a non-zero exit to an error, recognising polkit/D-Bus denials
pub(crate) fn classify_failure(program: &str, code: Option<i32>, stderr: &str) -> ControlError {
    let lower = stderr.to_ascii_lowercase();
    let message = match code {
        Some(code) => format!("{} exited with {}: {}", program, code, stderr),
        None => format!("{} killed by signal: {}", program, stderr),
    };

    if lower.contains("access denied")
        || lower.contains("interactive authentication required")
        || lower.contains("permission denied")
        || lower.contains("not authorized")
    {
        ControlError::PermissionDenied(message)
    } else {
        ControlError::SystemError(message)
    }
}
