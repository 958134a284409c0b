use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tracing::debug;
use which::which;

use crate::errors::AppError;

/// Finds an executable in the system PATH.
pub fn find_executable(name: &str) -> Result<PathBuf> {
    which(name).with_context(|| format!("{} executable not found in PATH", name))
}

/// Runs a prepared command to completion, capturing its output.
///
/// A non-zero exit status becomes `AppError::Command` carrying the command line and stderr.
pub fn run_checked(cmd: &mut Command) -> crate::errors::Result<Output> {
    let command = describe(cmd);
    debug!("Running command: {}", command);

    let output = cmd.output()?;
    if !output.status.success() {
        return Err(AppError::Command {
            command,
            stderr: format!(
                "exit status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(output)
}

/// Runs a prepared command with the terminal attached so its progress stays visible.
pub fn run_attached(cmd: &mut Command) -> crate::errors::Result<()> {
    let command = describe(cmd);
    debug!("Running command: {}", command);

    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;
    if !status.success() {
        return Err(AppError::Command {
            command,
            stderr: format!("exit status {}", status),
        });
    }
    Ok(())
}

fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_checked_reports_failure() {
        let err = run_checked(Command::new("sh").args(["-c", "echo boom >&2; exit 3"])).unwrap_err();
        match err {
            AppError::Command { command, stderr } => {
                assert!(command.starts_with("sh -c"));
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_run_checked_returns_stdout() -> anyhow::Result<()> {
        let output = run_checked(Command::new("sh").args(["-c", "printf ok"]))?;
        assert_eq!(output.stdout, b"ok");
        Ok(())
    }

    #[test]
    fn test_run_attached_reports_exit_status() {
        assert!(run_attached(Command::new("sh").args(["-c", "exit 0"])).is_ok());
        match run_attached(Command::new("sh").args(["-c", "exit 4"])).unwrap_err() {
            AppError::Command { command, stderr } => {
                assert_eq!(command, "sh -c exit 4");
                assert!(stderr.contains('4'));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
