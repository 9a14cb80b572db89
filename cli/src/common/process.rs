//! # slipstream Process Execution Utilities (`common::process`)
//!
//! File: cli/src/common/process.rs
//!
//! ## Overview
//!
//! Thin wrapper around `std::process::Command` for running an external
//! program inside a working directory and capturing its output. The VCS
//! providers use it to run listing commands such as `git ls-files`.
//!
//! ## Architecture
//!
//! - **`run_command_capture`**: runs `program args...` in `cwd`, waits for it,
//!   and returns stdout as raw bytes. Spawn failures and non-zero exits are
//!   mapped into `VcsError` so callers get the full command line in the message.
//! - **`command_line`**: renders a program and its arguments for messages.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::process;
//! use std::path::Path;
//!
//! # fn run_example() -> Result<(), crate::core::error::VcsError> {
//! let stdout = process::run_command_capture("git", &["ls-files"], Path::new("."))?;
//! for line in String::from_utf8_lossy(&stdout).lines() {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::VcsError;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Joins a program and its arguments the way they would be typed in a shell.
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` with `args` in `cwd` and returns its captured stdout.
///
/// Stdin is closed so the child can never block waiting for input.
///
/// # Errors
///
/// - `VcsError::Execution` if the program cannot be spawned (not installed,
///   permission denied, missing working directory).
/// - `VcsError::Failed` if the program exits with a non-zero status; the
///   captured stderr is included in the error.
pub fn run_command_capture(program: &str, args: &[&str], cwd: &Path) -> Result<Vec<u8>, VcsError> {
    let command = command_line(program, args);
    debug!("Running '{}' in {}", command, cwd.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| VcsError::Execution {
            command: command.clone(),
            source,
        })?;

    debug!(
        "'{}' finished: status={}, {} bytes of stdout",
        command,
        output.status,
        output.stdout.len()
    );

    if !output.status.success() {
        return Err(VcsError::Failed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_command_line_rendering() {
        assert_eq!(command_line("git", &["ls-files"]), "git ls-files");
        assert_eq!(command_line("hg", &[]), "hg");
    }

    #[test]
    #[cfg(unix)]
    fn test_run_command_capture_stdout() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        // `ls` runs in the requested working directory.
        let stdout = run_command_capture("ls", &[], dir.path()).unwrap();
        assert!(String::from_utf8_lossy(&stdout).contains("marker.txt"));
    }

    #[test]
    fn test_run_command_missing_program() {
        let dir = tempdir().unwrap();
        let err = run_command_capture("nonexistentcommand12345", &["--flag"], dir.path())
            .unwrap_err();
        assert!(matches!(err, VcsError::Execution { .. }));
        assert!(err.to_string().contains("nonexistentcommand12345 --flag"));
    }

    #[test]
    #[cfg(unix)]
    fn test_run_command_non_zero_exit() {
        let dir = tempdir().unwrap();
        let err = run_command_capture("sh", &["-c", "echo boom >&2; exit 3"], dir.path())
            .unwrap_err();
        match err {
            VcsError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
