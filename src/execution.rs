//! Running a built test program and capturing what it printed.
//!
//! The program gets no arguments and no stdin. Its stderr goes straight to the terminal; only
//! stdout is compared.

use std::path::Path;
use std::time::Duration;

use crate::errors::HarnessError;
use crate::toolchain::process::{self, Invocation, StderrMode};

/// What one run of a test program produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Captured stdout, decoded as UTF-8 with invalid sequences replaced.
    pub stdout: String,
    /// Exit code; death by signal is folded into `128 + signal`.
    pub exit_code: i32,
    pub success: bool,
    /// Killed after exceeding the execution time limit.
    pub timed_out: bool,
}

impl Execution {
    /// A clean exit that printed `stdout`.
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: 0,
            success: true,
            timed_out: false,
        }
    }
}

/// Run `executable` to completion (or until `timeout`) and capture its stdout.
///
/// A non-zero exit status is not an error here; whether it matters is up to the reporter's exit
/// status policy.
///
/// ## Errors
///
/// - [`HarnessError::Spawn`] when the executable cannot be started.
#[tracing::instrument(skip_all, fields(executable = %executable.display()))]
pub fn run(executable: &Path, timeout: Option<Duration>) -> Result<Execution, HarnessError> {
    let invocation = Invocation::new(executable.to_string_lossy()).stderr(StderrMode::Inherit);
    let output = process::run(&invocation, timeout).map_err(|source| HarnessError::Spawn {
        program: executable.display().to_string(),
        source,
    })?;

    Ok(Execution {
        stdout: output.stdout_lossy(),
        exit_code: output.exit_code(),
        success: output.success(),
        timed_out: output.timed_out,
    })
}
