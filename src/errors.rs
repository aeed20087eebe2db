//! Harness error taxonomy.
//!
//! Every variant here aborts the run. Output mismatches are not errors: they are recorded by the
//! reporter and the run continues. See [`crate::report`].

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::toolchain::ToolRole;

/// Errors that stop the harness before or during the per-test loop.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    /// The compiled driver directory the compiler command relies on is absent.
    #[error("{} not found", .path.display())]
    #[diagnostic(code(annotest::precondition_missing), help("did you run make?"))]
    PreconditionMissing { path: PathBuf },

    /// A toolchain binary could not be found.
    #[error("{program} not found")]
    #[diagnostic(code(annotest::tool_not_found))]
    ToolNotFound {
        role: ToolRole,
        program: String,
        #[help]
        hint: String,
        #[source]
        source: io::Error,
    },

    /// A toolchain step ran and reported failure.
    #[error("{role} `{program}` failed on {subject} ({status}){}", stderr_suffix(.stderr))]
    #[diagnostic(code(annotest::tool_failed))]
    ToolFailed {
        role: ToolRole,
        program: String,
        subject: String,
        status: String,
        stderr: String,
    },

    /// A toolchain step exceeded its time limit and was killed.
    #[error("{role} `{program}` timed out on {subject} after {}s", .limit.as_secs_f64())]
    #[diagnostic(code(annotest::tool_timed_out), help("raise the limit with --timeout, or pass 0 to disable it"))]
    ToolTimedOut {
        role: ToolRole,
        program: String,
        subject: String,
        limit: Duration,
    },

    /// A process could not be started once the run was underway.
    #[error("could not start `{program}`")]
    #[diagnostic(code(annotest::spawn))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot read test directory {}", .path.display())]
    #[diagnostic(code(annotest::test_dir))]
    TestDirUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The scratch directory would wipe something other than a scratch directory.
    #[error("refusing to use {} as the scratch directory", .path.display())]
    #[diagnostic(code(annotest::unsafe_scratch_dir), help("pick a dedicated subdirectory, e.g. --scratch-dir test-tmp"))]
    UnsafeScratchDir { path: PathBuf },

    #[error("invalid configuration in {}: {message}", .path.display())]
    #[diagnostic(code(annotest::config))]
    Config { path: PathBuf, message: String },

    #[error("{context}")]
    #[diagnostic(code(annotest::io))]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl HarnessError {
    /// Wrap an I/O error with a description of what was being attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        HarnessError::Io {
            context: context.into(),
            source,
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}
