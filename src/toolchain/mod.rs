//! The external toolchain: roles, probing, and the per-test compilation pipeline.
//!
//! ## Modules
//!
//! - `process` - subprocess execution with captured output and optional time limits
//! - `pipeline` - compile → assemble → link for one test

pub mod pipeline;
pub mod process;

use std::fmt;
use std::io;
use std::time::Duration;

pub use pipeline::CompilationPipeline;
pub use process::{Invocation, ProcessOutput, StderrMode};

use crate::config::ToolchainConfig;
use crate::errors::HarnessError;

/// The part a binary plays in turning a test source into an executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolRole {
    Compiler,
    Assembler,
    Linker,
}

impl ToolRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolRole::Compiler => "compiler",
            ToolRole::Assembler => "assembler",
            ToolRole::Linker => "linker",
        }
    }

    /// What to suggest when the tool cannot be found.
    pub fn install_hint(self) -> &'static str {
        match self {
            ToolRole::Compiler => "is a JDK installed?",
            ToolRole::Assembler => "is llvm installed?",
            ToolRole::Linker => "is gcc installed?",
        }
    }
}

impl fmt::Display for ToolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tools checked before any work starts, each with a flag it accepts without doing any work.
///
/// The compiler is absent: a missing compiler surfaces on the first test.
const PROBES: [(ToolRole, &str); 2] = [(ToolRole::Assembler, "-help"), (ToolRole::Linker, "--help")];

/// Check that the binary for `role` can be started, passing it `flag`.
///
/// Only absence is fatal: a tool that starts and then exits non-zero on its probe flag (or hangs
/// past `timeout`) is accepted, since the harness only needs it to exist.
///
/// ## Errors
///
/// - [`HarnessError::ToolNotFound`] when the binary cannot be executed at all.
#[tracing::instrument(skip_all, fields(role = %role))]
pub fn probe(
    toolchain: &ToolchainConfig,
    role: ToolRole,
    flag: &str,
    timeout: Option<Duration>,
) -> Result<(), HarnessError> {
    let program = toolchain.program(role).to_string();
    let invocation = Invocation::new(&program)
        .args(toolchain.leading_args(role))
        .arg(flag);

    match process::run(&invocation, timeout) {
        Ok(output) => {
            if !output.success() {
                tracing::warn!(%program, status = %process::describe_status(&output.status), "probe exited unsuccessfully; tolerating");
            }
            Ok(())
        }
        Err(source) => {
            if source.kind() != io::ErrorKind::NotFound {
                tracing::debug!(%program, error = %source, "probe could not start tool");
            }
            Err(HarnessError::ToolNotFound {
                role,
                program,
                hint: role.install_hint().to_string(),
                source,
            })
        }
    }
}

/// Probe every tool the harness needs to exist up front (the assembler and the linker).
pub fn probe_all(toolchain: &ToolchainConfig, timeout: Option<Duration>) -> Result<(), HarnessError> {
    for (role, flag) in PROBES {
        probe(toolchain, role, flag, timeout)?;
    }
    Ok(())
}
