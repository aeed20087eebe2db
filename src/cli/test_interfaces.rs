//! Test runner I/O boundary interfaces
//!
//! This module defines trait-based abstractions for the side-effecting steps of a run:
//! - Test discovery (directory listing + source loading)
//! - Artifact building (compile → assemble → link through the external toolchain)
//! - Test execution (running the built program and capturing stdout)
//!
//! The runner loop in `test_runner` only talks to these traits, so it can be exercised with
//! in-memory fakes. The default implementations drive the real filesystem and toolchain.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::discovery::{self, TestCase};
use crate::errors::HarnessError;
use crate::execution::{self, Execution};
use crate::toolchain::CompilationPipeline;

// ============================================================================
// Test Discovery Interface
// ============================================================================

/// Find the tests to run and load their sources.
pub trait TestDiscovery {
    /// Test identifiers under `test_dir`, narrowed by the exact-name `filter` when non-empty.
    fn discover(&self, test_dir: &Path, filter: &[String]) -> Result<Vec<String>, HarnessError>;

    /// Read one test and derive its expected output.
    fn load(&self, test_dir: &Path, test_id: &str) -> Result<TestCase, HarnessError>;
}

// ============================================================================
// Artifact Builder Interface
// ============================================================================

/// Turn a test source into something runnable.
pub trait ArtifactBuilder {
    /// Build `case` and return the path of the executable. Any error aborts the run.
    fn build(&self, case: &TestCase) -> Result<PathBuf, HarnessError>;
}

// ============================================================================
// Test Executor Interface
// ============================================================================

/// Run a built test and capture what it printed.
pub trait TestExecutor {
    fn execute(&self, executable: &Path) -> Result<Execution, HarnessError>;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Flat directory listing on the real filesystem.
pub struct FilesystemDiscovery;

impl TestDiscovery for FilesystemDiscovery {
    fn discover(&self, test_dir: &Path, filter: &[String]) -> Result<Vec<String>, HarnessError> {
        discovery::discover(test_dir, filter)
    }

    fn load(&self, test_dir: &Path, test_id: &str) -> Result<TestCase, HarnessError> {
        TestCase::load(test_dir, test_id)
    }
}

/// Builds through the external compiler, assembler and linker.
pub struct ToolchainBuilder {
    pipeline: CompilationPipeline,
    scratch_dir: PathBuf,
    runtime_object: PathBuf,
}

impl ToolchainBuilder {
    pub fn new(pipeline: CompilationPipeline, scratch_dir: impl Into<PathBuf>, runtime_object: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            scratch_dir: scratch_dir.into(),
            runtime_object: runtime_object.into(),
        }
    }
}

impl ArtifactBuilder for ToolchainBuilder {
    fn build(&self, case: &TestCase) -> Result<PathBuf, HarnessError> {
        let artifacts = self
            .pipeline
            .build(&case.id, &case.path, &self.runtime_object, &self.scratch_dir)?;
        Ok(artifacts.executable)
    }
}

/// Runs the executable as a child process.
pub struct ProcessExecutor {
    pub timeout: Option<Duration>,
}

impl TestExecutor for ProcessExecutor {
    fn execute(&self, executable: &Path) -> Result<Execution, HarnessError> {
        execution::run(executable, self.timeout)
    }
}
