//! Test runner: environment setup and the sequential per-test loop.
//!
//! ## I/O Boundaries
//!
//! Discovery, building and execution are abstracted via traits in `test_interfaces.rs` so that
//! [`run_suite`] can be driven by in-memory fakes. [`run_tests`] wires in the real filesystem and
//! toolchain.
//!
//! ## Failure Handling
//!
//! - An output mismatch is recorded and, under the default policy, the run continues.
//! - Anything else (a missing tool, a compiler that rejects a test, a program that cannot be
//!   started) is a [`HarnessError`] and stops the run immediately; later tests are not processed.

use std::path::PathBuf;

use super::test_interfaces::{
    ArtifactBuilder, FilesystemDiscovery, ProcessExecutor, TestDiscovery, TestExecutor, ToolchainBuilder,
};
use super::{CliError, CliResult, ExitCode};
use crate::config::{FailurePolicy, HarnessConfig};
use crate::errors::HarnessError;
use crate::report::{ConsoleReporter, Reporter, TestReporter, TestSummary};
use crate::toolchain::{self, CompilationPipeline};
use crate::workspace;

// ============================================================================
// Setup
// ============================================================================

/// Everything that must succeed before the first test: the precondition directory, the tool
/// probes, a clean scratch directory, and the shared runtime object.
///
/// ## Returns
///
/// The path of the assembled runtime object.
pub fn prepare_environment(config: &HarnessConfig, pipeline: &CompilationPipeline) -> Result<PathBuf, HarnessError> {
    workspace::check_precondition(&config.precondition_dir)?;
    toolchain::probe_all(&config.toolchain, config.tool_timeout)?;
    workspace::reset(&config.scratch_dir)?;
    workspace::build_runtime(pipeline, &config.runtime_source, &config.scratch_dir)
}

// ============================================================================
// Per-test loop
// ============================================================================

/// Discover, build, run and judge every selected test, strictly one after another.
///
/// ## Parameters
///
/// - `filter`: exact test names to keep; empty keeps everything.
///
/// ## Returns
///
/// The summary once every test (or, under [`FailurePolicy::FailFast`], every test up to the first
/// mismatch) has been judged, together with the reporter.
///
/// ## Errors
///
/// The first [`HarnessError`] from discovery, building or execution. The reporter is told the run
/// was aborted before the error is returned.
pub fn run_suite<R: TestReporter>(
    config: &HarnessConfig,
    filter: &[String],
    discovery: &impl TestDiscovery,
    builder: &impl ArtifactBuilder,
    executor: &impl TestExecutor,
    mut reporter: Reporter<R>,
) -> Result<(TestSummary, R), HarnessError> {
    let test_ids = discovery.discover(&config.test_dir, filter)?;
    reporter.begin(&test_ids);

    for test_id in &test_ids {
        reporter.start_test(test_id);
        let execution = discovery
            .load(&config.test_dir, test_id)
            .and_then(|case| {
                let executable = builder.build(&case)?;
                executor.execute(&executable).map(|execution| (case, execution))
            });
        let (case, execution) = match execution {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(test = %test_id, error = %e, "aborting run");
                reporter.abort();
                return Err(e);
            }
        };

        let result = reporter.record(test_id, &case.expected, &execution);
        if !result.passed() && config.failure_policy == FailurePolicy::FailFast {
            tracing::info!(test = %test_id, "stopping after first failure");
            break;
        }
    }

    Ok(reporter.finalize())
}

/// Run the harness end to end with the console reporter.
///
/// ## Returns
///
/// `ExitCode::SUCCESS` when every selected test passed (including when none were selected);
/// otherwise a [`CliError`] carrying the full failure report or the fatal error.
pub fn run_tests(config: &HarnessConfig, filter: &[String], verbose: bool) -> CliResult<ExitCode> {
    let pipeline = CompilationPipeline::new(config.toolchain.clone(), config.tool_timeout);
    let runtime_object = prepare_environment(config, &pipeline)?;

    let builder = ToolchainBuilder::new(pipeline, &config.scratch_dir, runtime_object);
    let executor = ProcessExecutor {
        timeout: config.exec_timeout,
    };
    let reporter = Reporter::new(ConsoleReporter::new(verbose), config.exit_status_policy);

    let (summary, _) = run_suite(config, filter, &FilesystemDiscovery, &builder, &executor, reporter)?;
    match summary.failure_report() {
        None => Ok(ExitCode::SUCCESS),
        Some(report) => Err(CliError::failure(report)),
    }
}
