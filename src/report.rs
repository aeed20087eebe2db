//! Comparison, live progress and the final verdict.
//!
//! ## TestReporter Trait
//!
//! [`Reporter`] decides pass or fail; a [`TestReporter`] decides how that is shown. The console
//! implementation reproduces the classic harness output: a `tests: ...` line, one `.` or `F` per
//! test flushed as it completes, then a newline. Failure details are not printed here: they are
//! collected into the [`TestSummary`] and rendered once at the end by the CLI.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use annotest_core::Mismatch;

use crate::config::ExitStatusPolicy;
use crate::execution::Execution;

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(Mismatch),
}

/// Everything recorded about one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub test_id: String,
    pub expected: String,
    pub actual: String,
    pub exit_code: i32,
    pub outcome: TestOutcome,
}

impl RunResult {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, TestOutcome::Passed)
    }
}

/// Summary of a test run
#[derive(Debug, Clone, Default)]
pub struct TestSummary {
    /// Tests announced after discovery and filtering.
    pub collected: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration: Duration,
    pub failures: Vec<Mismatch>,
}

impl TestSummary {
    /// Tests that actually ran; lower than `collected` after a fail-fast stop.
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every failure, rendered and joined by newlines; `None` when everything passed.
    pub fn failure_report(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let entries: Vec<String> = self.failures.iter().map(ToString::to_string).collect();
        Some(entries.join("\n"))
    }
}

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting test progress.
///
/// Implement this trait to customize output (JSON, TAP, etc.).
pub trait TestReporter {
    /// Called once with the final working set, before any test runs
    fn on_collection_complete(&mut self, test_ids: &[String]);

    /// Called before a test is built
    fn on_test_start(&mut self, _test_id: &str) {}

    /// Called when a test's verdict is known
    fn on_test_complete(&mut self, result: &RunResult);

    /// Called after the last test
    fn on_run_complete(&mut self, summary: &TestSummary);

    /// Called instead of `on_run_complete` when a fatal error stops the run
    fn on_run_aborted(&mut self) {}
}

/// Progress on a terminal (or any writer).
#[derive(Debug)]
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
    pub verbose: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Progress output is best effort; a closed stdout must not abort the run.
    fn emit(&mut self, text: &str) {
        let written = self.out.write_all(text.as_bytes()).and_then(|()| self.out.flush());
        if let Err(e) = written {
            tracing::debug!(error = %e, "could not write progress");
        }
    }
}

impl<W: Write> TestReporter for ConsoleReporter<W> {
    fn on_collection_complete(&mut self, test_ids: &[String]) {
        self.emit(&format!("tests: {}\n", test_ids.join(" ")));
    }

    fn on_test_start(&mut self, test_id: &str) {
        if self.verbose {
            self.emit(&format!("{} ... ", test_id));
        }
    }

    fn on_test_complete(&mut self, result: &RunResult) {
        let status = match (self.verbose, result.passed()) {
            (false, true) => ".",
            (false, false) => "F",
            (true, true) => "ok\n",
            (true, false) => "FAILED\n",
        };
        self.emit(status);
    }

    fn on_run_complete(&mut self, summary: &TestSummary) {
        if !self.verbose {
            self.emit("\n");
            return;
        }
        let mut line = format!("{} passed, {} failed", summary.passed, summary.failed);
        let skipped = summary.collected.saturating_sub(summary.total());
        if skipped > 0 {
            line.push_str(&format!(", {} not run", skipped));
        }
        self.emit(&format!("{} in {:.2}s\n", line, summary.duration.as_secs_f64()));
    }

    fn on_run_aborted(&mut self) {
        // Verbose mode is mid-line after "id ... ".
        self.emit("\n");
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Compares each execution against its expectation and keeps the tally.
///
/// Consumed by [`Reporter::finalize`].
pub struct Reporter<R: TestReporter> {
    reporter: R,
    exit_status_policy: ExitStatusPolicy,
    collected: usize,
    passed: usize,
    failures: Vec<Mismatch>,
    start: Instant,
}

impl<R: TestReporter> Reporter<R> {
    pub fn new(reporter: R, exit_status_policy: ExitStatusPolicy) -> Self {
        Self {
            reporter,
            exit_status_policy,
            collected: 0,
            passed: 0,
            failures: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Announce the working set.
    pub fn begin(&mut self, test_ids: &[String]) {
        self.collected = test_ids.len();
        self.reporter.on_collection_complete(test_ids);
    }

    pub fn start_test(&mut self, test_id: &str) {
        self.reporter.on_test_start(test_id);
    }

    /// Judge one execution and emit its progress mark.
    ///
    /// Output is compared byte for byte. A killed program always fails; a non-zero exit fails only
    /// under [`ExitStatusPolicy::RequireSuccess`].
    pub fn record(&mut self, test_id: &str, expected: &str, execution: &Execution) -> RunResult {
        let output_matches = execution.stdout == expected;
        let status_ok = match self.exit_status_policy {
            ExitStatusPolicy::Ignore => true,
            ExitStatusPolicy::RequireSuccess => execution.success,
        };

        let outcome = if output_matches && status_ok && !execution.timed_out {
            self.passed += 1;
            TestOutcome::Passed
        } else {
            let mut mismatch = Mismatch::output(test_id, expected, execution.stdout.as_str());
            mismatch.timed_out = execution.timed_out;
            if !status_ok {
                mismatch.exit_code = Some(execution.exit_code);
            }
            tracing::debug!(test = test_id, "mismatch recorded");
            self.failures.push(mismatch.clone());
            TestOutcome::Failed(mismatch)
        };

        let result = RunResult {
            test_id: test_id.to_string(),
            expected: expected.to_string(),
            actual: execution.stdout.clone(),
            exit_code: execution.exit_code,
            outcome,
        };
        self.reporter.on_test_complete(&result);
        result
    }

    /// End the progress output after a fatal error; nothing recorded so far is reported.
    pub fn abort(mut self) -> R {
        self.reporter.on_run_aborted();
        self.reporter
    }

    /// End the progress output and hand back the totals.
    pub fn finalize(self) -> (TestSummary, R) {
        let Reporter {
            mut reporter,
            collected,
            passed,
            failures,
            start,
            ..
        } = self;
        let summary = TestSummary {
            collected,
            passed,
            failed: failures.len(),
            duration: start.elapsed(),
            failures,
        };
        reporter.on_run_complete(&summary);
        (summary, reporter)
    }
}
