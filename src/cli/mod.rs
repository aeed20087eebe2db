//! CLI module for the annotest harness
//!
//! `annotest [OPTIONS] [TEST]...` prepares the scratch workspace, builds every selected test
//! through the external toolchain, runs it, and compares its stdout with the `# ` annotations in
//! its source.
//!
//! ## Modules
//!
//! - `test_interfaces` - Discovery, build and execution seams
//! - `test_runner` - Environment setup and the per-test loop
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod test_interfaces;
pub mod test_runner;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use miette::Diagnostic;

use crate::config::{
    DEFAULT_CONFIG_FILE, ExitStatusPolicy, FailurePolicy, FileConfig, HarnessConfig, timeout_from_secs,
};
use crate::errors::HarnessError;
use crate::version::ANNOTEST_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Render a fatal harness error as `ERROR: <message>`, followed by its cause and help hint.
impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        let mut message = format!("ERROR: {}", err);
        if let Some(source) = std::error::Error::source(&err) {
            message.push_str(&format!("\n  caused by: {}", source));
        }
        if let Some(help) = err.help() {
            message.push_str(&format!("\n  help: {}", help));
        }
        CliError::failure(message)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// End-to-end test harness for the compiler toolchain
#[derive(Parser, Debug)]
#[command(name = "annotest")]
#[command(version = ANNOTEST_VERSION)]
#[command(about = "Compile, link and run annotated test programs, checking their output", long_about = None)]
pub struct Cli {
    /// Run only these tests (exact file names); all tests when omitted
    #[arg(value_name = "TEST")]
    pub tests: Vec<String>,

    /// Configuration file (default: ./annotest.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the test sources
    #[arg(long, value_name = "DIR")]
    pub test_dir: Option<PathBuf>,

    /// Scratch directory, wiped at the start of every run
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Runtime IR linked into every test
    #[arg(long = "runtime", value_name = "FILE")]
    pub runtime_source: Option<PathBuf>,

    /// Directory that must exist before running (the compiled compiler driver)
    #[arg(long, value_name = "DIR")]
    pub precondition_dir: Option<PathBuf>,

    /// Assembler binary
    #[arg(long, value_name = "PROGRAM")]
    pub assembler: Option<String>,

    /// Linker binary
    #[arg(long, value_name = "PROGRAM")]
    pub linker: Option<String>,

    /// Compiler command: program and leading arguments, split on whitespace
    #[arg(long, value_name = "COMMAND", allow_hyphen_values = true)]
    pub compiler: Option<String>,

    /// Time limit for each compiler, assembler and linker invocation, in seconds (0 = none)
    #[arg(long = "timeout", value_name = "SECS")]
    pub tool_timeout: Option<u64>,

    /// Time limit for each test program, in seconds (0 = none)
    #[arg(long, value_name = "SECS")]
    pub exec_timeout: Option<u64>,

    /// Stop on first failure
    #[arg(short = 'x', long = "exitfirst")]
    pub stop_on_fail: bool,

    /// Fail tests whose program exits with a non-zero status
    #[arg(long)]
    pub check_exit_status: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = resolve_config(&cli, Path::new(DEFAULT_CONFIG_FILE))?;
    tracing::debug!(?config, "resolved configuration");
    test_runner::run_tests(&config, &cli.tests, cli.verbose)
}

/// Layer defaults, the config file and command-line flags, in that order.
///
/// `implicit_file` is read only when `--config` is absent and the file exists.
pub fn resolve_config(cli: &Cli, implicit_file: &Path) -> Result<HarnessConfig, HarnessError> {
    let mut config = HarnessConfig::default();
    match &cli.config {
        Some(path) => config = FileConfig::load(path)?.apply(config),
        None if implicit_file.is_file() => {
            tracing::info!(file = %implicit_file.display(), "loading configuration");
            config = FileConfig::load(implicit_file)?.apply(config);
        }
        None => {}
    }
    Ok(apply_flags(cli, config))
}

fn apply_flags(cli: &Cli, mut config: HarnessConfig) -> HarnessConfig {
    if let Some(dir) = &cli.test_dir {
        config = config.with_test_dir(dir);
    }
    if let Some(dir) = &cli.scratch_dir {
        config = config.with_scratch_dir(dir);
    }
    if let Some(path) = &cli.runtime_source {
        config = config.with_runtime_source(path);
    }
    if let Some(dir) = &cli.precondition_dir {
        config = config.with_precondition_dir(dir);
    }

    let mut toolchain = config.toolchain.clone();
    if let Some(command) = &cli.compiler {
        toolchain = toolchain.with_compiler(command.split_whitespace());
    }
    if let Some(assembler) = &cli.assembler {
        toolchain = toolchain.with_assembler(assembler);
    }
    if let Some(linker) = &cli.linker {
        toolchain = toolchain.with_linker(linker);
    }
    config = config.with_toolchain(toolchain);

    if let Some(secs) = cli.tool_timeout {
        config = config.with_tool_timeout(timeout_from_secs(secs));
    }
    if let Some(secs) = cli.exec_timeout {
        config = config.with_exec_timeout(timeout_from_secs(secs));
    }
    if cli.stop_on_fail {
        config = config.with_failure_policy(FailurePolicy::FailFast);
    }
    if cli.check_exit_status {
        config = config.with_exit_status_policy(ExitStatusPolicy::RequireSuccess);
    }
    config
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("annotest").chain(args.iter().copied())).unwrap()
    }

    fn no_file() -> PathBuf {
        PathBuf::from("annotest-no-such-config.toml")
    }

    #[test]
    fn test_cli_parse_defaults() {
        let cli = parse(&[]);
        assert!(cli.tests.is_empty());
        assert_eq!(resolve_config(&cli, &no_file()).unwrap(), HarnessConfig::default());
    }

    #[test]
    fn test_cli_parse_test_filter() {
        let cli = parse(&["hello.dorp", "loops.dorp"]);
        assert_eq!(cli.tests, vec!["hello.dorp", "loops.dorp"]);
    }

    #[test]
    fn test_cli_parse_flags() {
        let cli = parse(&["-v", "-x", "--check-exit-status", "--timeout", "0", "--exec-timeout", "3"]);
        let config = resolve_config(&cli, &no_file()).unwrap();
        assert!(cli.verbose);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.exit_status_policy, ExitStatusPolicy::RequireSuccess);
        assert_eq!(config.tool_timeout, None);
        assert_eq!(config.exec_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_cli_parse_compiler_command() {
        let cli = parse(&["--compiler", "dorpc -O2", "only.dorp"]);
        let config = resolve_config(&cli, &no_file()).unwrap();
        assert_eq!(config.toolchain.compiler, vec!["dorpc", "-O2"]);
        assert_eq!(cli.tests, vec!["only.dorp"]);
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("annotest.toml");
        fs::write(
            &file,
            "test_dir = \"cases\"\nscratch_dir = \"out\"\n[toolchain]\nassembler = \"llc-17\"\n",
        )
        .unwrap();

        let cli = parse(&["--scratch-dir", "tmp"]);
        let config = resolve_config(&cli, &file).unwrap();
        assert_eq!(config.test_dir, PathBuf::from("cases"));
        assert_eq!(config.scratch_dir, PathBuf::from("tmp"));
        assert_eq!(config.toolchain.assembler, "llc-17");
        assert_eq!(config.toolchain.linker, "gcc");
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let cli = parse(&["--config", "annotest-missing-dir/none.toml"]);
        assert!(resolve_config(&cli, &no_file()).is_err());
    }

    #[test]
    fn test_harness_error_renders_with_help() {
        let err = CliError::from(HarnessError::PreconditionMissing {
            path: PathBuf::from("bin"),
        });
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert_eq!(err.message, "ERROR: bin not found\n  help: did you run make?");
    }
}
