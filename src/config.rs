//! Harness configuration.
//!
//! All paths and tool names the harness touches live here as explicit values. The defaults
//! reproduce the classic layout (driver classes in `bin/`, runtime IR at `lib/main.ll`, tests in
//! `test/`, scratch space in `test-tmp/`) so a bare `annotest` behaves as before.
//!
//! Values come from three layers, later ones winning: built-in defaults, an optional TOML file
//! (see [`FileConfig`]), then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::HarnessError;
use crate::toolchain::ToolRole;

/// Name of the config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "annotest.toml";

/// Default wall-clock limit for each compiler, assembler and linker invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);
/// Default wall-clock limit for each test program.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(10);

/// How the external tools are invoked. Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// Compiler program followed by its fixed leading arguments (entry point, classpath).
    pub compiler: Vec<String>,
    pub assembler: String,
    pub linker: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: ["java", "-cp", "bin", "com.wolfesoftware.dorp.Main"]
                .into_iter()
                .map(String::from)
                .collect(),
            assembler: "llc".to_string(),
            linker: "gcc".to_string(),
        }
    }
}

impl ToolchainConfig {
    /// Replace the whole compiler command. An empty command is ignored.
    pub fn with_compiler<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let command: Vec<String> = command.into_iter().map(Into::into).collect();
        if !command.is_empty() {
            self.compiler = command;
        }
        self
    }

    pub fn with_assembler(mut self, assembler: impl Into<String>) -> Self {
        self.assembler = assembler.into();
        self
    }

    pub fn with_linker(mut self, linker: impl Into<String>) -> Self {
        self.linker = linker.into();
        self
    }

    /// The executable started for `role`.
    pub fn program(&self, role: ToolRole) -> &str {
        match role {
            ToolRole::Compiler => self.compiler.first().map(String::as_str).unwrap_or_default(),
            ToolRole::Assembler => &self.assembler,
            ToolRole::Linker => &self.linker,
        }
    }

    /// Fixed arguments placed before the per-invocation ones.
    pub fn leading_args(&self, role: ToolRole) -> &[String] {
        match role {
            ToolRole::Compiler => self.compiler.get(1..).unwrap_or_default(),
            ToolRole::Assembler | ToolRole::Linker => &[],
        }
    }
}

/// What to do after a test's output does not match its annotations.
///
/// Toolchain failures always abort the run; this only governs mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the mismatch and keep going (the default).
    #[default]
    RunToCompletion,
    /// Stop after the first mismatch.
    FailFast,
}

/// Whether a test program's exit status takes part in the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatusPolicy {
    /// Judge by stdout alone (the default).
    #[default]
    Ignore,
    /// Also require a zero exit status.
    RequireSuccess,
}

/// Complete, resolved configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Directory that must exist before anything runs (the compiled compiler driver).
    pub precondition_dir: PathBuf,
    /// Runtime IR assembled once and linked into every test.
    pub runtime_source: PathBuf,
    pub test_dir: PathBuf,
    /// Wiped and recreated at the start of every run.
    pub scratch_dir: PathBuf,
    pub toolchain: ToolchainConfig,
    pub failure_policy: FailurePolicy,
    pub exit_status_policy: ExitStatusPolicy,
    /// Limit for each toolchain invocation; `None` waits forever.
    pub tool_timeout: Option<Duration>,
    /// Limit for each test program; `None` waits forever.
    pub exec_timeout: Option<Duration>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            precondition_dir: PathBuf::from("bin"),
            runtime_source: PathBuf::from("lib/main.ll"),
            test_dir: PathBuf::from("test"),
            scratch_dir: PathBuf::from("test-tmp"),
            toolchain: ToolchainConfig::default(),
            failure_policy: FailurePolicy::default(),
            exit_status_policy: ExitStatusPolicy::default(),
            tool_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            exec_timeout: Some(DEFAULT_EXEC_TIMEOUT),
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = dir.into();
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_runtime_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_source = path.into();
        self
    }

    pub fn with_precondition_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.precondition_dir = dir.into();
        self
    }

    pub fn with_toolchain(mut self, toolchain: ToolchainConfig) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_exit_status_policy(mut self, policy: ExitStatusPolicy) -> Self {
        self.exit_status_policy = policy;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_exec_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.exec_timeout = timeout;
        self
    }
}

/// Turn a seconds count into a timeout, with `0` meaning "no limit".
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// On-disk form of the configuration. Every key is optional.
///
/// ```toml
/// test_dir = "test"
/// scratch_dir = "test-tmp"
/// runtime_source = "lib/main.ll"
/// precondition_dir = "bin"
/// failure_policy = "fail-fast"
/// check_exit_status = true
/// tool_timeout_secs = 120
/// exec_timeout_secs = 10
///
/// [toolchain]
/// compiler = ["java", "-cp", "bin", "com.wolfesoftware.dorp.Main"]
/// assembler = "llc"
/// linker = "gcc"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub precondition_dir: Option<PathBuf>,
    pub runtime_source: Option<PathBuf>,
    pub test_dir: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub failure_policy: Option<FailurePolicy>,
    pub check_exit_status: Option<bool>,
    pub tool_timeout_secs: Option<u64>,
    pub exec_timeout_secs: Option<u64>,
    #[serde(default)]
    pub toolchain: FileToolchain,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileToolchain {
    pub compiler: Option<Vec<String>>,
    pub assembler: Option<String>,
    pub linker: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = fs::read_to_string(path)
            .map_err(|e| HarnessError::io(format!("cannot read config file {}", path.display()), e))?;
        Self::parse(&text, path)
    }

    /// Parse TOML text; `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, HarnessError> {
        let parsed: FileConfig = toml::from_str(text).map_err(|e| HarnessError::Config {
            path: origin.to_path_buf(),
            message: e.message().to_string(),
        })?;
        if parsed.toolchain.compiler.as_ref().is_some_and(Vec::is_empty) {
            return Err(HarnessError::Config {
                path: origin.to_path_buf(),
                message: "toolchain.compiler must name a program".to_string(),
            });
        }
        Ok(parsed)
    }

    /// Overlay the keys present in this file onto `base`.
    pub fn apply(self, mut base: HarnessConfig) -> HarnessConfig {
        if let Some(dir) = self.precondition_dir {
            base.precondition_dir = dir;
        }
        if let Some(path) = self.runtime_source {
            base.runtime_source = path;
        }
        if let Some(dir) = self.test_dir {
            base.test_dir = dir;
        }
        if let Some(dir) = self.scratch_dir {
            base.scratch_dir = dir;
        }
        if let Some(policy) = self.failure_policy {
            base.failure_policy = policy;
        }
        if let Some(check) = self.check_exit_status {
            base.exit_status_policy = if check {
                ExitStatusPolicy::RequireSuccess
            } else {
                ExitStatusPolicy::Ignore
            };
        }
        if let Some(secs) = self.tool_timeout_secs {
            base.tool_timeout = timeout_from_secs(secs);
        }
        if let Some(secs) = self.exec_timeout_secs {
            base.exec_timeout = timeout_from_secs(secs);
        }
        if let Some(compiler) = self.toolchain.compiler {
            base.toolchain = base.toolchain.with_compiler(compiler);
        }
        if let Some(assembler) = self.toolchain.assembler {
            base.toolchain.assembler = assembler;
        }
        if let Some(linker) = self.toolchain.linker {
            base.toolchain.linker = linker;
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_classic_layout() {
        let config = HarnessConfig::default();
        assert_eq!(config.precondition_dir, Path::new("bin"));
        assert_eq!(config.runtime_source, Path::new("lib/main.ll"));
        assert_eq!(config.test_dir, Path::new("test"));
        assert_eq!(config.scratch_dir, Path::new("test-tmp"));
        assert_eq!(config.toolchain.program(ToolRole::Compiler), "java");
        assert_eq!(
            config.toolchain.leading_args(ToolRole::Compiler),
            ["-cp", "bin", "com.wolfesoftware.dorp.Main"]
        );
        assert_eq!(config.toolchain.program(ToolRole::Assembler), "llc");
        assert_eq!(config.toolchain.program(ToolRole::Linker), "gcc");
        assert_eq!(config.failure_policy, FailurePolicy::RunToCompletion);
        assert_eq!(config.exit_status_policy, ExitStatusPolicy::Ignore);
    }

    #[test]
    fn test_empty_compiler_command_is_ignored() {
        let toolchain = ToolchainConfig::default().with_compiler(Vec::<String>::new());
        assert_eq!(toolchain.program(ToolRole::Compiler), "java");
    }

    #[test]
    fn test_file_config_overlays_defaults() {
        let text = r#"
test_dir = "suite"
failure_policy = "fail-fast"
check_exit_status = true
exec_timeout_secs = 0

[toolchain]
compiler = ["./dorpc"]
linker = "clang"
"#;
        let config = FileConfig::parse(text, Path::new("annotest.toml"))
            .unwrap()
            .apply(HarnessConfig::default());
        assert_eq!(config.test_dir, Path::new("suite"));
        assert_eq!(config.scratch_dir, Path::new("test-tmp"));
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.exit_status_policy, ExitStatusPolicy::RequireSuccess);
        assert_eq!(config.exec_timeout, None);
        assert_eq!(config.tool_timeout, Some(DEFAULT_TOOL_TIMEOUT));
        assert_eq!(config.toolchain.compiler, vec!["./dorpc".to_string()]);
        assert_eq!(config.toolchain.assembler, "llc");
        assert_eq!(config.toolchain.linker, "clang");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = FileConfig::parse("tset_dir = \"x\"", Path::new("annotest.toml")).unwrap_err();
        assert!(matches!(err, HarnessError::Config { .. }));
    }

    #[test]
    fn test_empty_compiler_in_file_is_rejected() {
        let err = FileConfig::parse("[toolchain]\ncompiler = []\n", Path::new("a.toml")).unwrap_err();
        assert!(err.to_string().contains("toolchain.compiler"));
    }

    #[test]
    fn test_timeout_zero_disables() {
        assert_eq!(timeout_from_secs(0), None);
        assert_eq!(timeout_from_secs(3), Some(Duration::from_secs(3)));
    }
}
