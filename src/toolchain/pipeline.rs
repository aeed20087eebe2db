//! Compile → assemble → link for a single test.
//!
//! Each stage starts exactly one external process and blocks until it exits. Any failure here is
//! fatal to the whole run: a broken compiler or toolchain is worth stopping for, unlike a test
//! whose output is merely wrong.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use annotest_core::PipelineArtifacts;

use super::process::{self, Invocation, ProcessOutput};
use super::ToolRole;
use crate::config::ToolchainConfig;
use crate::errors::HarnessError;

/// Drives the three toolchain stages with a shared configuration and time limit.
#[derive(Debug, Clone)]
pub struct CompilationPipeline {
    toolchain: ToolchainConfig,
    timeout: Option<Duration>,
}

impl CompilationPipeline {
    pub fn new(toolchain: ToolchainConfig, timeout: Option<Duration>) -> Self {
        Self { toolchain, timeout }
    }

    /// `<compiler...> <source> -o <ir>`
    #[tracing::instrument(skip_all, fields(source = %source.display()))]
    pub fn compile(&self, source: &Path, ir: &Path) -> Result<(), HarnessError> {
        let invocation = self.base(ToolRole::Compiler).path(source).arg("-o").path(ir);
        self.invoke(ToolRole::Compiler, &invocation, source)
    }

    /// `<assembler> <ir> -o <object>`
    #[tracing::instrument(skip_all, fields(ir = %ir.display()))]
    pub fn assemble(&self, ir: &Path, object: &Path) -> Result<(), HarnessError> {
        let invocation = self.base(ToolRole::Assembler).path(ir).arg("-o").path(object);
        self.invoke(ToolRole::Assembler, &invocation, ir)
    }

    /// `<linker> <runtime object> <object> -o <executable>`
    #[tracing::instrument(skip_all, fields(object = %object.display()))]
    pub fn link(&self, runtime_object: &Path, object: &Path, executable: &Path) -> Result<(), HarnessError> {
        let invocation = self
            .base(ToolRole::Linker)
            .path(runtime_object)
            .path(object)
            .arg("-o")
            .path(executable);
        self.invoke(ToolRole::Linker, &invocation, object)
    }

    /// Run all three stages for one test, leaving its artifacts in `scratch_dir`.
    pub fn build(
        &self,
        test_id: &str,
        source: &Path,
        runtime_object: &Path,
        scratch_dir: &Path,
    ) -> Result<PipelineArtifacts, HarnessError> {
        let artifacts = PipelineArtifacts::for_test(scratch_dir, test_id);
        self.compile(source, &artifacts.ir)?;
        self.assemble(&artifacts.ir, &artifacts.object)?;
        self.link(runtime_object, &artifacts.object, &artifacts.executable)?;
        Ok(artifacts)
    }

    /// Assemble `runtime_source` into `runtime_object`. Used once per run, before any test.
    pub fn assemble_runtime(&self, runtime_source: &Path, runtime_object: &Path) -> Result<PathBuf, HarnessError> {
        self.assemble(runtime_source, runtime_object)?;
        Ok(runtime_object.to_path_buf())
    }

    fn base(&self, role: ToolRole) -> Invocation {
        Invocation::new(self.toolchain.program(role)).args(self.toolchain.leading_args(role))
    }

    fn invoke(&self, role: ToolRole, invocation: &Invocation, subject: &Path) -> Result<(), HarnessError> {
        let output = process::run(invocation, self.timeout).map_err(|source| spawn_error(role, invocation, source))?;
        check_output(role, invocation, subject, &output, self.timeout)
    }
}

fn spawn_error(role: ToolRole, invocation: &Invocation, source: io::Error) -> HarnessError {
    let program = invocation.program().to_string();
    if source.kind() == io::ErrorKind::NotFound {
        HarnessError::ToolNotFound {
            role,
            program,
            hint: role.install_hint().to_string(),
            source,
        }
    } else {
        HarnessError::Spawn { program, source }
    }
}

fn check_output(
    role: ToolRole,
    invocation: &Invocation,
    subject: &Path,
    output: &ProcessOutput,
    timeout: Option<Duration>,
) -> Result<(), HarnessError> {
    if output.timed_out {
        return Err(HarnessError::ToolTimedOut {
            role,
            program: invocation.program().to_string(),
            subject: subject.display().to_string(),
            limit: timeout.unwrap_or_default(),
        });
    }
    if !output.status.success() {
        return Err(HarnessError::ToolFailed {
            role,
            program: invocation.program().to_string(),
            subject: subject.display().to_string(),
            status: process::describe_status(&output.status),
            stderr: output.stderr_lossy(),
        });
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn pipeline_with(compiler: &[&str], assembler: &str, linker: &str) -> CompilationPipeline {
        let toolchain = ToolchainConfig::default()
            .with_compiler(compiler.iter().copied())
            .with_assembler(assembler)
            .with_linker(linker);
        CompilationPipeline::new(toolchain, Some(Duration::from_secs(30)))
    }

    #[test]
    fn test_failing_compiler_reports_role_and_status() {
        // `sh -c 'exit 4' <source> -o <ir>`
        let pipeline = pipeline_with(&["sh", "-c", "echo bad input >&2; exit 4"], "true", "true");
        let err = pipeline
            .compile(Path::new("test/x.dorp"), Path::new("/nonexistent/x.ll"))
            .unwrap_err();
        match err {
            HarnessError::ToolFailed { role, status, stderr, subject, .. } => {
                assert_eq!(role, ToolRole::Compiler);
                assert_eq!(status, "exit status 4");
                assert_eq!(stderr, "bad input\n");
                assert_eq!(subject, "test/x.dorp");
            }
            other => panic!("expected ToolFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_build_stops_at_first_failing_stage() {
        let pipeline = pipeline_with(&["true"], "false", "annotest-linker-never-started");
        let err = pipeline
            .build("t", Path::new("test/t"), Path::new("rt.s"), Path::new("tmp"))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ToolFailed { role: ToolRole::Assembler, .. }));
    }

    #[test]
    fn test_build_returns_named_artifacts() {
        let pipeline = pipeline_with(&["true"], "true", "true");
        let artifacts = pipeline
            .build("t", Path::new("test/t"), Path::new("rt.s"), Path::new("tmp"))
            .unwrap();
        assert_eq!(artifacts, PipelineArtifacts::for_test(Path::new("tmp"), "t"));
    }

    #[test]
    fn test_missing_compiler_is_not_found_with_hint() {
        let pipeline = pipeline_with(&["annotest-no-compiler-xyz"], "true", "true");
        let err = pipeline.compile(Path::new("a"), Path::new("b")).unwrap_err();
        match err {
            HarnessError::ToolNotFound { role, program, hint, .. } => {
                assert_eq!(role, ToolRole::Compiler);
                assert_eq!(program, "annotest-no-compiler-xyz");
                assert_eq!(hint, "is a JDK installed?");
            }
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_unexecutable_compiler_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(&[dir.path().to_str().unwrap()], "true", "true");
        let err = pipeline.compile(Path::new("a"), Path::new("b")).unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
    }

    #[test]
    fn test_hung_tool_times_out() {
        let toolchain = ToolchainConfig::default().with_compiler(["sh", "-c", "exec sleep 10"]);
        let pipeline = CompilationPipeline::new(toolchain, Some(Duration::from_millis(100)));
        let err = pipeline.compile(Path::new("a"), Path::new("b")).unwrap_err();
        match err {
            HarnessError::ToolTimedOut { role, limit, .. } => {
                assert_eq!(role, ToolRole::Compiler);
                assert_eq!(limit, Duration::from_millis(100));
            }
            other => panic!("expected ToolTimedOut, got {other:?}"),
        }
    }
}
