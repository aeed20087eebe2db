//! Deterministic scratch-file naming for the per-test pipeline.
//!
//! Every test produces three files in the scratch directory, each named `<test id><suffix>`.
//! Test ids are distinct entries of one flat directory and the suffixes are fixed and distinct,
//! so two tests can never write the same artifact. The shared runtime object lives one level down,
//! in a directory no test id can name a file inside.

use std::path::{Path, PathBuf};

/// Fixed suffixes of the pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSuffix {
    /// Compiler output (LLVM IR).
    Ir,
    /// Assembler output.
    Object,
    /// Linker output.
    Executable,
}

impl ArtifactSuffix {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactSuffix::Ir => ".ll",
            ArtifactSuffix::Object => ".s",
            ArtifactSuffix::Executable => ".exe",
        }
    }
}

/// Subdirectory of the scratch directory holding the shared runtime object.
pub const RUNTIME_DIR_NAME: &str = "runtime";
/// File name of the shared runtime object built once per run.
pub const RUNTIME_OBJECT_NAME: &str = "main.s";

/// The per-test triple of artifact locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineArtifacts {
    pub ir: PathBuf,
    pub object: PathBuf,
    pub executable: PathBuf,
}

impl PipelineArtifacts {
    /// Name the artifacts of `test_id` inside `scratch_dir`.
    ///
    /// ## Examples
    /// ```rust
    /// use std::path::Path;
    /// use annotest_core::PipelineArtifacts;
    ///
    /// let a = PipelineArtifacts::for_test(Path::new("test-tmp"), "hello.dorp");
    /// assert_eq!(a.ir, Path::new("test-tmp/hello.dorp.ll"));
    /// assert_eq!(a.object, Path::new("test-tmp/hello.dorp.s"));
    /// assert_eq!(a.executable, Path::new("test-tmp/hello.dorp.exe"));
    /// ```
    pub fn for_test(scratch_dir: &Path, test_id: &str) -> Self {
        let named = |suffix: ArtifactSuffix| scratch_dir.join(format!("{}{}", test_id, suffix.as_str()));
        Self {
            ir: named(ArtifactSuffix::Ir),
            object: named(ArtifactSuffix::Object),
            executable: named(ArtifactSuffix::Executable),
        }
    }

    /// All three paths, in pipeline order.
    pub fn paths(&self) -> [&Path; 3] {
        [&self.ir, &self.object, &self.executable]
    }
}

/// Location of the shared runtime object inside `scratch_dir`.
pub fn runtime_object_path(scratch_dir: &Path) -> PathBuf {
    scratch_dir.join(RUNTIME_DIR_NAME).join(RUNTIME_OBJECT_NAME)
}
