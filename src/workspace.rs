//! Scratch workspace preparation.
//!
//! The scratch directory is wiped and recreated at the start of every run so no artifact from a
//! previous invocation can leak into this one. The shared runtime object is then assembled into it
//! once, before any test is linked.

use std::fs;
use std::path::{Component, Path, PathBuf};

use annotest_core::runtime_object_path;

use crate::errors::HarnessError;
use crate::toolchain::CompilationPipeline;

/// Fail unless the precondition directory (the compiled compiler driver) exists.
pub fn check_precondition(dir: &Path) -> Result<(), HarnessError> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(HarnessError::PreconditionMissing { path: dir.to_path_buf() })
    }
}

/// Delete `scratch_dir` if present, then recreate it empty.
///
/// ## Errors
///
/// - [`HarnessError::UnsafeScratchDir`] when the path does not end in a plain directory name
///   (`""`, `.`, `/`, `..`); wiping those would destroy the working tree.
/// - [`HarnessError::Io`] when removal or creation fails.
pub fn reset(scratch_dir: &Path) -> Result<(), HarnessError> {
    validate_scratch_dir(scratch_dir)?;

    if scratch_dir.exists() {
        tracing::debug!(dir = %scratch_dir.display(), "removing previous scratch directory");
        fs::remove_dir_all(scratch_dir)
            .map_err(|e| HarnessError::io(format!("cannot remove {}", scratch_dir.display()), e))?;
    }
    fs::create_dir_all(scratch_dir)
        .map_err(|e| HarnessError::io(format!("cannot create {}", scratch_dir.display()), e))?;
    Ok(())
}

/// Assemble the runtime IR into the scratch directory and return the object's path.
///
/// Blocks until the assembler exits; a failure here is a toolchain failure and aborts the run.
#[tracing::instrument(skip_all, fields(runtime = %runtime_source.display()))]
pub fn build_runtime(
    pipeline: &CompilationPipeline,
    runtime_source: &Path,
    scratch_dir: &Path,
) -> Result<PathBuf, HarnessError> {
    let object = runtime_object_path(scratch_dir);
    if let Some(parent) = object.parent() {
        fs::create_dir_all(parent).map_err(|e| HarnessError::io(format!("cannot create {}", parent.display()), e))?;
    }
    let object = pipeline.assemble_runtime(runtime_source, &object)?;
    tracing::info!(object = %object.display(), "runtime assembled");
    Ok(object)
}

fn validate_scratch_dir(scratch_dir: &Path) -> Result<(), HarnessError> {
    // The last component must name a directory entry: rules out "", ".", "/", ".." and "x/..".
    if matches!(scratch_dir.components().next_back(), Some(Component::Normal(_))) {
        Ok(())
    } else {
        Err(HarnessError::UnsafeScratchDir {
            path: scratch_dir.to_path_buf(),
        })
    }
}
