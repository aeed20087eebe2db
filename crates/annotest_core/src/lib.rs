//! Provide the pure, deterministic pieces of the annotest harness.
//!
//! Everything here is a function of its inputs: no filesystem access, no subprocesses, no global
//! mutable state. The harness crate wires these helpers to the real toolchain.
//!
//! ## Notes
//!
//! - [`expectation`]: turn a test source into the exact stdout it must produce.
//! - [`artifacts`]: deterministic, collision-free scratch file names per test.
//! - [`selection`]: exact-name allow-listing of discovered tests.
//! - [`mismatch`]: the escaped rendering used when actual and expected output differ.

pub mod artifacts;
pub mod expectation;
pub mod mismatch;
pub mod selection;

pub use artifacts::{ArtifactSuffix, PipelineArtifacts, runtime_object_path};
pub use expectation::{ANNOTATION_MARKER, extract_expected_output};
pub use mismatch::Mismatch;
pub use selection::select_tests;
