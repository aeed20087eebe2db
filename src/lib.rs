#![forbid(unsafe_code)]
//! annotest: end-to-end test harness for a compiler toolchain
//!
//! Each test source is compiled to IR, assembled, linked against a shared runtime object and run.
//! Its stdout must equal the text of the source's `# ` annotations, one line per annotation.
//! The pure pieces (expectation extraction, artifact naming, selection, mismatch rendering) live
//! in `annotest_core`; this crate drives the external tools.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module
//!   enforces `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents a harness bug (logic error), use
//!   `.expect("INVARIANT: reason")` with a clear explanation.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod execution;
pub mod report;
pub mod toolchain;
pub mod version;
pub mod workspace;

pub use config::{ExitStatusPolicy, FailurePolicy, HarnessConfig, ToolchainConfig};
pub use errors::HarnessError;
pub use report::{ConsoleReporter, Reporter, RunResult, TestReporter, TestSummary};
