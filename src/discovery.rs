//! Test discovery: the flat list of files in the test directory.
//!
//! A test's identity is its file name. There is no recursion and no pattern matching: every
//! regular file directly under the test directory is a test, and an explicit list of names on the
//! command line narrows the set by exact match.

use std::fs;
use std::path::{Path, PathBuf};

use annotest_core::{extract_expected_output, select_tests};

use crate::errors::HarnessError;

/// One test source, loaded and with its expectation derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// The file name, unique within the test directory.
    pub id: String,
    pub path: PathBuf,
    /// The source text as loaded, with invalid UTF-8 replaced. `expected` is derived from it.
    pub source: String,
    /// Exactly what the built program must print.
    pub expected: String,
}

impl TestCase {
    /// Build a test case from in-memory source.
    pub fn from_source(id: impl Into<String>, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: id.into(),
            path: path.into(),
            expected: extract_expected_output(&source),
            source,
        }
    }

    /// Read `test_dir/id` and derive its expectation.
    ///
    /// Bytes that are not UTF-8 are replaced with U+FFFD; the compiler still reads the file itself.
    pub fn load(test_dir: &Path, id: &str) -> Result<Self, HarnessError> {
        let path = test_dir.join(id);
        let bytes =
            fs::read(&path).map_err(|e| HarnessError::io(format!("cannot read test source {}", path.display()), e))?;
        Ok(Self::from_source(id, path, String::from_utf8_lossy(&bytes)))
    }
}

/// List every regular file directly under `test_dir`, sorted by name.
///
/// Subdirectories are skipped, as are names that are not valid UTF-8 (they cannot be named on the
/// command line or in a report).
pub fn discover_test_ids(test_dir: &Path) -> Result<Vec<String>, HarnessError> {
    let unreadable = |source| HarnessError::TestDirUnreadable {
        path: test_dir.to_path_buf(),
        source,
    };

    let mut ids = Vec::new();
    for entry in fs::read_dir(test_dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        // Follow symlinks: a linked test file is still a test.
        let is_file = fs::metadata(entry.path()).is_ok_and(|m| m.is_file());
        if !is_file {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => ids.push(name),
            Err(name) => tracing::warn!(name = ?name, "skipping test file with a non-UTF-8 name"),
        }
    }
    ids.sort();
    Ok(ids)
}

/// Discover tests and apply the optional exact-name allow-list.
///
/// An empty `filter` selects everything. A filter that matches nothing yields an empty, valid
/// working set.
pub fn discover(test_dir: &Path, filter: &[String]) -> Result<Vec<String>, HarnessError> {
    let discovered = discover_test_ids(test_dir)?;
    let total = discovered.len();
    let selected = select_tests(discovered, filter);
    tracing::info!(total, selected = selected.len(), dir = %test_dir.display(), "discovered tests");
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suite(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    #[test]
    fn test_discover_lists_files_sorted() {
        let dir = suite(&[("b.dorp", ""), ("a.dorp", ""), ("c", "")]);
        assert_eq!(discover(dir.path(), &[]).unwrap(), vec!["a.dorp", "b.dorp", "c"]);
    }

    #[test]
    fn test_discover_skips_subdirectories() {
        let dir = suite(&[("a.dorp", "")]);
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/inner.dorp"), "").unwrap();
        assert_eq!(discover(dir.path(), &[]).unwrap(), vec!["a.dorp"]);
    }

    #[test]
    fn test_discover_applies_exact_filter() {
        let dir = suite(&[("hello.dorp", ""), ("loops.dorp", "")]);
        let filter = vec!["loops.dorp".to_string(), "missing.dorp".to_string()];
        assert_eq!(discover(dir.path(), &filter).unwrap(), vec!["loops.dorp"]);
    }

    #[test]
    fn test_discover_filter_matching_nothing_is_empty() {
        let dir = suite(&[("hello.dorp", "")]);
        assert!(discover(dir.path(), &["hello".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("nope"), &[]).unwrap_err();
        assert!(matches!(err, HarnessError::TestDirUnreadable { .. }));
    }

    #[test]
    fn test_load_derives_expectation() {
        let dir = suite(&[("hello.dorp", "print(\"hello\") # hello\n")]);
        let case = TestCase::load(dir.path(), "hello.dorp").unwrap();
        assert_eq!(case.id, "hello.dorp");
        assert_eq!(case.expected, "hello\n");
        assert_eq!(case.path, dir.path().join("hello.dorp"));
    }

    #[test]
    fn test_load_accepts_non_utf8_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("latin1.dorp"), b"print(\"caf\xe9\") # ok\n").unwrap();
        let case = TestCase::load(dir.path(), "latin1.dorp").unwrap();
        assert_eq!(case.source, "print(\"caf\u{fffd}\") # ok\n");
        assert_eq!(case.expected, "ok\n");
    }

    #[test]
    fn test_load_missing_source_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TestCase::load(dir.path(), "gone.dorp").unwrap_err();
        assert!(matches!(err, HarnessError::Io { .. }));
    }
}
