//! Exact-name allow-listing of discovered tests.

/// Restrict `discovered` to the ids named in `filter`.
///
/// An empty `filter` means "everything". Otherwise only ids that appear verbatim in `filter` are
/// kept, in discovery order. Names in `filter` that match nothing are ignored, so the result may be
/// empty; that is a valid (if uneventful) working set.
///
/// ## Examples
/// ```rust
/// use annotest_core::select_tests;
///
/// let found = vec!["a".to_string(), "b".to_string(), "c".to_string()];
/// assert_eq!(select_tests(found.clone(), &[]), found);
/// assert_eq!(select_tests(found.clone(), &["c".to_string(), "a".to_string()]), vec!["a", "c"]);
/// assert!(select_tests(found, &["a*".to_string()]).is_empty());
/// ```
pub fn select_tests(discovered: Vec<String>, filter: &[String]) -> Vec<String> {
    if filter.is_empty() {
        return discovered;
    }
    discovered.into_iter().filter(|id| filter.contains(id)).collect()
}
