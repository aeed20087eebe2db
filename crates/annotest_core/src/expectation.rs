//! Extract the expected stdout of a test program from its inline annotations.
//!
//! A test source documents its own output: every line that contains the annotation marker `# `
//! contributes the text after the marker, plus a newline, to the expected output. The marker is
//! the compiled language's own comment syntax, so annotations sit next to the code that prints.
//!
//! ## Notes
//!
//! - Matching is not anchored: `print 1 # 1` is an annotation.
//! - Only the first marker on a line counts; the rest of the line (including later `# `) is text.
//! - Lines are split on `\n` only. A `\r` before the newline stays in the captured text.

use std::sync::LazyLock;

use regex::Regex;

/// The token that starts an annotation.
pub const ANNOTATION_MARKER: &str = "# ";

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    // `.` never matches `\n`, so each capture stops at the end of its line.
    Regex::new(&format!("{}(.*)", regex::escape(ANNOTATION_MARKER)))
        .expect("INVARIANT: annotation pattern is a valid regex")
});

/// Compute the exact output a test program is expected to print.
///
/// ## Parameters
/// - `source`: the full text of the test source file.
///
/// ## Returns
/// - (`String`): each annotation's text followed by `\n`, in source order; empty when the source
///   has no annotations.
///
/// ## Examples
/// ```rust
/// use annotest_core::extract_expected_output;
///
/// let source = "print 1 # 1\nlet x = 2\nprint x # 2\n";
/// assert_eq!(extract_expected_output(source), "1\n2\n");
/// assert_eq!(extract_expected_output("print 3\n"), "");
/// ```
pub fn extract_expected_output(source: &str) -> String {
    annotations(source).fold(String::new(), |mut out, text| {
        out.push_str(text);
        out.push('\n');
        out
    })
}

/// Iterate over the raw annotation texts of a source, in order.
pub fn annotations(source: &str) -> impl Iterator<Item = &str> {
    ANNOTATION_RE
        .captures_iter(source)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_annotation() {
        let source = "def main():\n  print(\"hello\") # hello\n";
        assert_eq!(extract_expected_output(source), "hello\n");
    }

    #[test]
    fn test_no_annotations_is_empty() {
        assert_eq!(extract_expected_output("def main():\n  pass\n"), "");
        assert_eq!(extract_expected_output(""), "");
    }

    #[test]
    fn test_interleaved_code_lines_are_ignored() {
        let source = "# 1\nx = 1\ny = 2\n\n# 2\nz = 3\n";
        assert_eq!(extract_expected_output(source), "1\n2\n");
    }

    #[test]
    fn test_marker_not_anchored_to_line_start() {
        assert_eq!(extract_expected_output("print(42)   # 42"), "42\n");
    }

    #[test]
    fn test_hash_without_space_is_not_a_marker() {
        assert_eq!(extract_expected_output("#comment\nx = 1 #2\n"), "");
    }

    #[test]
    fn test_first_marker_wins_and_rest_is_verbatim() {
        assert_eq!(extract_expected_output("# a # b"), "a # b\n");
    }

    #[test]
    fn test_text_is_verbatim_including_spaces() {
        assert_eq!(extract_expected_output("#   padded  "), "  padded  \n");
        assert_eq!(extract_expected_output("# "), "\n");
    }

    #[test]
    fn test_carriage_return_is_kept() {
        assert_eq!(extract_expected_output("# crlf\r\n"), "crlf\r\n");
    }

    #[test]
    fn test_case_sensitive_text() {
        assert_eq!(extract_expected_output("# Hello\n# HELLO\n"), "Hello\nHELLO\n");
    }

    #[test]
    fn test_annotations_iterator_order() {
        let found: Vec<_> = annotations("# x\nfoo\n# y\n").collect();
        assert_eq!(found, vec!["x", "y"]);
    }
}
