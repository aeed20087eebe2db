//! Rendering of a failed comparison.
//!
//! Both values are printed with Rust's escaped, quoted `Debug` form so that differences in
//! whitespace, trailing newlines or control characters are visible in the report.

use std::fmt;

/// Why a test's observed behavior did not match its annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub test_id: String,
    pub expected: String,
    pub actual: String,
    /// Set when the program's exit status was part of the verdict and was not success.
    pub exit_code: Option<i32>,
    /// Set when the program was killed after exceeding its time limit.
    pub timed_out: bool,
}

impl Mismatch {
    pub fn output(test_id: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            expected: expected.into(),
            actual: actual.into(),
            exit_code: None,
            timed_out: false,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FAIL: {}", self.test_id)?;
        writeln!(f, "expected: {:?}", self.expected)?;
        write!(f, "actual:   {:?}", self.actual)?;
        if self.timed_out {
            write!(f, "\nnote:     killed after exceeding the time limit")?;
        } else if let Some(code) = self.exit_code {
            write!(f, "\nnote:     exited with status {}", code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_escapes_newlines() {
        let m = Mismatch::output("greet", "hello\n", "hola\n");
        assert_eq!(
            m.to_string(),
            "FAIL: greet\nexpected: \"hello\\n\"\nactual:   \"hola\\n\""
        );
    }

    #[test]
    fn test_render_shows_whitespace_only_difference() {
        let m = Mismatch::output("ws", "a\n", "a \n");
        let text = m.to_string();
        assert!(text.contains("expected: \"a\\n\""));
        assert!(text.contains("actual:   \"a \\n\""));
    }

    #[test]
    fn test_render_exit_code_note() {
        let mut m = Mismatch::output("crash", "ok\n", "ok\n");
        m.exit_code = Some(139);
        assert!(m.to_string().ends_with("note:     exited with status 139"));
    }

    #[test]
    fn test_render_timeout_note() {
        let mut m = Mismatch::output("hang", "", "");
        m.timed_out = true;
        assert!(m.to_string().contains("time limit"));
    }
}
