//! Text Comparison
//!
//! In-process replacements for the `diff`/`head`/`tail`/`wc` pipelines a
//! conformance check would otherwise shell out to. Lines are compared one to
//! one after the selected normalization:
//!
//! - `ignore_whitespace`: a line is reduced to its whitespace-separated tokens
//!   joined by a single space, so padding, tabs and run lengths never matter.
//! - `ignore_blank_lines`: lines that are empty (after whitespace
//!   normalization, if enabled) are dropped from both sides.
//! - `expected_as_patterns`: every expected line is an anchored regular
//!   expression the matching actual line must satisfy.
//!
//! With no normalization at all the comparison is byte for byte, like plain
//! `diff`: a carriage return or a missing final newline is a difference.

use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalization {
    pub ignore_whitespace: bool,
    pub ignore_blank_lines: bool,
    pub expected_as_patterns: bool,
}

impl Normalization {
    pub const VERBATIM: Self = Self {
        ignore_whitespace: false,
        ignore_blank_lines: false,
        expected_as_patterns: false,
    };

    pub const IGNORE_BLANK_LINES: Self = Self {
        ignore_whitespace: false,
        ignore_blank_lines: true,
        expected_as_patterns: false,
    };

    pub const IGNORE_WHITESPACE: Self = Self {
        ignore_whitespace: true,
        ignore_blank_lines: true,
        expected_as_patterns: false,
    };

    pub const PATTERNS: Self = Self {
        ignore_whitespace: true,
        ignore_blank_lines: true,
        expected_as_patterns: true,
    };

    /// `diff` flags for the whitespace and blank-line rules. Pattern matching
    /// has no `diff` equivalent and is left to the caller to describe.
    pub fn diff_flags(&self) -> String {
        let mut flags = Vec::new();
        if self.ignore_whitespace {
            flags.push("-w");
        }
        if self.ignore_blank_lines {
            flags.push("-B");
        }
        flags.join(" ")
    }

    fn normalize<'a>(&self, line: &'a str) -> std::borrow::Cow<'a, str> {
        if self.ignore_whitespace {
            std::borrow::Cow::Owned(line.split_whitespace().collect::<Vec<_>>().join(" "))
        } else {
            std::borrow::Cow::Borrowed(line)
        }
    }
}

/// First point where two texts diverge. Line numbers are 1-based positions in
/// the original (unfiltered) inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub actual_line: Option<usize>,
    pub expected_line: Option<usize>,
    pub actual: Option<String>,
    pub expected: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.actual, &self.expected) {
            (Some(a), Some(e)) => write!(
                f,
                "line {} differs: actual {:?}, expected {:?} (expected line {})",
                self.actual_line.unwrap_or(0),
                a,
                e,
                self.expected_line.unwrap_or(0)
            ),
            (Some(a), None) => write!(
                f,
                "unexpected extra line {}: {:?}",
                self.actual_line.unwrap_or(0),
                a
            ),
            (None, Some(e)) => write!(
                f,
                "missing expected line {}: {:?}",
                self.expected_line.unwrap_or(0),
                e
            ),
            (None, None) => write!(f, "texts differ"),
        }
    }
}

/// Compare `actual` against `expected` under `norm`.
pub fn compare_text(actual: &str, expected: &str, norm: Normalization) -> Result<(), Mismatch> {
    let (actual_lines, expected_lines) = if norm == Normalization::VERBATIM {
        (raw_lines(actual), raw_lines(expected))
    } else {
        (significant_lines(actual, norm), significant_lines(expected, norm))
    };

    let mut actual_iter = actual_lines.into_iter();
    let mut expected_iter = expected_lines.into_iter();
    loop {
        match (actual_iter.next(), expected_iter.next()) {
            (None, None) => return Ok(()),
            (Some((ai, a)), Some((ei, e))) => {
                if !line_matches(&a, &e, norm) {
                    return Err(Mismatch {
                        actual_line: Some(ai),
                        expected_line: Some(ei),
                        actual: Some(a),
                        expected: Some(e),
                    });
                }
            }
            (Some((ai, a)), None) => {
                return Err(Mismatch {
                    actual_line: Some(ai),
                    expected_line: None,
                    actual: Some(a),
                    expected: None,
                });
            }
            (None, Some((ei, e))) => {
                return Err(Mismatch {
                    actual_line: None,
                    expected_line: Some(ei),
                    actual: None,
                    expected: Some(e),
                });
            }
        }
    }
}

/// Lines with their terminators kept, so `\r` and a missing final newline
/// still take part in the comparison.
fn raw_lines(text: &str) -> Vec<(usize, String)> {
    text.split_inclusive('\n')
        .enumerate()
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}

fn significant_lines(text: &str, norm: Normalization) -> Vec<(usize, String)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, norm.normalize(line).into_owned()))
        .filter(|(_, line)| !(norm.ignore_blank_lines && line.is_empty()))
        .collect()
}

fn line_matches(actual: &str, expected: &str, norm: Normalization) -> bool {
    if !norm.expected_as_patterns {
        return actual == expected;
    }
    // Literal equality always matches, even when the pattern does not compile
    if actual == expected {
        return true;
    }
    match Regex::new(&format!("^(?:{})$", expected)) {
        Ok(re) => re.is_match(actual),
        Err(_) => false,
    }
}

/// Number of newline characters, which is what `wc -l` reports. A trailing
/// line without its newline is not counted.
pub fn count_lines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// The first `n` lines of `text` exactly as stored, like `head -n`.
pub fn first_lines(text: &str, n: usize) -> String {
    text.split_inclusive('\n').take(n).collect()
}

/// Everything after the first `n` lines.
pub fn skip_lines(text: &str, n: usize) -> String {
    text.lines().skip(n).fold(String::new(), |mut out, line| {
        out.push_str(line);
        out.push('\n');
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbatim_requires_exact_lines() {
        assert!(compare_text("2\n3\n5\n", "2\n3\n5\n", Normalization::VERBATIM).is_ok());

        let err = compare_text("2\n3\n 5\n", "2\n3\n5\n", Normalization::VERBATIM).unwrap_err();
        assert_eq!(err.actual_line, Some(3));
        assert_eq!(err.actual.as_deref(), Some(" 5\n"));
        assert_eq!(err.expected.as_deref(), Some("5\n"));
    }

    #[test]
    fn test_verbatim_sees_line_terminators() {
        let err = compare_text("2\r\n3\r\n", "2\n3\n", Normalization::VERBATIM).unwrap_err();
        assert_eq!(err.actual_line, Some(1));
        assert_eq!(err.actual.as_deref(), Some("2\r\n"));

        let err = compare_text("2\n3", "2\n3\n", Normalization::VERBATIM).unwrap_err();
        assert_eq!(err.actual.as_deref(), Some("3"));
        assert_eq!(err.expected.as_deref(), Some("3\n"));

        // normalized modes still read lines the lenient way
        assert!(compare_text("a\r\nb", "a\nb\n", Normalization::IGNORE_WHITESPACE).is_ok());
    }

    #[test]
    fn test_ignore_whitespace_and_blank_lines() {
        let worker = "rows=2\ncols=2\n\n   1    2 \n  30    4 \n\n";
        let golden = "rows=2\ncols=2\n\n1 2\n30 4\n";
        assert!(compare_text(worker, golden, Normalization::IGNORE_WHITESPACE).is_ok());
        assert!(compare_text(worker, golden, Normalization::IGNORE_BLANK_LINES).is_err());
    }

    #[test]
    fn test_whitespace_still_separates_tokens() {
        let err = compare_text("12 3\n", "1 23\n", Normalization::IGNORE_WHITESPACE).unwrap_err();
        assert_eq!(err.actual.as_deref(), Some("12 3"));
    }

    #[test]
    fn test_blank_lines_ignored_only_when_requested() {
        let actual = "Source Node: 0\n\nA\n\n\nB\n";
        let expected = "Source Node: 0\nA\nB\n";
        assert!(compare_text(actual, expected, Normalization::IGNORE_BLANK_LINES).is_ok());
        assert!(compare_text(actual, expected, Normalization::VERBATIM).is_err());
    }

    #[test]
    fn test_length_mismatch_reported() {
        let err = compare_text("a\nb\n", "a\n", Normalization::VERBATIM).unwrap_err();
        assert_eq!(err.actual.as_deref(), Some("b\n"));
        assert_eq!(err.expected, None);

        let err = compare_text("a\n", "a\nb\n", Normalization::VERBATIM).unwrap_err();
        assert_eq!(err.expected_line, Some(2));
        assert!(err.to_string().contains("missing expected line 2"));
    }

    #[test]
    fn test_expected_lines_as_patterns() {
        let actual = "0     :     \t0\t4\t2147483647\n";
        let expected = "0 : 0 4 (2147483647|inf(inity)?)\n";
        assert!(compare_text(actual, expected, Normalization::PATTERNS).is_ok());

        let wrong = "0     :     \t0\t5\t2147483647\n";
        assert!(compare_text(wrong, expected, Normalization::PATTERNS).is_err());
    }

    #[test]
    fn test_patterns_are_anchored() {
        assert!(compare_text("10 20\n", "0 2\n", Normalization::PATTERNS).is_err());
        assert!(compare_text("10 20\n", "[0-9]+ [0-9]+\n", Normalization::PATTERNS).is_ok());
    }

    #[test]
    fn test_invalid_pattern_falls_back_to_literal() {
        assert!(compare_text("a(b\n", "a(b\n", Normalization::PATTERNS).is_ok());
        assert!(compare_text("ab\n", "a(b\n", Normalization::PATTERNS).is_err());
    }

    #[test]
    fn test_line_helpers() {
        let text = "h1\nh2\nbody1\nbody2\n";
        assert_eq!(count_lines(text), 4);
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("2\n3\n5"), 2);
        assert_eq!(first_lines(text, 2), "h1\nh2\n");
        assert_eq!(first_lines("a\r\nb\r\nc\r\n", 2), "a\r\nb\r\n");
        assert_eq!(first_lines("a\nb", 5), "a\nb");
        assert_eq!(first_lines(text, 10), text);
        assert_eq!(skip_lines(text, 2), "body1\nbody2\n");
        assert_eq!(skip_lines(text, 9), "");
    }

    #[test]
    fn test_diff_flags() {
        assert_eq!(Normalization::IGNORE_WHITESPACE.diff_flags(), "-w -B");
        assert_eq!(Normalization::IGNORE_BLANK_LINES.diff_flags(), "-B");
        assert_eq!(Normalization::VERBATIM.diff_flags(), "");
        assert_eq!(Normalization::PATTERNS.diff_flags(), "-w -B");
    }
}
