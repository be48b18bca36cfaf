//! Verification outcomes and the aggregated report.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::compare::{Normalization, compare_text};
use crate::scenario::Domain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    /// Actual or golden artifact absent, unreadable, or empty when output was expected
    ArtifactMissing,
    /// Content differs under the domain's normalization
    ArtifactMismatch,
}

/// Result of checking one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    pub domain: Domain,
    pub artifact: String,
    pub verdict: Verdict,
    /// The comparison performed, in a form a human can re-run by hand
    pub comparison: String,
    pub detail: Option<String>,
}

impl VerificationOutcome {
    pub fn passed(domain: Domain, artifact: impl Into<String>, comparison: impl Into<String>) -> Self {
        Self {
            domain,
            artifact: artifact.into(),
            verdict: Verdict::Passed,
            comparison: comparison.into(),
            detail: None,
        }
    }

    pub fn missing(
        domain: Domain,
        artifact: impl Into<String>,
        comparison: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            artifact: artifact.into(),
            verdict: Verdict::ArtifactMissing,
            comparison: comparison.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn mismatch(
        domain: Domain,
        artifact: impl Into<String>,
        comparison: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            domain,
            artifact: artifact.into(),
            verdict: Verdict::ArtifactMismatch,
            comparison: comparison.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pass() {
            return write!(f, "✅ PASSED {} - {}", self.domain, self.artifact);
        }
        write!(f, "❌ FAILED {} - {}", self.domain, self.artifact)?;
        write!(f, "\n   failed comparison: {}", self.comparison)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n   {}", detail)?;
        }
        Ok(())
    }
}

/// Counts failing outcomes; owned by whoever aggregates the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FailureCounter {
    count: usize,
}

impl FailureCounter {
    pub fn record(&mut self, outcome: &VerificationOutcome) {
        if !outcome.is_pass() {
            self.count += 1;
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_zero(&self) -> bool {
        self.count == 0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub outcomes: Vec<VerificationOutcome>,
    pub failures: FailureCounter,
}

impl VerificationReport {
    pub fn push(&mut self, outcome: VerificationOutcome) {
        self.failures.record(&outcome);
        self.outcomes.push(outcome);
    }

    pub fn failure_count(&self) -> usize {
        self.failures.count()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_zero()
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_pass()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &VerificationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_pass())
    }
}

// ============================================================
// Shared check helpers for scenarios
// ============================================================

/// Read an artifact, mapping errors to a readable reason.
pub fn read_artifact(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

/// `diff [flags] <left> <right>`
pub fn diff_command(norm: Normalization, left: &str, right: &str) -> String {
    let flags = norm.diff_flags();
    if flags.is_empty() {
        format!("diff {} {}", left, right)
    } else {
        format!("diff {} {} {}", flags, left, right)
    }
}

/// Compare already-loaded texts and wrap the result as an outcome.
pub fn check_text(
    domain: Domain,
    artifact: &str,
    comparison: &str,
    actual: &str,
    expected: &str,
    norm: Normalization,
) -> VerificationOutcome {
    match compare_text(actual, expected, norm) {
        Ok(()) => VerificationOutcome::passed(domain, artifact, comparison),
        Err(mismatch) => {
            VerificationOutcome::mismatch(domain, artifact, comparison, mismatch.to_string())
        }
    }
}

/// Compare two files on disk. Missing files on either side fail.
pub fn check_files(
    domain: Domain,
    artifact: &str,
    actual: &Path,
    expected: &Path,
    norm: Normalization,
) -> VerificationOutcome {
    let comparison = diff_command(
        norm,
        &actual.display().to_string(),
        &expected.display().to_string(),
    );

    let actual_text = match read_artifact(actual) {
        Ok(text) => text,
        Err(reason) => return VerificationOutcome::missing(domain, artifact, comparison, reason),
    };
    let expected_text = match read_artifact(expected) {
        Ok(text) => text,
        Err(reason) => return VerificationOutcome::missing(domain, artifact, comparison, reason),
    };

    check_text(domain, artifact, &comparison, &actual_text, &expected_text, norm)
}
