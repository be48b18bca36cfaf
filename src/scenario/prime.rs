use std::path::{Path, PathBuf};

use super::{Domain, Scenario, file_name};
use crate::compare::{Normalization, count_lines, first_lines};
use crate::protocol::CommandLine;
use crate::verify::{VerificationOutcome, check_text, read_artifact};

const PLUGIN: &str = "prime";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeCase {
    pub limit: u64,
    pub output: PathBuf,
}

/// Prime enumeration up to each configured limit.
///
/// Every output must be exactly the first `n` lines of the canonical list,
/// where `n` is the output's own line count.
#[derive(Debug, Clone)]
pub struct PrimeScenario {
    cases: Vec<PrimeCase>,
    expected_file: PathBuf,
}

impl PrimeScenario {
    pub fn new(limits: &[u64], expected_file: &Path, scratch_dir: &Path) -> Self {
        let cases = limits
            .iter()
            .map(|&limit| PrimeCase {
                limit,
                output: scratch_dir.join(format!("primes_{}.txt", limit)),
            })
            .collect();
        Self {
            cases,
            expected_file: expected_file.to_path_buf(),
        }
    }

    pub fn cases(&self) -> &[PrimeCase] {
        &self.cases
    }

    fn check_case(&self, case: &PrimeCase, expected: &Result<String, String>) -> VerificationOutcome {
        let artifact = file_name(&case.output);

        let actual = match read_artifact(&case.output) {
            Ok(text) => text,
            Err(reason) => {
                let comparison = format!(
                    "head -n \"$(wc -l < {0})\" {1} | diff {0} -",
                    case.output.display(),
                    self.expected_file.display()
                );
                return VerificationOutcome::missing(Domain::Prime, artifact, comparison, reason);
            }
        };

        let n = count_lines(&actual);
        let comparison = format!(
            "head -n {} {} | diff {} -",
            n,
            self.expected_file.display(),
            case.output.display()
        );
        if actual.is_empty() {
            return VerificationOutcome::missing(
                Domain::Prime,
                artifact,
                comparison,
                format!("{} is empty", case.output.display()),
            );
        }

        // n counts newlines, so an unterminated last line is compared
        // against nothing and fails
        match expected {
            Ok(expected) => check_text(
                Domain::Prime,
                &artifact,
                &comparison,
                &actual,
                &first_lines(expected, n),
                Normalization::VERBATIM,
            ),
            Err(reason) => {
                VerificationOutcome::missing(Domain::Prime, artifact, comparison, reason.clone())
            }
        }
    }
}

impl Scenario for PrimeScenario {
    fn domain(&self) -> Domain {
        Domain::Prime
    }

    fn case_count(&self) -> usize {
        self.cases.len()
    }

    fn encode(&self) -> Vec<CommandLine> {
        let mut lines = Vec::with_capacity(self.cases.len() * 3);
        for case in &self.cases {
            lines.push(CommandLine::set_path(PLUGIN, "outputFile", &case.output));
            lines.push(CommandLine::set(PLUGIN, "limit", case.limit));
            lines.push(CommandLine::run(PLUGIN));
        }
        lines
    }

    fn verify(&self) -> Vec<VerificationOutcome> {
        let expected = read_artifact(&self.expected_file);
        self.cases
            .iter()
            .map(|case| self.check_case(case, &expected))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::Verdict;
    use std::fs;

    const EXPECTED: &str = "2\n3\n5\n7\n11\n13\n17\n19\n23\n29\n";

    fn setup() -> (tempfile::TempDir, PrimeScenario) {
        let dir = tempfile::tempdir().unwrap();
        let expected = dir.path().join("primesExpected.txt");
        fs::write(&expected, EXPECTED).unwrap();
        let scenario = PrimeScenario::new(&[10, 20], &expected, dir.path());
        (dir, scenario)
    }

    #[test]
    fn test_encode_order() {
        let scenario = PrimeScenario::new(&[101], Path::new("data/primesExpected.txt"), Path::new("tmp"));
        let wire: Vec<String> = scenario.encode().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            wire,
            vec![
                "set prime outputFile tmp/primes_101.txt",
                "set prime limit 101",
                "run prime",
            ]
        );
    }

    #[test]
    fn test_prefix_of_canonical_list_passes() {
        let (dir, scenario) = setup();
        fs::write(dir.path().join("primes_10.txt"), "2\n3\n5\n7\n").unwrap();
        fs::write(dir.path().join("primes_20.txt"), "2\n3\n5\n7\n11\n13\n17\n19\n").unwrap();

        let outcomes = scenario.verify();
        assert!(outcomes.iter().all(|o| o.is_pass()), "{:?}", outcomes);
        assert!(outcomes[0].comparison.starts_with("head -n 4 "));
    }

    #[test]
    fn test_reordered_or_wrong_output_fails() {
        let (dir, scenario) = setup();
        fs::write(dir.path().join("primes_10.txt"), "2\n5\n3\n7\n").unwrap();
        fs::write(dir.path().join("primes_20.txt"), "2\n3\n5\n7\n9\n").unwrap();

        let outcomes = scenario.verify();
        assert_eq!(outcomes[0].verdict, Verdict::ArtifactMismatch);
        assert_eq!(outcomes[1].verdict, Verdict::ArtifactMismatch);
    }

    #[test]
    fn test_output_longer_than_canonical_list_fails() {
        let (dir, scenario) = setup();
        let long = format!("{}31\n", EXPECTED);
        fs::write(dir.path().join("primes_10.txt"), long).unwrap();
        fs::write(dir.path().join("primes_20.txt"), "2\n").unwrap();

        let outcomes = scenario.verify();
        assert_eq!(outcomes[0].verdict, Verdict::ArtifactMismatch);
        assert!(outcomes[1].is_pass());
    }

    #[test]
    fn test_unterminated_last_line_fails() {
        let (dir, scenario) = setup();
        fs::write(dir.path().join("primes_10.txt"), "2\n3\n5").unwrap();
        fs::write(dir.path().join("primes_20.txt"), "2").unwrap();

        let outcomes = scenario.verify();
        assert_eq!(outcomes[0].verdict, Verdict::ArtifactMismatch);
        assert!(outcomes[0].comparison.starts_with("head -n 2 "));
        assert_eq!(outcomes[1].verdict, Verdict::ArtifactMismatch);
        assert!(outcomes[1].comparison.starts_with("head -n 0 "));
    }

    #[test]
    fn test_crlf_output_fails() {
        let (dir, scenario) = setup();
        fs::write(dir.path().join("primes_10.txt"), "2\r\n3\r\n5\r\n").unwrap();
        fs::write(dir.path().join("primes_20.txt"), "2\n3\n5\n").unwrap();

        let outcomes = scenario.verify();
        assert_eq!(outcomes[0].verdict, Verdict::ArtifactMismatch);
        assert!(outcomes[1].is_pass());
    }

    #[test]
    fn test_missing_output_comparison_is_runnable() {
        let scenario = PrimeScenario::new(&[7], Path::new("data/primesExpected.txt"), Path::new("/nonexistent"));
        let outcomes = scenario.verify();
        assert_eq!(
            outcomes[0].comparison,
            "head -n \"$(wc -l < /nonexistent/primes_7.txt)\" data/primesExpected.txt | diff /nonexistent/primes_7.txt -"
        );
    }

    #[test]
    fn test_missing_and_empty_outputs_fail() {
        let (dir, scenario) = setup();
        fs::write(dir.path().join("primes_20.txt"), "").unwrap();

        let outcomes = scenario.verify();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].verdict, Verdict::ArtifactMissing);
        assert_eq!(outcomes[1].verdict, Verdict::ArtifactMissing);
        assert!(outcomes[1].detail.as_deref().unwrap().ends_with("is empty"));
    }

    #[test]
    fn test_missing_canonical_list_fails_every_case() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("primes_10.txt"), "2\n").unwrap();
        let scenario = PrimeScenario::new(&[10], &dir.path().join("absent.txt"), dir.path());

        let outcomes = scenario.verify();
        assert_eq!(outcomes[0].verdict, Verdict::ArtifactMissing);
    }
}
