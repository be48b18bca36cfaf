use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{Domain, Scenario, file_name};
use crate::compare::Normalization;
use crate::error::HarnessError;
use crate::matrix::FixturePaths;
use crate::protocol::CommandLine;
use crate::verify::{VerificationOutcome, check_files};

const PLUGIN: &str = "matrix";

/// One product run: inputs A and B, golden C, and where the worker writes C.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCase {
    pub fixture: FixturePaths,
    pub output: PathBuf,
}

impl MatrixCase {
    pub fn new(fixture: FixturePaths, scratch_dir: &Path) -> Self {
        let output = scratch_dir.join(format!("{}C.txt", fixture.name));
        Self { fixture, output }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatrixScenario {
    cases: Vec<MatrixCase>,
    /// Golden C files whose A/B inputs are missing; reported as failures
    orphans: Vec<PathBuf>,
}

impl MatrixScenario {
    pub fn new(cases: Vec<MatrixCase>) -> Self {
        Self {
            cases,
            orphans: Vec::new(),
        }
    }

    /// Every `*C.txt` under `data_dir` is a golden product; its inputs are the
    /// sibling `*A.txt` and `*B.txt`. Cases are ordered by name.
    pub fn discover(data_dir: &Path, scratch_dir: &Path) -> Result<Self, HarnessError> {
        let entries = fs::read_dir(data_dir).map_err(|e| HarnessError::Discovery {
            path: data_dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file = entry.file_name().to_string_lossy().into_owned();
            if let Some(name) = file.strip_suffix("C.txt") {
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        let mut scenario = Self::default();
        for name in names {
            let fixture = FixturePaths::from_name(data_dir, name);
            if fixture.a.is_file() && fixture.b.is_file() {
                debug!(case = %fixture.name, "discovered matrix fixture");
                scenario.cases.push(MatrixCase::new(fixture, scratch_dir));
            } else {
                warn!(golden = %fixture.c.display(), "matrix fixture is missing its inputs");
                scenario.orphans.push(fixture.c);
            }
        }

        Ok(scenario)
    }

    pub fn cases(&self) -> &[MatrixCase] {
        &self.cases
    }
}

impl Scenario for MatrixScenario {
    fn domain(&self) -> Domain {
        Domain::Matrix
    }

    fn case_count(&self) -> usize {
        self.cases.len()
    }

    fn encode(&self) -> Vec<CommandLine> {
        // Echoing huge matrices to stdout only slows the worker down
        let mut lines = vec![CommandLine::set(PLUGIN, "displayResult", 0)];
        for case in &self.cases {
            lines.push(CommandLine::set_path(PLUGIN, "inputFileMatrixA", &case.fixture.a));
            lines.push(CommandLine::set_path(PLUGIN, "inputFileMatrixB", &case.fixture.b));
            lines.push(CommandLine::set_path(PLUGIN, "OutputFileMatrixC", &case.output));
            lines.push(CommandLine::run(PLUGIN));
        }
        lines
    }

    fn verify(&self) -> Vec<VerificationOutcome> {
        let mut outcomes: Vec<VerificationOutcome> = self
            .orphans
            .iter()
            .map(|golden| {
                VerificationOutcome::missing(
                    Domain::Matrix,
                    file_name(golden),
                    format!("test -f <inputs of {}>", golden.display()),
                    "golden product has no matching A/B input files",
                )
            })
            .collect();

        for case in &self.cases {
            outcomes.push(check_files(
                Domain::Matrix,
                &file_name(&case.fixture.c),
                &case.output,
                &case.fixture.c,
                Normalization::IGNORE_WHITESPACE,
            ));
        }
        outcomes
    }
}
