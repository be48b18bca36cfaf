use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Domain, Scenario};
use crate::compare::{Normalization, skip_lines};
use crate::error::HarnessError;
use crate::protocol::CommandLine;
use crate::verify::{VerificationOutcome, check_text, diff_command, read_artifact};

const PLUGIN: &str = "graph";

/// Header lines the worker writes before the APSP cost table.
const APSP_HEADER_LINES: usize = 2;

/// One graph input and every artifact derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphCase {
    pub name: String,
    pub input: PathBuf,
    pub vertex_count: usize,
    /// Indexed by source vertex
    pub bfs_outputs: Vec<PathBuf>,
    pub sssp_outputs: Vec<PathBuf>,
    pub apsp_output: PathBuf,
    pub expected_bfs: PathBuf,
    pub expected_sssp: PathBuf,
    pub expected_apsp: PathBuf,
}

impl GraphCase {
    pub fn new(name: &str, data_dir: &Path, scratch_dir: &Path, vertex_count: usize) -> Self {
        let out = |suffix: String| scratch_dir.join(format!("{}{}.txt", name, suffix));
        Self {
            name: name.to_string(),
            input: data_dir.join(format!("{}.txt", name)),
            vertex_count,
            bfs_outputs: (0..vertex_count).map(|i| out(format!("BFS{}", i))).collect(),
            sssp_outputs: (0..vertex_count).map(|i| out(format!("SSSP{}", i))).collect(),
            apsp_output: out("APSP".to_string()),
            expected_bfs: data_dir.join(format!("{}ExpectedBFS.txt", name)),
            expected_sssp: data_dir.join(format!("{}ExpectedSSSP.txt", name)),
            expected_apsp: data_dir.join(format!("{}ExpectedAPSP.txt", name)),
        }
    }

    /// Read `<data_dir>/<name>.txt` and infer its vertex count.
    pub fn load(name: &str, data_dir: &Path, scratch_dir: &Path) -> Result<Self, HarnessError> {
        let input = data_dir.join(format!("{}.txt", name));
        let text = fs::read_to_string(&input).map_err(|e| HarnessError::Discovery {
            path: input.clone(),
            reason: e.to_string(),
        })?;
        let vertex_count = count_vertices(&text);
        debug!(graph = name, vertex_count, "loaded graph input");
        Ok(Self::new(name, data_dir, scratch_dir, vertex_count))
    }

    fn encode_into(&self, lines: &mut Vec<CommandLine>) {
        lines.push(CommandLine::set_path(PLUGIN, "inputFile", &self.input));
        lines.push(CommandLine::set(PLUGIN, "displayResult", 0));

        for source in 0..self.vertex_count {
            lines.push(CommandLine::set(PLUGIN, "sourceNode", source));
            lines.push(CommandLine::set_path(PLUGIN, "outputFile", &self.bfs_outputs[source]));
            lines.push(CommandLine::set(PLUGIN, "searchMode", "bfs"));
            lines.push(CommandLine::run(PLUGIN));

            // sourceNode is still set from the BFS case
            lines.push(CommandLine::set_path(PLUGIN, "outputFile", &self.sssp_outputs[source]));
            lines.push(CommandLine::set(PLUGIN, "searchMode", "sssp"));
            lines.push(CommandLine::run(PLUGIN));
        }

        lines.push(CommandLine::set_path(PLUGIN, "outputFile", &self.apsp_output));
        lines.push(CommandLine::set(PLUGIN, "searchMode", "apsp"));
        lines.push(CommandLine::run(PLUGIN));
    }

    /// Concatenate per-source outputs in vertex order and compare, ignoring
    /// blank lines, against one expected file.
    fn check_per_source(&self, mode: &str, outputs: &[PathBuf], expected: &Path) -> VerificationOutcome {
        let artifact = format!("{}_{}", self.name, mode.to_lowercase());
        let sources = if outputs.is_empty() {
            "/dev/null".to_string()
        } else {
            outputs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        let comparison = format!(
            "cat {} | {}",
            sources,
            diff_command(
                Normalization::IGNORE_BLANK_LINES,
                "-",
                &expected.display().to_string()
            )
        );

        let mut combined = String::new();
        for path in outputs {
            match read_artifact(path) {
                Ok(text) => {
                    combined.push_str(&text);
                    if !text.is_empty() && !text.ends_with('\n') {
                        combined.push('\n');
                    }
                }
                Err(reason) => {
                    return VerificationOutcome::missing(Domain::Graph, artifact, comparison, reason);
                }
            }
        }

        match read_artifact(expected) {
            Ok(expected_text) => check_text(
                Domain::Graph,
                &artifact,
                &comparison,
                &combined,
                &expected_text,
                Normalization::IGNORE_BLANK_LINES,
            ),
            Err(reason) => VerificationOutcome::missing(Domain::Graph, artifact, comparison, reason),
        }
    }

    fn check_apsp(&self) -> VerificationOutcome {
        let artifact = format!("{}_apsp", self.name);
        let comparison = format!(
            "tail -n +{} {} | {}  # each line of {} is an anchored regular expression",
            APSP_HEADER_LINES + 1,
            self.apsp_output.display(),
            diff_command(
                Normalization::PATTERNS,
                "-",
                &self.expected_apsp.display().to_string()
            ),
            self.expected_apsp.display()
        );

        let actual = match read_artifact(&self.apsp_output) {
            Ok(text) => skip_lines(&text, APSP_HEADER_LINES),
            Err(reason) => {
                return VerificationOutcome::missing(Domain::Graph, artifact, comparison, reason);
            }
        };
        match read_artifact(&self.expected_apsp) {
            Ok(expected) => check_text(
                Domain::Graph,
                &artifact,
                &comparison,
                &actual,
                &expected,
                Normalization::PATTERNS,
            ),
            Err(reason) => VerificationOutcome::missing(Domain::Graph, artifact, comparison, reason),
        }
    }
}

/// Vertex count of a graph input: its number of non-blank lines.
///
/// This assumes one record line per vertex. Comment or edge-only lines in a
/// future input format would be miscounted.
pub fn count_vertices(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

#[derive(Debug, Clone, Default)]
pub struct GraphScenario {
    cases: Vec<GraphCase>,
}

impl GraphScenario {
    pub fn new(cases: Vec<GraphCase>) -> Self {
        Self { cases }
    }

    pub fn load(data_dir: &Path, files: &[String], scratch_dir: &Path) -> Result<Self, HarnessError> {
        let cases = files
            .iter()
            .map(|name| GraphCase::load(name, data_dir, scratch_dir))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cases })
    }

    pub fn cases(&self) -> &[GraphCase] {
        &self.cases
    }
}

impl Scenario for GraphScenario {
    fn domain(&self) -> Domain {
        Domain::Graph
    }

    fn case_count(&self) -> usize {
        self.cases.len()
    }

    fn encode(&self) -> Vec<CommandLine> {
        let mut lines = Vec::new();
        for case in &self.cases {
            case.encode_into(&mut lines);
        }
        lines
    }

    fn verify(&self) -> Vec<VerificationOutcome> {
        let mut outcomes = Vec::with_capacity(self.cases.len() * 3);
        for case in &self.cases {
            outcomes.push(case.check_per_source("BFS", &case.bfs_outputs, &case.expected_bfs));
            outcomes.push(case.check_per_source("SSSP", &case.sssp_outputs, &case.expected_sssp));
            outcomes.push(case.check_apsp());
        }
        outcomes
    }
}
