//! Test Scenarios
//!
//! A scenario is the full set of cases for one domain. It knows how to turn
//! its cases into protocol lines and how to check the artifacts they produce.
//! The session never sees scenarios, only the lines they encode, so a new
//! domain is one more module here.
//!
//! - [`matrix`] - dense matrix product against golden triples
//! - [`prime`] - prime enumeration as a prefix of a canonical list
//! - [`graph`] - BFS / SSSP per source vertex and APSP

pub mod graph;
pub mod matrix;
pub mod prime;

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::protocol::CommandLine;
use crate::verify::VerificationOutcome;

pub use graph::{GraphCase, GraphScenario};
pub use matrix::{MatrixCase, MatrixScenario};
pub use prime::{PrimeCase, PrimeScenario};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Matrix,
    Prime,
    Graph,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Matrix => write!(f, "MATRIX"),
            Domain::Prime => write!(f, "PRIMES"),
            Domain::Graph => write!(f, "GRAPHS"),
        }
    }
}

pub trait Scenario: Send + Sync {
    fn domain(&self) -> Domain;

    fn case_count(&self) -> usize;

    /// Protocol lines for every case, in run order. Never reads worker output.
    fn encode(&self) -> Vec<CommandLine>;

    /// Check every artifact. Called only after the session has closed.
    fn verify(&self) -> Vec<VerificationOutcome>;
}

/// Build the enabled scenarios in run order: matrix, prime, graph.
pub fn build_scenarios(config: &HarnessConfig) -> Result<Vec<Box<dyn Scenario>>, HarnessError> {
    let scratch = config.scratch_dir.as_path();
    let mut scenarios: Vec<Box<dyn Scenario>> = Vec::new();

    if config.matrix.enabled {
        scenarios.push(Box::new(MatrixScenario::discover(
            &config.matrix.data_dir,
            scratch,
        )?));
    }
    if config.prime.enabled {
        scenarios.push(Box::new(PrimeScenario::new(
            &config.prime.limits,
            &config.prime.expected_file,
            scratch,
        )));
    }
    if config.graph.enabled {
        scenarios.push(Box::new(GraphScenario::load(
            &config.graph.data_dir,
            &config.graph.files,
            scratch,
        )?));
    }

    Ok(scenarios)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
