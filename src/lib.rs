//! Worker Conformance Harness
//!
//! Drives an external, plugin-driven command processor ("the worker") through a
//! scripted line protocol and verifies the files it produces against golden
//! artifacts.
//!
//! # Modules
//!
//! - [`config`] - YAML configuration (paths, limits, worker, policy)
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - Harness error taxonomy
//! - [`protocol`] - Worker command lines (`load`, `set`, `run`, ...)
//! - [`matrix`] - Matrix file format and golden fixture generator
//! - [`compare`] - In-process text comparison with diff-style normalization
//! - [`verify`] - Verification outcomes and the aggregated report
//! - [`scenario`] - One module per test domain (matrix, prime, graph)
//! - [`session`] - Worker process lifecycle with a concurrent output drain
//! - [`build_step`] - External build collaborator
//! - [`runner`] - Orchestrates build, session, scenarios and verification

pub mod build_step;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod matrix;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod verify;

// Convenient re-exports at crate root
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use matrix::{Matrix, MatrixError};
pub use protocol::CommandLine;
pub use runner::{RunSummary, run};
pub use scenario::{Domain, Scenario};
pub use session::{SessionOutcome, WorkerSession};
pub use verify::{FailureCounter, VerificationOutcome, VerificationReport};
