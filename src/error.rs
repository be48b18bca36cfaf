use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a harness run.
///
/// Artifact mismatches are not errors: they are recorded as failing
/// [`VerificationOutcome`](crate::verify::VerificationOutcome)s.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Build step `{step}` failed: {reason}")]
    Build { step: String, reason: String },

    #[error("Failed to spawn worker {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fixture error at {}: {reason}", path.display())]
    Fixture { path: PathBuf, reason: String },

    #[error("Discovery error in {}: {reason}", path.display())]
    Discovery { path: PathBuf, reason: String },
}
