use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HarnessConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    pub worker: WorkerConfig,
    #[serde(default)]
    pub build: BuildConfig,
    /// Transient directory for actual outputs, cleared every run
    pub scratch_dir: PathBuf,
    #[serde(default)]
    pub matrix: MatrixDomainConfig,
    #[serde(default)]
    pub prime: PrimeDomainConfig,
    #[serde(default)]
    pub graph: GraphDomainConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkerConfig {
    pub executable: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    /// Plugin paths, one `load` line each, in this order
    pub plugins: Vec<PathBuf>,
    /// Plugin run once after loading to confirm the command loop is alive
    #[serde(default = "default_smoke_plugin")]
    pub smoke_plugin: String,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Keep the tail of the worker's stdout for diagnostics
    #[serde(default)]
    pub capture_output: bool,
    #[serde(default = "default_transcript_limit")]
    pub transcript_limit_bytes: usize,
}

fn default_smoke_plugin() -> String {
    "hello".to_string()
}

fn default_shutdown_timeout_ms() -> u64 {
    60_000
}

fn default_transcript_limit() -> usize {
    64 * 1024
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BuildConfig {
    pub enabled: bool,
    #[serde(default)]
    pub steps: Vec<BuildStepConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BuildStepConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatrixDomainConfig {
    pub enabled: bool,
    /// Holds `matrix<r>_<c>{A,B,C}.txt` triples
    pub data_dir: PathBuf,
}

impl Default for MatrixDomainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            data_dir: PathBuf::from("data/matrix"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrimeDomainConfig {
    pub enabled: bool,
    pub limits: Vec<u64>,
    /// Canonical ordered prime list; each run must produce a prefix of it
    pub expected_file: PathBuf,
}

impl Default for PrimeDomainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limits: Vec::new(),
            expected_file: PathBuf::from("data/primesExpected.txt"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GraphDomainConfig {
    pub enabled: bool,
    pub data_dir: PathBuf,
    /// Graph stems; `<stem>.txt` is the input, `<stem>Expected{BFS,SSSP,APSP}.txt` the goldens
    pub files: Vec<String>,
}

impl Default for GraphDomainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            data_dir: PathBuf::from("data/graph"),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PolicyConfig {
    /// Stop verifying at the first failing artifact
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub dump_transcript_on_failure: bool,
}

impl HarnessConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, HarnessError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> Result<Self, HarnessError> {
        let content = fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("failed to read {}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, HarnessError> {
        let config: HarnessConfig =
            serde_yaml::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), HarnessError> {
        if self.worker.shutdown_timeout_ms == 0 {
            return Err(HarnessError::Config(
                "worker.shutdown_timeout_ms must be positive".to_string(),
            ));
        }
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(HarnessError::Config("scratch_dir must be set".to_string()));
        }
        if self.graph.files.iter().any(|f| f.trim().is_empty()) {
            return Err(HarnessError::Config(
                "graph.files must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: "info"
log_dir: "./logs"
log_file: "harness.log"
use_json: false
rotation: "never"
enable_tracing: false
scratch_dir: "tmp"
worker:
  executable: "../src/gpgpu"
  plugins:
    - "../src/plugins/hello.so"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = HarnessConfig::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.worker.smoke_plugin, "hello");
        assert_eq!(config.worker.shutdown_timeout_ms, 60_000);
        assert!(!config.worker.capture_output);
        assert!(!config.build.enabled);
        assert!(!config.matrix.enabled);
        assert!(!config.prime.enabled);
        assert!(!config.graph.enabled);
        assert!(!config.policy.fail_fast);
        assert_eq!(config.scratch_dir, PathBuf::from("tmp"));
    }

    #[test]
    fn test_full_config_deserialize() {
        let yaml = r#"
log_level: "debug"
log_dir: "./logs"
log_file: "harness.log"
use_json: true
rotation: "daily"
enable_tracing: true
scratch_dir: "tmp"
worker:
  executable: "../src/gpgpu"
  args: []
  plugins:
    - "../src/plugins/hello.so"
    - "../src/plugins/matrix.so"
  shutdown_timeout_ms: 5000
  capture_output: true
build:
  enabled: true
  steps:
    - program: "make"
      args: ["gpgpu"]
      cwd: "../src"
matrix:
  enabled: true
  data_dir: "data/matrix"
prime:
  enabled: true
  limits: [101, 200]
  expected_file: "data/primesExpected.txt"
graph:
  enabled: true
  data_dir: "data/graph"
  files: ["simple"]
policy:
  fail_fast: true
  dump_transcript_on_failure: true
"#;

        let config = HarnessConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.worker.plugins.len(), 2);
        assert_eq!(config.worker.shutdown_timeout_ms, 5000);
        assert_eq!(config.build.steps[0].program, "make");
        assert_eq!(config.build.steps[0].cwd, Some(PathBuf::from("../src")));
        assert_eq!(config.prime.limits, vec![101, 200]);
        assert_eq!(config.graph.files, vec!["simple".to_string()]);
        assert!(config.policy.fail_fast);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let yaml = MINIMAL.replace(
            "  plugins:",
            "  shutdown_timeout_ms: 0\n  plugins:",
        );
        let err = HarnessConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = HarnessConfig::from_file("config/does-not-exist.yaml").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }
}
