//! Orchestrator
//!
//! ```text
//! build ─▶ reset scratch ─▶ open session ─▶ send scenarios ─▶ close ─▶ verify
//! ```
//!
//! Every phase hands its result to the next; nothing is shared globally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::build_step::run_build;
use crate::config::{HarnessConfig, PolicyConfig};
use crate::error::HarnessError;
use crate::scenario::{Domain, Scenario, build_scenarios};
use crate::session::{SessionOptions, SessionOutcome, WorkerSession};
use crate::verify::VerificationReport;

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    pub domain: Domain,
    pub cases: usize,
    pub lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioSummary>,
    pub session: SessionOutcome,
    /// Set when the worker was killed; its artifacts are not trusted
    pub verification_skipped: bool,
    pub report: VerificationReport,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        !self.session.timed_out && !self.verification_skipped && self.report.is_success()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Run the whole conformance pass. Fatal errors (build, spawn, scratch,
/// discovery) come back as `Err`; artifact failures live in the summary.
pub async fn run(config: &HarnessConfig) -> Result<RunSummary, HarnessError> {
    let started_at = Utc::now();

    run_build(&config.build).await?;
    reset_scratch_dir(&config.scratch_dir)?;
    let scenarios = build_scenarios(config)?;

    println!("Running all tests...");
    let mut session = WorkerSession::open(SessionOptions::from(&config.worker)).await?;

    let mut scenario_summaries = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        let lines = scenario.encode();
        info!(
            domain = %scenario.domain(),
            cases = scenario.case_count(),
            lines = lines.len(),
            "sending scenario"
        );
        session.send(&lines).await?;
        scenario_summaries.push(ScenarioSummary {
            domain: scenario.domain(),
            cases: scenario.case_count(),
            lines: lines.len(),
        });
    }

    let session = session.close().await?;

    let verification_skipped = session.timed_out;
    let report = if verification_skipped {
        error!("worker was killed after the shutdown timeout, skipping verification");
        println!("❌ Worker did not exit in time and was killed; results not verified");
        VerificationReport::default()
    } else {
        println!("Checking test results...");
        verify_all(&scenarios, &config.policy)
    };

    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        scenarios: scenario_summaries,
        session,
        verification_skipped,
        report,
    };

    print_footer(&summary, &config.policy);
    if let Err(e) = write_summary(&config.scratch_dir.join(SUMMARY_FILE), &summary) {
        warn!("failed to write run summary: {}", e);
    }

    Ok(summary)
}

/// Check every scenario in order, printing one line per artifact. With
/// `fail_fast` the first failure ends verification.
pub fn verify_all(scenarios: &[Box<dyn Scenario>], policy: &PolicyConfig) -> VerificationReport {
    let mut report = VerificationReport::default();
    for scenario in scenarios {
        for outcome in scenario.verify() {
            println!("{}", outcome);
            let failed = !outcome.is_pass();
            report.push(outcome);
            if failed && policy.fail_fast {
                warn!(domain = %scenario.domain(), "stopping at first failure");
                return report;
            }
        }
    }
    report
}

/// Clear and recreate the scratch directory.
pub fn reset_scratch_dir(dir: &Path) -> Result<(), HarnessError> {
    // refuse "/", "." and ".." style paths
    if dir.file_name().is_none() {
        return Err(HarnessError::Config(format!(
            "refusing to clear scratch directory {}",
            dir.display()
        )));
    }
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), HarnessError> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| HarnessError::Config(format!("cannot serialize summary: {}", e)))?;
    fs::write(path, json)?;
    Ok(())
}

fn print_footer(summary: &RunSummary, policy: &PolicyConfig) {
    let report = &summary.report;
    println!(
        "\nPassed: {}, Failed: {}",
        report.passed_count(),
        report.failure_count()
    );

    if summary.is_success() {
        return;
    }
    let session = &summary.session;
    if !session.exited_cleanly() {
        println!(
            "Worker exit status: {}",
            session.exit_status.as_deref().unwrap_or("unknown (killed)")
        );
    }
    if session.lines_dropped > 0 {
        println!(
            "Worker closed its input early; {} command line(s) were not delivered",
            session.lines_dropped
        );
    }
    if policy.dump_transcript_on_failure && !session.transcript.text.is_empty() {
        println!("\n--- worker output ---");
        if session.transcript.truncated {
            println!("[... earlier output truncated ...]");
        }
        print!("{}", session.transcript.text);
        println!("--- end of worker output ---");
    }
}
