//! Worker Conformance Harness
//!
//! Fixed run, no flags beyond the config environment:
//!
//! ```text
//! ┌────────┐   ┌─────────┐   ┌──────────────┐   ┌────────┐   ┌────────┐
//! │ Build  │──▶│ Scratch │──▶│ Worker       │──▶│ Verify │──▶│  Exit  │
//! │ (make) │   │ (reset) │   │ session      │   │ (files)│   │ status │
//! └────────┘   └─────────┘   └──────────────┘   └────────┘   └────────┘
//! ```
//!
//! Exit status is 0 iff every artifact matched its golden counterpart.

use worker_conformance::config::HarnessConfig;
use worker_conformance::logging::init_logging;
use worker_conformance::runner;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

#[tokio::main]
async fn main() {
    let env = get_env();
    let config = match HarnessConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    let log_guard = init_logging(&config);

    tracing::info!("Starting conformance run with {} config", env);

    let code = match runner::run(&config).await {
        Ok(summary) => summary.exit_code(),
        Err(e) => {
            tracing::error!("run aborted: {}", e);
            eprintln!("❌ {}", e);
            1
        }
    };

    // process::exit skips destructors; flush the log writer first
    drop(log_guard);
    std::process::exit(code);
}
