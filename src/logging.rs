use crate::config::HarnessConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Target used for lines drained from the worker's stdout.
pub const WORKER_TARGET: &str = "worker";

/// Install the global subscriber. The returned guard flushes the file writer
/// on drop and must outlive the run.
pub fn init_logging(config: &HarnessConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Worker echo is very chatty; only let it through when tracing is on
    let filter_str = if config.enable_tracing {
        format!("{},{}=trace", config.log_level, WORKER_TARGET)
    } else {
        format!("{},{}=off", config.log_level, WORKER_TARGET)
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true) // lets worker echo be split from harness events
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false) // module paths add nothing to a run log
            .with_writer(non_blocking)
            .with_ansi(false);
        // stdout carries the PASSED/FAILED report; keep log lines off it
        let console_layer = fmt::layer()
            .with_target(false)
            .with_ansi(true)
            .with_writer(std::io::stderr);
        registry.with(file_layer).with(console_layer).init();
    }

    guard
}
