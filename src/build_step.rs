//! External build collaborator: compiles the worker and its plugins before a
//! run. Any failing step aborts the run before a session is opened.

use tokio::process::Command;
use tracing::info;

use crate::config::{BuildConfig, BuildStepConfig};
use crate::error::HarnessError;

pub async fn run_build(config: &BuildConfig) -> Result<(), HarnessError> {
    if !config.enabled {
        info!("build step disabled");
        return Ok(());
    }
    for step in &config.steps {
        run_step(step).await?;
    }
    Ok(())
}

fn describe(step: &BuildStepConfig) -> String {
    let mut text = step.program.clone();
    for arg in &step.args {
        text.push(' ');
        text.push_str(arg);
    }
    if let Some(cwd) = &step.cwd {
        text = format!("cd {} && {}", cwd.display(), text);
    }
    text
}

async fn run_step(step: &BuildStepConfig) -> Result<(), HarnessError> {
    let label = describe(step);
    info!(step = %label, "running build step");

    let mut command = Command::new(&step.program);
    command.args(&step.args);
    if let Some(cwd) = &step.cwd {
        command.current_dir(cwd);
    }

    let status = command.status().await.map_err(|e| HarnessError::Build {
        step: label.clone(),
        reason: format!("failed to start: {}", e),
    })?;

    if !status.success() {
        return Err(HarnessError::Build {
            step: label,
            reason: format!("exited with {}", status),
        });
    }
    Ok(())
}
