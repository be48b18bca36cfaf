//! Worker Session
//!
//! Owns the worker process for a whole run:
//!
//! ```text
//!            send(lines)                 drain task
//! ┌────────────┐  stdin  ┌──────────┐  stdout  ┌───────────────┐
//! │ Orchestr.  │────────▶│  Worker  │─────────▶│ read until EOF│
//! └────────────┘         └──────────┘          └───────────────┘
//! ```
//!
//! The drain task runs from spawn until the worker closes stdout. Without it
//! the worker blocks once the stdout pipe buffer fills, and then our writes to
//! its stdin block too.

use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::config::WorkerConfig;
use crate::error::HarnessError;
use crate::logging::WORKER_TARGET;
use crate::protocol::CommandLine;

/// How long to wait for the drain task after a forced kill.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub plugins: Vec<PathBuf>,
    pub smoke_plugin: String,
    pub shutdown_timeout: Duration,
    /// `None` discards worker output; `Some(n)` keeps its last `n` bytes
    pub capture_limit: Option<usize>,
}

impl From<&WorkerConfig> for SessionOptions {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            args: config.args.clone(),
            plugins: config.plugins.clone(),
            smoke_plugin: config.smoke_plugin.clone(),
            shutdown_timeout: Duration::from_millis(config.shutdown_timeout_ms),
            capture_limit: config
                .capture_output
                .then_some(config.transcript_limit_bytes),
        }
    }
}

/// What the drain task saw on the worker's stdout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    pub bytes_read: u64,
    pub lines_read: u64,
    /// Tail of the output, only when capture is enabled
    pub text: String,
    pub truncated: bool,
    pub read_error: Option<String>,
}

impl Transcript {
    fn append(&mut self, chunk: &str, limit: usize) {
        self.text.push_str(chunk);
        if self.text.len() > limit {
            let mut cut = self.text.len() - limit;
            while !self.text.is_char_boundary(cut) {
                cut += 1;
            }
            self.text.drain(..cut);
            self.truncated = true;
        }
    }
}

/// Final state of a closed session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionOutcome {
    pub exit_code: Option<i32>,
    pub exit_status: Option<String>,
    /// The worker did not exit within the shutdown timeout and was killed
    pub timed_out: bool,
    pub lines_sent: usize,
    /// Lines not delivered because the worker closed its stdin first
    pub lines_dropped: usize,
    pub transcript: Transcript,
}

impl SessionOutcome {
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

pub struct WorkerSession {
    child: Child,
    stdin: Option<ChildStdin>,
    drain: Option<JoinHandle<Transcript>>,
    shutdown_timeout: Duration,
    lines_sent: usize,
    lines_dropped: usize,
}

impl WorkerSession {
    /// Spawn the worker, start draining its output, load every plugin, list
    /// them, and run the smoke plugin once.
    pub async fn open(options: SessionOptions) -> Result<Self, HarnessError> {
        info!(
            executable = %options.executable.display(),
            plugins = options.plugins.len(),
            "spawning worker"
        );

        let mut child = Command::new(&options.executable)
            .args(&options.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                path: options.executable.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let drain = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(drain_output(stdout, options.capture_limit)));

        let mut session = Self {
            child,
            stdin,
            drain,
            shutdown_timeout: options.shutdown_timeout,
            lines_sent: 0,
            lines_dropped: 0,
        };

        let mut preamble: Vec<CommandLine> =
            options.plugins.iter().map(|p| CommandLine::load(p)).collect();
        preamble.push(CommandLine::List);
        preamble.push(CommandLine::run(&options.smoke_plugin));
        session.send(&preamble).await?;

        Ok(session)
    }

    /// Write each line, newline-terminated, in order.
    ///
    /// If the worker has already closed its stdin the remaining lines are
    /// dropped and counted; verification will then fail on the missing
    /// artifacts instead of the run aborting here.
    pub async fn send(&mut self, lines: &[CommandLine]) -> Result<(), HarnessError> {
        let Some(stdin) = self.stdin.as_mut() else {
            self.lines_dropped += lines.len();
            debug!(lines = lines.len(), "worker input closed, dropping lines");
            return Ok(());
        };

        for (i, line) in lines.iter().enumerate() {
            trace!(line = %line, "send");
            if let Err(e) = stdin.write_all(line.to_wire().as_bytes()).await {
                return self.handle_write_error(e, lines.len() - i);
            }
            self.lines_sent += 1;
        }
        if let Err(e) = stdin.flush().await {
            return self.handle_write_error(e, 0);
        }
        Ok(())
    }

    fn handle_write_error(&mut self, e: std::io::Error, undelivered: usize) -> Result<(), HarnessError> {
        if e.kind() == ErrorKind::BrokenPipe {
            warn!(undelivered, "worker closed its input early");
            self.stdin = None;
            self.lines_dropped += undelivered;
            Ok(())
        } else {
            Err(e.into())
        }
    }

    /// Send `exit`, close stdin, then wait (bounded) for the drain task to
    /// reach EOF and for the worker to exit. A worker that outlives the
    /// timeout is killed and the outcome is marked `timed_out`.
    pub async fn close(mut self) -> Result<SessionOutcome, HarnessError> {
        self.send(&[CommandLine::Exit]).await?;
        // EOF on the worker's stdin
        drop(self.stdin.take());

        let mut drain = self.drain.take();
        let child = &mut self.child;
        let finished = timeout(self.shutdown_timeout, async {
            let transcript = match drain.as_mut() {
                Some(handle) => join_drain(handle).await,
                None => Transcript::default(),
            };
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((transcript, status))
        })
        .await;

        let mut outcome = SessionOutcome {
            lines_sent: self.lines_sent,
            lines_dropped: self.lines_dropped,
            ..Default::default()
        };

        match finished {
            Ok(result) => {
                let (transcript, status) = result?;
                record_status(&mut outcome, status);
                outcome.transcript = transcript;
                info!(
                    status = outcome.exit_status.as_deref().unwrap_or("unknown"),
                    lines_sent = outcome.lines_sent,
                    bytes_read = outcome.transcript.bytes_read,
                    "worker exited"
                );
            }
            Err(_) => {
                error!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "worker did not exit in time, killing it"
                );
                outcome.timed_out = true;
                if let Err(e) = self.child.kill().await {
                    warn!("failed to kill worker: {}", e);
                }
                if let Ok(Some(status)) = self.child.try_wait() {
                    record_status(&mut outcome, status);
                }
                if let Some(handle) = drain.as_mut() {
                    match timeout(DRAIN_GRACE, join_drain(handle)).await {
                        Ok(transcript) => outcome.transcript = transcript,
                        Err(_) => {
                            // a grandchild may still hold the pipe open
                            handle.abort();
                            warn!("drain task still running after kill, aborted");
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}

fn record_status(outcome: &mut SessionOutcome, status: ExitStatus) {
    outcome.exit_code = status.code();
    outcome.exit_status = Some(status.to_string());
}

async fn join_drain(handle: &mut JoinHandle<Transcript>) -> Transcript {
    match handle.await {
        Ok(transcript) => transcript,
        Err(e) => {
            warn!("drain task failed: {}", e);
            Transcript::default()
        }
    }
}

/// Read the worker's stdout until EOF.
async fn drain_output(stdout: ChildStdout, capture_limit: Option<usize>) -> Transcript {
    let mut reader = BufReader::new(stdout);
    let mut transcript = Transcript::default();
    let mut line = Vec::with_capacity(4096);

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(n) => {
                transcript.bytes_read += n as u64;
                transcript.lines_read += 1;
                let text = String::from_utf8_lossy(&line);
                trace!(target: WORKER_TARGET, "{}", text.trim_end());
                if let Some(limit) = capture_limit {
                    transcript.append(&text, limit);
                }
            }
            Err(e) => {
                warn!("error reading worker output: {}", e);
                transcript.read_error = Some(e.to_string());
                break;
            }
        }
    }

    debug!(
        bytes = transcript.bytes_read,
        lines = transcript.lines_read,
        "worker output reached EOF"
    );
    transcript
}
