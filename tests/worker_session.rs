#![cfg(unix)]

use std::path::PathBuf;
use std::time::{Duration, Instant};
use worker_conformance::error::HarnessError;
use worker_conformance::protocol::CommandLine;
use worker_conformance::session::{SessionOptions, WorkerSession};

/// `cat` echoes every protocol line back, which makes the drained output
/// a faithful record of what was sent.
fn cat_worker(capture_limit: Option<usize>) -> SessionOptions {
    SessionOptions {
        executable: PathBuf::from("cat"),
        args: vec![],
        plugins: vec![PathBuf::from("plugins/hello.so"), PathBuf::from("plugins/prime.so")],
        smoke_plugin: "hello".to_string(),
        shutdown_timeout: Duration::from_secs(10),
        capture_limit,
    }
}

#[tokio::test]
async fn session_sends_preamble_cases_and_exit_in_order() {
    let mut session = WorkerSession::open(cat_worker(Some(64 * 1024))).await.unwrap();
    session
        .send(&[
            CommandLine::set("prime", "limit", 101),
            CommandLine::run("prime"),
        ])
        .await
        .unwrap();
    let outcome = session.close().await.unwrap();

    assert!(!outcome.timed_out);
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(outcome.lines_sent, 7);
    assert_eq!(outcome.lines_dropped, 0);
    assert_eq!(
        outcome.transcript.text,
        "load plugins/hello.so\n\
         load plugins/prime.so\n\
         list\n\
         run hello\n\
         set prime limit 101\n\
         run prime\n\
         exit\n"
    );
}

#[tokio::test]
async fn session_does_not_deadlock_on_large_output() {
    // Far more than a pipe buffer (typically 64 KiB) flows back through stdout
    let line = CommandLine::set("matrix", "OutputFileMatrixC", "x".repeat(100));
    let lines = vec![line; 50_000];
    let expected_bytes: u64 = lines.iter().map(|l| l.to_wire().len() as u64).sum();

    let mut session = WorkerSession::open(cat_worker(None)).await.unwrap();
    let started = Instant::now();
    session.send(&lines).await.unwrap();
    let outcome = session.close().await.unwrap();

    assert!(!outcome.timed_out);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(outcome.transcript.bytes_read > expected_bytes);
    // discard mode keeps nothing
    assert!(outcome.transcript.text.is_empty());
}

#[tokio::test]
async fn session_kills_worker_that_ignores_exit() {
    let options = SessionOptions {
        executable: PathBuf::from("sleep"),
        args: vec!["30".to_string()],
        plugins: vec![],
        smoke_plugin: "hello".to_string(),
        shutdown_timeout: Duration::from_millis(300),
        capture_limit: None,
    };

    let session = WorkerSession::open(options).await.unwrap();
    let started = Instant::now();
    let outcome = session.close().await.unwrap();

    assert!(outcome.timed_out);
    assert!(!outcome.exited_cleanly());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn session_records_nonzero_exit_status() {
    let options = SessionOptions {
        executable: PathBuf::from("sh"),
        args: vec!["-c".to_string(), "cat > /dev/null; exit 3".to_string()],
        plugins: vec![PathBuf::from("hello.so")],
        smoke_plugin: "hello".to_string(),
        shutdown_timeout: Duration::from_secs(10),
        capture_limit: None,
    };

    let session = WorkerSession::open(options).await.unwrap();
    let outcome = session.close().await.unwrap();

    assert!(!outcome.timed_out);
    assert_eq!(outcome.exit_code, Some(3));
    assert!(!outcome.exited_cleanly());
}

#[tokio::test]
async fn session_survives_worker_closing_input_early() {
    let options = SessionOptions {
        executable: PathBuf::from("sh"),
        args: vec!["-c".to_string(), "exit 0".to_string()],
        plugins: vec![],
        smoke_plugin: "hello".to_string(),
        shutdown_timeout: Duration::from_secs(10),
        capture_limit: None,
    };

    let mut session = WorkerSession::open(options).await.unwrap();
    let lines = vec![CommandLine::run("prime"); 100_000];
    session.send(&lines).await.unwrap();
    let outcome = session.close().await.unwrap();

    assert!(!outcome.timed_out);
    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.lines_dropped > 0);
}

#[tokio::test]
async fn spawn_failure_is_fatal() {
    let options = SessionOptions {
        executable: PathBuf::from("/nonexistent/worker"),
        ..cat_worker(None)
    };

    match WorkerSession::open(options).await {
        Err(HarnessError::Spawn { path, .. }) => {
            assert_eq!(path, PathBuf::from("/nonexistent/worker"));
        }
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("spawn should fail"),
    }
}
