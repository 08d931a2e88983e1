use std::io::BufRead;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use super::EngineError;
use super::types::{CommandResult, EngineCommand, OutputLine};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawn an engine process and return a channel that streams its output.
///
/// The caller receives [`OutputLine::Stdout`]/[`OutputLine::Stderr`] as they
/// arrive, followed by exactly one [`OutputLine::Done`] carrying the result.
pub fn spawn(program: &str, cmd: EngineCommand) -> Result<Receiver<OutputLine>, EngineError> {
    debug!(command = %cmd.display(program), "spawning engine process");

    let spawn_err = |source| EngineError::Spawn {
        program: program.to_string(),
        source,
    };

    let mut child = Command::new(program)
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(out), Some(err)) => (out, err),
        _ => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_err(std::io::Error::other("output pipes unavailable")));
        }
    };

    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        orchestrate(child, stdout, stderr, tx, cmd.timeout);
    });

    Ok(rx)
}

/// Run an engine process to completion, handing each output line to
/// `on_line` as it arrives.
pub fn run(
    program: &str,
    cmd: EngineCommand,
    mut on_line: impl FnMut(&str),
) -> Result<CommandResult, EngineError> {
    let rx = spawn(program, cmd)?;
    for line in rx {
        match line {
            OutputLine::Stdout(s) | OutputLine::Stderr(s) => on_line(&s),
            OutputLine::Done(result) => return Ok(result),
        }
    }
    // The orchestrating thread always sends `Done` unless it panicked.
    Err(EngineError::Spawn {
        program: program.to_string(),
        source: std::io::Error::other("engine process monitor exited unexpectedly"),
    })
}

fn orchestrate(
    mut child: std::process::Child,
    stdout: std::process::ChildStdout,
    stderr: std::process::ChildStderr,
    tx: Sender<OutputLine>,
    timeout: Duration,
) {
    let log_buf = Arc::new(Mutex::new(String::new()));
    let stdout_buf = Arc::new(Mutex::new(String::new()));

    // --- reader threads ---------------------------------------------------
    let tx_out = tx.clone();
    let log_out = log_buf.clone();
    let only_out = stdout_buf.clone();
    let stdout_handle = std::thread::spawn(move || {
        let reader = std::io::BufReader::new(stdout);
        for line in reader.lines() {
            let Ok(l) = line else { break };
            for buf in [&log_out, &only_out] {
                if let Ok(mut buf) = buf.lock() {
                    buf.push_str(&l);
                    buf.push('\n');
                }
            }
            // Receiver may be dropped; ignore send errors.
            let _ = tx_out.send(OutputLine::Stdout(l));
        }
    });

    let tx_err = tx.clone();
    let log_err = log_buf.clone();
    let stderr_handle = std::thread::spawn(move || {
        let reader = std::io::BufReader::new(stderr);
        for line in reader.lines() {
            let Ok(l) = line else { break };
            if let Ok(mut buf) = log_err.lock() {
                buf.push_str(&l);
                buf.push('\n');
            }
            let _ = tx_err.send(OutputLine::Stderr(l));
        }
    });

    // --- poll loop ---------------------------------------------------------
    let start = Instant::now();
    let mut timed_out = false;

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => break None,
        }

        if start.elapsed() > timeout {
            timed_out = true;
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    // --- finalize ----------------------------------------------------------
    let _ = stdout_handle.join();
    let _ = stderr_handle.join();

    let exit_code = exit_status.and_then(|s| s.code());
    let take = |buf: &Arc<Mutex<String>>| buf.lock().map(|b| b.clone()).unwrap_or_default();

    let _ = tx.send(OutputLine::Done(CommandResult {
        success: exit_code == Some(0),
        exit_code,
        stdout: take(&stdout_buf),
        log: take(&log_buf),
        timed_out,
    }));
}
