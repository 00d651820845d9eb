//! Blocking invocation of external toolkit programs.
//!
//! Output pipes are drained on helper threads while the caller polls for
//! exit, so a chatty program cannot stall on a full pipe and a hung one can be
//! killed once its deadline passes.

use crate::trace::trace_event;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured output of a successful invocation.
#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Why an invocation did not succeed.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolFailure {
    /// The program could not be started.
    Spawn(String),
    /// The program exited unsuccessfully.
    Status { status: String, stderr: String },
    /// The program outlived its deadline and was killed.
    Timeout(Duration),
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolFailure::Spawn(reason) => write!(f, "could not start: {reason}"),
            ToolFailure::Status { status, stderr } if stderr.is_empty() => {
                write!(f, "exited with {status}")
            }
            ToolFailure::Status { status, stderr } => write!(f, "exited with {status}: {stderr}"),
            ToolFailure::Timeout(limit) => write!(f, "timed out after {}s", limit.as_secs_f64()),
        }
    }
}

/// Runs `program` with `args`, waiting at most `timeout`.
pub fn run_tool<S: AsRef<std::ffi::OsStr>>(
    program: &Path,
    args: &[S],
    timeout: Option<Duration>,
) -> Result<ToolOutput, ToolFailure> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| ToolFailure::Spawn(format!("{}: {err}", program.display())))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait(&mut child, timeout)?;
    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    trace_event!(
        "tool_exit",
        program = program.display(),
        success = status.success()
    );

    if !status.success() {
        return Err(ToolFailure::Status {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(ToolOutput { stdout, stderr })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, ToolFailure> {
    let Some(limit) = timeout else {
        return child
            .wait()
            .map_err(|err| ToolFailure::Spawn(err.to_string()));
    };
    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ToolFailure::Timeout(limit));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(ToolFailure::Spawn(err.to_string())),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
