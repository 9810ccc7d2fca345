//! Low-level agent process execution
//!
//! Spawns the agent, streams its stdout and stderr line by line into the
//! per-target log (and optionally the console), and enforces the timeout by
//! killing the agent's whole process group.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

use super::command::PreparedCommand;
use crate::error::DispatchError;

/// Timeout for draining the output pipes after the agent has exited
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to run the agent once
#[derive(Debug)]
pub struct ExecRequest<'a> {
    pub command: &'a PreparedCommand,
    pub cwd: &'a Path,
    pub log_path: &'a Path,
    pub timeout: Option<Duration>,
    /// Mirror agent output to our stdout
    pub echo: bool,
}

/// What the agent process did
#[derive(Debug, Clone, Copy)]
pub struct ExecResult {
    pub status: Option<ExitStatus>,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ExecResult {
    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }
}

type SharedLog = Arc<Mutex<File>>;

/// Run the agent to completion or timeout.
///
/// The log file is truncated first. Failing to create it or to spawn the
/// process is a launch error; everything after spawn is reported through
/// [`ExecResult`].
pub fn run_agent(request: &ExecRequest<'_>) -> Result<ExecResult, DispatchError> {
    let launch_error = |reason: String| DispatchError::Launch {
        program: request.command.program.clone(),
        reason,
    };

    if let Some(parent) = request.log_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            launch_error(format!(
                "cannot create log directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    let log_file = File::create(request.log_path).map_err(|e| {
        launch_error(format!(
            "cannot create log file {}: {e}",
            request.log_path.display()
        ))
    })?;
    let log: SharedLog = Arc::new(Mutex::new(log_file));

    let start = Instant::now();
    let mut child = spawn_agent(request.command, request.cwd).map_err(|e| launch_error(e.to_string()))?;

    if let (Some(input), Some(mut stdin)) = (request.command.stdin.clone(), child.stdin.take()) {
        // Written from a thread so a child that does not read stdin cannot block us.
        thread::spawn(move || {
            let _ = stdin.write_all(input.as_bytes());
        });
    }

    // Drain both pipes while waiting; a full pipe buffer would otherwise stall the agent.
    let stdout_done = child
        .stdout
        .take()
        .map(|s| spawn_tee(s, Arc::clone(&log), request.echo));
    let stderr_done = child
        .stderr
        .take()
        .map(|s| spawn_tee(s, Arc::clone(&log), request.echo));

    let wait_result = match request.timeout {
        Some(timeout) => child.wait_timeout(timeout),
        None => child.wait().map(Some),
    };

    let (status, timed_out) = match wait_result {
        Ok(Some(status)) => (Some(status), false),
        Ok(None) => {
            kill_agent(&mut child);
            (None, true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed waiting for agent, killing it");
            kill_agent(&mut child);
            (None, false)
        }
    };

    for done in [stdout_done, stderr_done].into_iter().flatten() {
        if done.recv_timeout(OUTPUT_COLLECTION_TIMEOUT).is_err() {
            tracing::warn!("agent output collection timed out");
        }
    }

    let duration = start.elapsed();

    if timed_out {
        let limit = request.timeout.unwrap_or_default();
        append_note(&log, &format!("[codexup] agent killed after {limit:?} timeout"));
    }

    Ok(ExecResult {
        status,
        timed_out,
        duration,
    })
}

/// Spawn the agent in its own process group so a timeout can take down any
/// helpers it started.
fn spawn_agent(command: &PreparedCommand, cwd: &Path) -> io::Result<Child> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if command.stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    cmd.spawn()
}

/// Copy a stream line by line into the shared log, signalling on EOF
fn spawn_tee<R: Read + Send + 'static>(stream: R, log: SharedLog, echo: bool) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        tee_lines(stream, &log, echo);
        let _ = tx.send(());
    });
    rx
}

fn tee_lines<R: Read>(stream: R, log: &SharedLog, echo: bool) {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if let Ok(mut file) = log.lock() {
                    let _ = file.write_all(&line);
                }
                if echo {
                    let mut stdout = io::stdout().lock();
                    let _ = stdout.write_all(&line);
                    let _ = stdout.flush();
                }
            }
            Err(_) => break,
        }
    }
}

fn append_note(log: &SharedLog, note: &str) {
    if let Ok(mut file) = log.lock() {
        let _ = writeln!(file, "\n{note}");
    }
}

/// Kill the agent's process group, then the agent itself, and reap it
fn kill_agent(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Ok(pid) = i32::try_from(child.id()) {
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
    // The process may already be gone
    let _ = child.kill();
    let _ = child.wait();
}
