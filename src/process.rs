//! Subprocess execution with captured output and an optional timeout
//!
//! Both the compiler binaries and the external generator are run through
//! [`run_with_timeout`]. Output pipes are drained on helper threads so a
//! chatty child can never block on a full pipe while we poll for its exit.

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io::Read;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, TriageError};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// Normal exit with a return code
    Exited(i32),
    /// Terminated by a signal
    Signaled(i32),
}

impl ExitKind {
    fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ExitKind::Exited(code),
            (None, Some(sig)) => ExitKind::Signaled(sig),
            // Stopped/continued statuses never reach us after wait()
            (None, None) => ExitKind::Exited(-1),
        }
    }
}

/// Captured result of one process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitKind,
}

impl RawOutcome {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit: ExitKind) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit,
        }
    }

    /// Return code with signal terminations folded into negative values
    ///
    /// A child killed by SIGSEGV reports `-11`.
    pub fn status_code(&self) -> i32 {
        match self.exit {
            ExitKind::Exited(code) => code,
            ExitKind::Signaled(sig) => -sig,
        }
    }

    /// True when the child died from a segmentation fault
    pub fn is_fatal_crash(&self) -> bool {
        self.exit == ExitKind::Signaled(Signal::SIGSEGV as i32)
    }

    pub fn success(&self) -> bool {
        self.exit == ExitKind::Exited(0)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            // A read error only truncates the captured text
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// SIGKILL the child's process group and reap the child
///
/// Grandchildren die with the group, so they release the output pipes.
fn kill_group(child: &mut Child) -> std::io::Result<ExitStatus> {
    let _ = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
    let _ = child.kill();
    child.wait()
}

fn wait_for_child(child: &mut Child, timeout: Option<Duration>) -> std::io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let started_at = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                let _ = kill_group(child);
                return Err(e);
            }
        }
        if started_at.elapsed() >= timeout {
            kill_group(child)?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run `program args...` to completion, capturing stdout and stderr
///
/// # Errors
/// - [`TriageError::TransientProcess`] if the program cannot be spawned or waited on
/// - [`TriageError::TimedOut`] if it is still running after `timeout`; the child is killed
pub fn run_with_timeout(
    program: &Path,
    args: &[String],
    input: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<RawOutcome> {
    let transient = |source| TriageError::TransientProcess {
        program: program.to_path_buf(),
        source,
    };

    let mut command = Command::new(program);
    command.args(args);
    if let Some(input) = input {
        command.arg(input);
    }
    if timeout.is_some() {
        command.process_group(0);
    }
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(transient)?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_for_child(&mut child, timeout).map_err(transient)?;

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    match status {
        Some(status) => Ok(RawOutcome {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit: ExitKind::from_status(status),
        }),
        None => Err(TriageError::TimedOut {
            program: program.to_path_buf(),
            input: input.map(Path::to_path_buf).unwrap_or_else(PathBuf::new),
            timeout: timeout.unwrap_or_default(),
        }),
    }
}
