//! Synchronous subprocess execution with an optional wall-clock limit.
//!
//! Every external process the harness starts goes through [`run`]: the compiler, the assembler,
//! the linker, the probes and the test programs themselves. Output pipes are drained on helper
//! threads while the calling thread waits, so a chatty child cannot deadlock on a full pipe.
//!
//! A time limit bounds the whole call, not just the child: descendants that outlive a killed child
//! (or a child that exits normally) and keep its pipes open are abandoned once the limit passes,
//! and whatever output was read so far is returned.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant};

/// Poll interval while waiting on a child with a deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How long pipes are still read after the child is gone once its limit has passed.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// What to do with the child's stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrMode {
    /// Capture it into [`ProcessOutput::stderr`].
    Capture,
    /// Let it go to the harness's own stderr.
    Inherit,
}

/// A fully described process invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
    stderr: StderrMode,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stderr: StderrMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `path` as an argument.
    pub fn path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Everything observed about a finished (or killed) child.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    /// Empty when stderr was inherited.
    pub stderr: Vec<u8>,
    /// The child was killed because it outlived its time limit.
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Exit code, folding death-by-signal into the shell convention `128 + signal`.
    pub fn exit_code(&self) -> i32 {
        exit_code(&self.status)
    }
}

/// Spawn `invocation`, wait for it (at most `timeout`), and collect its output.
///
/// ## Errors
///
/// Returns the spawn error unchanged when the program cannot be started at all, so callers can
/// tell "missing binary" (`io::ErrorKind::NotFound`) apart from a process that ran and failed.
pub fn run(invocation: &Invocation, timeout: Option<Duration>) -> io::Result<ProcessOutput> {
    tracing::debug!(command = %invocation, ?timeout, "spawning");

    let stderr = match invocation.stderr {
        StderrMode::Capture => Stdio::piped(),
        StderrMode::Inherit => Stdio::inherit(),
    };
    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(stderr)
        .spawn()?;

    let stdout_drain = Drain::spawn(child.stdout.take());
    let stderr_drain = Drain::spawn(child.stderr.take());

    let deadline = timeout.and_then(|limit| Instant::now().checked_add(limit));
    let (status, timed_out) = wait_with_deadline(&mut child, deadline)?;

    // Pipes get until the limit, and always a short grace after the child is gone.
    let drain_deadline = deadline.map(|d| d.max(Instant::now() + DRAIN_GRACE));
    let stdout = stdout_drain.collect(drain_deadline)?;
    let stderr = stderr_drain.collect(drain_deadline)?;

    if timed_out {
        tracing::warn!(command = %invocation, "killed after exceeding time limit");
    } else {
        tracing::debug!(command = %invocation, code = exit_code(&status), "exited");
    }

    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}

/// Human-readable form of an exit status, e.g. `exit status 1` or `signal 11`.
pub fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {}", code),
        None => match signal(status) {
            Some(sig) => format!("signal {}", sig),
            None => "unknown status".to_string(),
        },
    }
}

fn exit_code(status: &ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => signal(status).map(|s| 128 + s).unwrap_or(1),
    }
}

#[cfg(unix)]
fn signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt as _;
    status.signal()
}

#[cfg(not(unix))]
fn signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// A pipe being read to EOF on its own thread, into a buffer the caller can take at any time.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<io::Result<()>>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buf);
        thread::spawn(move || {
            let _ = tx.send(pump(pipe, &sink));
        });
        Self { buf, done }
    }

    /// Wait for EOF, at most until `deadline`, and take what was read.
    ///
    /// A pipe still open at the deadline is left to its thread, which ends when the last holder
    /// exits.
    fn collect(self, deadline: Option<Instant>) -> io::Result<Vec<u8>> {
        let finished = match deadline {
            None => self.done.recv().ok(),
            Some(d) => self.done.recv_timeout(d.saturating_duration_since(Instant::now())).ok(),
        };
        match finished {
            Some(result) => result?,
            None => tracing::debug!(buffered = lock(&self.buf).len(), "abandoning a pipe held open by a descendant"),
        }
        Ok(std::mem::take(&mut *lock(&self.buf)))
    }
}

fn pump<R: Read>(pipe: Option<R>, sink: &Mutex<Vec<u8>>) -> io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(n) => lock(sink).extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> io::Result<(ExitStatus, bool)> {
    let Some(deadline) = deadline else {
        return Ok((child.wait()?, false));
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            // The child may exit between try_wait and kill; wait() still reaps it.
            let _ = child.kill();
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
