// crates/core/src/launcher.rs
//! Spawns the transcoding tool and merges its output into one line stream.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::LaunchError;
use crate::paths;

/// Output lines buffered between the pipe readers and the consumer.
const LINE_BUFFER: usize = 256;

/// How often `wait` checks whether the process has exited.
const EXIT_POLL: Duration = Duration::from_millis(20);

/// Ordered argument vector for one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `<tool> -ss <start> -i <input> -t <duration> -c copy <output>`.
///
/// Stream copy, no re-encode. `-nostdin` keeps the tool from reading the
/// server's stdin and `-y` lets a later cut of the same file replace the
/// earlier one.
pub fn cut_command(
    program: &str,
    input: &Path,
    output: &Path,
    start_offset_secs: f64,
    duration_secs: f64,
) -> CommandSpec {
    CommandSpec::new(program)
        .args(["-hide_banner", "-nostdin", "-y"])
        .arg("-ss")
        .arg(format_secs(start_offset_secs))
        .arg("-i")
        .arg(input.to_string_lossy())
        .arg("-t")
        .arg(format_secs(duration_secs))
        .args(["-c", "copy"])
        .arg(output.to_string_lossy())
}

fn format_secs(secs: f64) -> String {
    format!("{secs:.3}")
}

/// Create `<output_root>/<yyyy-MM-dd>/` if needed and return the cut's path inside it.
pub fn prepare_output(
    output_root: &Path,
    date: NaiveDate,
    source_file_name: &str,
) -> Result<PathBuf, LaunchError> {
    let dir = output_root.join(paths::date_folder(date));
    std::fs::create_dir_all(&dir).map_err(|source| LaunchError::OutputDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir.join(paths::cut_file_name(source_file_name)))
}

/// A running tool process, owned by exactly one worker.
///
/// stdout and stderr are read by two forwarding tasks into a single channel,
/// so `next_line` yields both streams interleaved in arrival order. The
/// channel closes once both pipes reach end-of-file.
pub struct ProcessHandle {
    program: String,
    pid: Option<u32>,
    child: Arc<Mutex<TrackedChild>>,
    lines: mpsc::Receiver<String>,
}

/// Kills the process from outside the worker, without awaiting.
///
/// Cloned out of a [`ProcessHandle`]; all clones share the child.
#[derive(Clone)]
pub struct KillHandle {
    pid: Option<u32>,
    child: Arc<Mutex<TrackedChild>>,
}

impl std::fmt::Debug for KillHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillHandle").field("pid", &self.pid).finish()
    }
}

/// The child plus its exit status once reaped.
///
/// Reaping frees the pid for reuse, so it only happens under the mutex, and
/// every signal is sent under the same mutex after checking `exit`.
struct TrackedChild {
    child: Child,
    exit: Option<ExitStatus>,
}

impl TrackedChild {
    fn poll_exit(&mut self) -> std::io::Result<Option<ExitStatus>> {
        if self.exit.is_none() {
            self.exit = self.child.try_wait()?;
        }
        Ok(self.exit)
    }
}

fn lock(child: &Mutex<TrackedChild>) -> MutexGuard<'_, TrackedChild> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

impl KillHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Send SIGKILL now. No-op once the process has exited.
    pub fn kill(&self) -> std::io::Result<()> {
        let mut tracked = lock(&self.child);
        if tracked.poll_exit()?.is_some() {
            return Ok(());
        }
        tracked.child.start_kill()
    }
}

/// Spawn `spec` with null stdin and both output pipes merged.
///
/// The child is killed if the handle and every [`KillHandle`] are dropped
/// while it is still running.
pub fn spawn(spec: &CommandSpec) -> Result<ProcessHandle, LaunchError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        tracing::error!(program = %spec.program, error = %e, "failed to spawn transcoding tool");
        LaunchError::spawn(&spec.program, e)
    })?;

    let stdout = child.stdout.take().ok_or_else(|| LaunchError::Pipe {
        program: spec.program.clone(),
        stream: "stdout",
    })?;
    let stderr = child.stderr.take().ok_or_else(|| LaunchError::Pipe {
        program: spec.program.clone(),
        stream: "stderr",
    })?;

    let (tx, rx) = mpsc::channel::<String>(LINE_BUFFER);
    tokio::spawn(forward_lines(stdout, tx.clone()));
    tokio::spawn(forward_lines(stderr, tx));

    let pid = child.id();
    tracing::debug!(program = %spec.program, pid = ?pid, "transcoding tool spawned");

    Ok(ProcessHandle {
        program: spec.program.clone(),
        pid,
        child: Arc::new(Mutex::new(TrackedChild { child, exit: None })),
        lines: rx,
    })
}

/// Split a pipe into lines on `\n` or `\r` (status updates use bare `\r`).
async fn forward_lines<R>(mut reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(error = %e, "tool output pipe read failed");
                break;
            }
        };
        for &byte in &chunk[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !flush_line(&mut pending, &tx).await {
                    return;
                }
            } else {
                pending.push(byte);
            }
        }
    }
    flush_line(&mut pending, &tx).await;
}

/// Send the buffered line, if any. `false` once the receiver is gone.
async fn flush_line(pending: &mut Vec<u8>, tx: &mpsc::Sender<String>) -> bool {
    if pending.is_empty() {
        return true;
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    tx.send(line).await.is_ok()
}

impl ProcessHandle {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Next line of merged output, `None` at end of both streams.
    ///
    /// Cancel-safe: usable as a `tokio::select!` branch.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Handle for killing this process from another task.
    pub fn kill_handle(&self) -> KillHandle {
        KillHandle {
            pid: self.pid,
            child: Arc::clone(&self.child),
        }
    }

    /// Kill the process and reap it. Safe to call repeatedly and after a
    /// natural exit.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.kill_handle().kill()?;
        self.wait().await.map(|_| ())
    }

    /// Wait for the process to exit. Repeated calls return the same status.
    ///
    /// Cancel-safe.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        loop {
            let exited = lock(&self.child).poll_exit()?;
            if let Some(status) = exited {
                return Ok(status);
            }
            tokio::time::sleep(EXIT_POLL).await;
        }
    }

    /// Stop the process in place (SIGSTOP). No-op once it has exited.
    pub fn suspend(&self) -> std::io::Result<()> {
        self.signal(Signal::Stop)
    }

    /// Continue a suspended process (SIGCONT). No-op once it has exited.
    pub fn resume(&self) -> std::io::Result<()> {
        self.signal(Signal::Continue)
    }

    #[cfg(unix)]
    fn signal(&self, signal: Signal) -> std::io::Result<()> {
        use nix::sys::signal::{kill, Signal as NixSignal};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else {
            return Ok(());
        };
        let mut tracked = lock(&self.child);
        if tracked.poll_exit()?.is_some() {
            return Ok(());
        }
        let sig = match signal {
            Signal::Stop => NixSignal::SIGSTOP,
            Signal::Continue => NixSignal::SIGCONT,
        };
        kill(Pid::from_raw(pid as i32), sig).map_err(std::io::Error::from)
    }

    #[cfg(not(unix))]
    fn signal(&self, _signal: Signal) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Stop,
    Continue,
}

/// Describe a non-successful exit for the `Failed` state.
pub fn describe_exit(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return format!("terminated by signal {sig}");
        }
    }
    "terminated abnormally".to_string()
}
