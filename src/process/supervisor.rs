//! Spawning and terminating the background service process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::config::template::render_all;
use crate::config::LauncherConfig;
use crate::error::{LauncherError, LauncherResult};

/// Maximum number of stderr bytes kept per child (1 MiB).
const MAX_STDERR_BYTES: usize = 1024 * 1024;

/// How long to wait for the stderr reader to drain after the child exited.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait for the child after a forced kill.
const FORCE_KILL_WAIT: Duration = Duration::from_secs(2);

/// Poll interval while waiting for the rest of the process group to exit.
#[cfg(unix)]
const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Trigger service command with the DAR and ports substituted.
    pub fn trigger_service(config: &LauncherConfig) -> Self {
        let values = config.placeholders();
        Self {
            program: config.service.program.clone(),
            args: render_all(&config.service.args, &values),
            working_dir: config.service.working_dir.clone(),
        }
    }
}

/// Result of a termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A termination signal was sent to the running child and its process group.
    Requested,
    /// A kill request had already been sent earlier; nothing was done.
    AlreadyRequested,
    /// The child had already exited; nothing was done.
    AlreadyExited,
}

/// Spawn `spec` in the background.
///
/// Stdin is detached, stdout is inherited and stderr is captured for
/// [`ChildHandle::stderr_output`].
pub fn start(spec: &CommandSpec) -> LauncherResult<ChildHandle> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group: terminal Ctrl+C reaches the launcher only, and
    // terminate() can signal everything the child started.
    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }

    let working_dir = match &spec.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    let mut child = cmd.spawn().map_err(|source| LauncherError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    let pid = child.id();
    let captured = Arc::new(Mutex::new(Vec::new()));
    let reader = child.stderr.take().map(|stderr| {
        let captured = captured.clone();
        let program = spec.program.clone();
        tokio::spawn(capture_stream(stderr, captured, program))
    });

    tracing::info!(
        program = %spec.program,
        args = ?spec.args,
        pid = ?pid,
        working_dir = %working_dir.display(),
        "Child process started"
    );

    Ok(ChildHandle {
        child,
        program: spec.program.clone(),
        pid,
        working_dir,
        captured,
        reader,
        exit_status: None,
        termination_requested: false,
    })
}

/// Read a child stream line by line into `captured`, mirroring each line at debug level.
async fn capture_stream<R>(stream: R, captured: Arc<Mutex<Vec<u8>>>, program: String)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                tracing::debug!(
                    program = %program,
                    line = %String::from_utf8_lossy(&line).trim_end(),
                    "child stderr"
                );
                let mut buf = captured.lock().expect("stderr buffer mutex poisoned");
                let room = MAX_STDERR_BYTES.saturating_sub(buf.len());
                buf.extend_from_slice(&line[..line.len().min(room)]);
            }
            Err(e) => {
                tracing::debug!(program = %program, error = %e, "Stopped reading child stderr");
                break;
            }
        }
    }
}

/// Exclusive handle to a spawned child.
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    program: String,
    pid: Option<u32>,
    working_dir: PathBuf,
    captured: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
    exit_status: Option<ExitStatus>,
    termination_requested: bool,
}

impl ChildHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Whether [`terminate`](Self::terminate) has sent a kill request.
    pub fn termination_requested(&self) -> bool {
        self.termination_requested
    }

    /// Exit status if the child has exited, without blocking.
    pub fn try_status(&mut self) -> Option<ExitStatus> {
        if self.exit_status.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.exit_status = status,
                Err(e) => {
                    tracing::debug!(program = %self.program, error = %e, "Failed to poll child status");
                }
            }
        }
        self.exit_status
    }

    pub fn is_running(&mut self) -> bool {
        self.try_status().is_none()
    }

    /// Block until the child exits. Cancel safe.
    pub async fn wait(&mut self) -> LauncherResult<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = self.child.wait().await?;
        self.exit_status = Some(status);
        Ok(status)
    }

    /// Ask the child to stop and return without waiting for it.
    ///
    /// On Unix this sends SIGTERM to the child's process group, so wrapper
    /// scripts and the servers they launched stop together.
    /// Never fails. Repeated calls do nothing; calls after exit only signal
    /// whatever is left in the group.
    pub fn terminate(&mut self) -> Termination {
        if self.try_status().is_some() {
            // The leader is gone but processes it started may remain in its group.
            #[cfg(unix)]
            {
                if self.signal_group(Signal::SIGTERM).is_ok() {
                    tracing::debug!(program = %self.program, pid = ?self.pid, "Signalled remaining process group members");
                }
            }
            tracing::debug!(program = %self.program, pid = ?self.pid, "Child already exited, nothing to terminate");
            return Termination::AlreadyExited;
        }
        if self.termination_requested {
            return Termination::AlreadyRequested;
        }

        self.termination_requested = true;
        match self.request_stop() {
            Ok(()) => {
                tracing::info!(program = %self.program, pid = ?self.pid, "Termination requested");
                Termination::Requested
            }
            Err(e) => {
                tracing::debug!(program = %self.program, error = %e, "Termination request failed, child is gone");
                Termination::AlreadyExited
            }
        }
    }

    #[cfg(unix)]
    fn request_stop(&mut self) -> io::Result<()> {
        match self.signal_group(Signal::SIGTERM) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => self.child.start_kill(),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    /// Send `signal` to the child's process group (its id is the child's pid).
    #[cfg(unix)]
    fn signal_group(&self, signal: impl Into<Option<Signal>>) -> nix::Result<()> {
        let pid = self
            .pid
            .and_then(|pid| i32::try_from(pid).ok())
            .ok_or(Errno::ESRCH)?;
        killpg(Pid::from_raw(pid), signal)
    }

    /// Kill the child and its group without waiting.
    fn force_kill(&mut self) {
        #[cfg(unix)]
        {
            if let Err(e) = self.signal_group(Signal::SIGKILL) {
                tracing::debug!(program = %self.program, error = %e, "Failed to kill process group");
            }
        }
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(program = %self.program, error = %e, "Failed to kill child");
        }
    }

    /// Wait up to `grace` for the child to exit, then kill it.
    ///
    /// On Unix the rest of the process group gets the same deadline.
    pub async fn reap(&mut self, grace: Duration) -> Option<ExitStatus> {
        let deadline = time::Instant::now() + grace;

        let status = match time::timeout_at(deadline, self.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::warn!(program = %self.program, error = %e, "Failed to reap child");
                None
            }
            Err(_) => {
                tracing::warn!(
                    program = %self.program,
                    pid = ?self.pid,
                    grace_secs = grace.as_secs_f64(),
                    "Child still running after grace period, killing"
                );
                self.force_kill();
                match time::timeout(FORCE_KILL_WAIT, self.wait()).await {
                    Ok(Ok(status)) => Some(status),
                    _ => {
                        tracing::warn!(program = %self.program, pid = ?self.pid, "Child did not exit after kill");
                        None
                    }
                }
            }
        };

        #[cfg(unix)]
        {
            self.drain_group(deadline).await;
        }

        status
    }

    /// Wait for the remaining group members until `deadline`, then kill them.
    #[cfg(unix)]
    async fn drain_group(&self, deadline: time::Instant) {
        while self.signal_group(None::<Signal>).is_ok() {
            if time::Instant::now() >= deadline {
                tracing::warn!(program = %self.program, pgid = ?self.pid, "Process group outlived the grace period, killing");
                if let Err(e) = self.signal_group(Signal::SIGKILL) {
                    tracing::debug!(program = %self.program, error = %e, "Failed to kill process group");
                }
                return;
            }
            time::sleep(GROUP_POLL_INTERVAL).await;
        }
    }

    /// Captured stderr so far; after exit, waits briefly for the reader to drain.
    pub async fn stderr_output(&mut self) -> String {
        if self.exit_status.is_some() {
            if let Some(mut reader) = self.reader.take() {
                if time::timeout(STDERR_DRAIN_TIMEOUT, &mut reader).await.is_err() {
                    self.reader = Some(reader);
                }
            }
        }
        let buf = self.captured.lock().expect("stderr buffer mutex poisoned");
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Exit code to report for a child exit status.
///
/// Signal deaths have no code and map to 1.
pub fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
