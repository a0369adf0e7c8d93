//! External process execution
//!
//! [`ProcessExecutor`] spawns a program, captures both output streams and
//! enforces a wall-clock timeout. Process exit and the timer are raced in a
//! single `tokio::select!`, so exactly one of them decides the outcome.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, trace, warn};

use crate::error::ProcessError;

/// Exit code shells use for "command not found"
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// A single command to run
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub env: Vec<(String, String)>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout,
            env: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Anything able to run a [`CommandInvocation`]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command, returning trimmed stdout on exit code 0
    async fn execute(&self, invocation: CommandInvocation) -> Result<String, ProcessError>;
}

/// Runs commands as child processes of the current process
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

enum Completion {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
}

#[async_trait]
impl CommandRunner for ProcessExecutor {
    async fn execute(&self, invocation: CommandInvocation) -> Result<String, ProcessError> {
        if let Some(dir) = &invocation.working_dir {
            let is_dir = tokio::fs::metadata(dir)
                .await
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            if !is_dir {
                return Err(ProcessError::InvalidWorkingDirectory { path: dir.clone() });
            }
        }

        debug!(
            "Running {} {:?} in {:?} (timeout {:?})",
            invocation.program, invocation.args, invocation.working_dir, invocation.timeout
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can take down helpers git starts
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let deadline = Instant::now() + invocation.timeout;
        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::CommandNotFound {
                    program: invocation.program.clone(),
                }
            } else {
                ProcessError::SpawnFailed {
                    program: invocation.program.clone(),
                    source: e,
                }
            }
        })?;
        // Gone once the child is reaped, so take it now
        let pid = child.id();

        let mut stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let mut stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        // Both branches borrow `child`; only the branch that completes first
        // produces a value, the other future is dropped.
        let completion = tokio::select! {
            status = child.wait() => Completion::Exited(status),
            _ = sleep_until(deadline) => Completion::TimedOut,
        };

        let status = match completion {
            Completion::TimedOut => {
                warn!(
                    "{} timed out after {:?}, killing pid {:?}",
                    invocation.program, invocation.timeout, pid
                );
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", invocation.program, e);
                }
                stdout_task.abort();
                stderr_task.abort();
                return Err(ProcessError::Timeout(invocation.timeout));
            }
            Completion::Exited(status) => status.map_err(|e| ProcessError::SpawnFailed {
                program: invocation.program.clone(),
                source: e,
            })?,
        };

        // A background process left behind by the child can hold the pipes
        // open after it exits; the same deadline bounds the reads.
        let output = timeout_at(deadline, async {
            let stdout = (&mut stdout_task).await.unwrap_or_default();
            let stderr = (&mut stderr_task).await.unwrap_or_default();
            (stdout, stderr)
        })
        .await;

        let (stdout, stderr) = match output {
            Ok(output) => output,
            Err(_) => {
                warn!(
                    "{} exited but its output was still open after {:?}, killing group {:?}",
                    invocation.program, invocation.timeout, pid
                );
                kill_process_group(pid);
                stdout_task.abort();
                stderr_task.abort();
                return Err(ProcessError::Timeout(invocation.timeout));
            }
        };

        trace!("{} stdout: {}", invocation.program, stdout);
        if !stderr.is_empty() {
            trace!("{} stderr: {}", invocation.program, stderr);
        }

        // Killed by a signal: no exit code
        let exit_code = status.code().unwrap_or(-1);
        match exit_code {
            0 => Ok(stdout.trim().to_string()),
            EXIT_COMMAND_NOT_FOUND => Err(ProcessError::CommandNotFound {
                program: invocation.program,
            }),
            code => Err(ProcessError::ExecutionFailed {
                exit_code: code,
                stderr: stderr.trim().to_string(),
            }),
        }
    }
}

/// SIGKILL every process in the child's group. The child was spawned as
/// group leader, so its pid is the group id.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else { return };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; it touches no memory of ours
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "killpg({}) failed: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            trace!("Error reading child output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
