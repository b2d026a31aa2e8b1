//! Runs a diff command with its stdout connected to the parser.
//!
//! The child writes into an OS pipe that the caller reads while a supervisor
//! task waits for the child, collects stderr and enforces the timeout. The
//! pipe buffer is the only buffering between the two sides. Dropping the
//! stdout reader closes the read end, so a child that is still writing fails
//! fast instead of blocking.
//!
//! git hands the actual diffing to another process (an external diff driver
//! or a subcommand), which inherits the pipe. On unix the child is started in
//! its own process group and the whole group is killed on timeout, otherwise
//! that helper would keep the pipe open past the deadline.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::command::DiffCommand;

/// Errors of the external diff process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed while waiting for {description}: {source}")]
    Wait {
        description: String,
        #[source]
        source: io::Error,
    },

    #[error("{description} exited with {status}: {stderr}")]
    Exit {
        description: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{description} timed out after {timeout:?}")]
    Timeout {
        description: String,
        timeout: Duration,
    },
}

/// Spawns diff commands with a wall-clock limit.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start `command` and hand back its stdout together with a handle that
    /// resolves once the process is gone.
    pub fn spawn(&self, command: &DiffCommand) -> Result<(ChildStdout, ProcessHandle), ProcessError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&command.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| ProcessError::Spawn {
            program: command.program.clone(),
            source: io::Error::other("stdout was not captured"),
        })?;
        let stderr = child.stderr.take();

        log::debug!("Spawned {}", command.description);
        let task = tokio::spawn(supervise(
            child,
            stderr,
            self.timeout,
            command.description.clone(),
        ));

        Ok((
            stdout,
            ProcessHandle {
                task,
                description: command.description.clone(),
            },
        ))
    }
}

/// Completion of a spawned diff process.
#[derive(Debug)]
pub struct ProcessHandle {
    task: JoinHandle<Result<(), ProcessError>>,
    description: String,
}

impl ProcessHandle {
    /// Wait for the process; `Ok` only for a zero exit within the timeout.
    pub async fn wait(self) -> Result<(), ProcessError> {
        match self.task.await {
            Ok(result) => result,
            Err(join_err) => Err(ProcessError::Wait {
                description: self.description,
                source: io::Error::other(join_err),
            }),
        }
    }
}

async fn supervise(
    mut child: Child,
    stderr: Option<ChildStderr>,
    timeout: Duration,
    description: String,
) -> Result<(), ProcessError> {
    let collect_stderr = async {
        let mut captured = Vec::new();
        if let Some(mut stderr) = stderr {
            // A failed read only shortens the diagnostics.
            let _ = stderr.read_to_end(&mut captured).await;
        }
        captured
    };

    let mut group = ProcessGroupGuard::new(&child);
    let finished = tokio::time::timeout(timeout, async {
        tokio::join!(child.wait(), collect_stderr)
    })
    .await;
    if finished.is_ok() {
        // Reaped; the group id may be reused from here on.
        group.disarm();
    }

    match finished {
        Ok((Ok(status), _)) if status.success() => Ok(()),
        Ok((Ok(status), stderr)) => Err(ProcessError::Exit {
            description,
            status,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        }),
        Ok((Err(source), _)) => Err(ProcessError::Wait {
            description,
            source,
        }),
        Err(_) => {
            group.kill();
            if let Err(err) = child.kill().await {
                log::warn!("Failed to kill {} after timeout: {}", description, err);
            }
            Err(ProcessError::Timeout {
                description,
                timeout,
            })
        }
    }
}

/// Kills the process group led by a child unless disarmed, also when the
/// supervisor is dropped mid-wait.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) touches no memory of ours. The negative id addresses the
    // group created by `process_group(0)`, whose leader is not reaped yet.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        log::debug!(
            "Failed to kill process group {}: {}",
            pgid,
            io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}
