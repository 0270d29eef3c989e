// Run-to-completion subprocess execution with timeout and cancellation

use super::{CommandSpec, ProcessError};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-call options
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Working directory for the child
    pub cwd: Option<PathBuf>,
    /// Wall-clock limit; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Receives stdout chunks as they arrive
    pub stdout_sink: Option<mpsc::UnboundedSender<String>>,
    /// Receives stderr chunks as they arrive
    pub stderr_sink: Option<mpsc::UnboundedSender<String>>,
    /// Cancelling kills the child
    pub cancel: Option<CancellationToken>,
}

/// Collected output of a finished process
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Why a run stopped before the child finished
enum Interrupted {
    TimedOut,
    Cancelled,
}

/// Spawn `spec` with `args` appended, argv-style (no shell), and wait for it.
///
/// Fails only on spawn failure, timeout, or cancellation. One deadline covers both the
/// child's exit and the drain of its pipes, so a descendant that inherits stdout cannot
/// hold the call open. On timeout or cancel the child's whole process group is killed.
pub async fn run(
    spec: &CommandSpec,
    args: &[String],
    options: RunOptions,
) -> Result<ProcessOutput, ProcessError> {
    let start = Instant::now();
    let command_line = spec.display();

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.prefix_args)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);
    if let Some(cwd) = &options.cwd {
        command.current_dir(cwd);
    }

    debug!(command = %command_line, arg_count = args.len(), cwd = ?options.cwd, "spawning process");

    let mut child = command.spawn().map_err(|source| ProcessError::SpawnFailed {
        command: command_line.clone(),
        source,
    })?;
    // Taken now: the id is gone once the child is reaped.
    let pid = child.id();

    let mut stdout_task = child
        .stdout
        .take()
        .map(|pipe| spawn_collector(pipe, options.stdout_sink.clone()));
    let mut stderr_task = child
        .stderr
        .take()
        .map(|pipe| spawn_collector(pipe, options.stderr_sink.clone()));

    let cancel = options.cancel.clone().unwrap_or_default();
    let deadline = options.timeout.map(|limit| start + limit);
    let limit_ms = options.timeout.map(|t| t.as_millis() as u64).unwrap_or(0);

    let waited = tokio::select! {
        status = child.wait() => Ok(status),
        _ = expired(deadline) => Err(Interrupted::TimedOut),
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
    };
    let status = match waited {
        Ok(status) => status?,
        Err(why) => {
            terminate(&mut child, pid, stdout_task, stderr_task).await;
            return Err(interrupted(why, &command_line, limit_ms));
        }
    };

    // Descendants can keep the pipes open after the direct child exits.
    let drained = tokio::select! {
        output = drain(stdout_task.as_mut(), stderr_task.as_mut()) => Ok(output),
        _ = expired(deadline) => Err(Interrupted::TimedOut),
        _ = cancel.cancelled() => Err(Interrupted::Cancelled),
    };
    let (stdout, stderr) = match drained {
        Ok(output) => output,
        Err(why) => {
            terminate(&mut child, pid, stdout_task, stderr_task).await;
            return Err(interrupted(why, &command_line, limit_ms));
        }
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    info!(
        command = %command_line,
        exit_code = status.code().unwrap_or(-1),
        duration_ms = duration_ms,
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "process exited"
    );

    Ok(ProcessOutput {
        stdout,
        stderr,
        exit_code: status.code(),
        duration_ms,
    })
}

async fn expired(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

fn interrupted(why: Interrupted, command_line: &str, limit_ms: u64) -> ProcessError {
    match why {
        Interrupted::TimedOut => {
            warn!(command = %command_line, timeout_ms = limit_ms, "process timed out, killed");
            ProcessError::Timeout(limit_ms)
        }
        Interrupted::Cancelled => {
            warn!(command = %command_line, "process cancelled, killed");
            ProcessError::Cancelled
        }
    }
}

/// Read a pipe to EOF, forwarding each chunk to the optional sink.
fn spawn_collector<R>(mut pipe: R, sink: Option<mpsc::UnboundedSender<String>>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut collected = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(sink) = &sink {
                        // A dropped receiver only stops live display.
                        let _ = sink.send(String::from_utf8_lossy(&buf[..n]).into_owned());
                    }
                    collected.extend_from_slice(&buf[..n]);
                }
                Err(e) => {
                    debug!(error = %e, "pipe read failed");
                    break;
                }
            }
        }
        String::from_utf8_lossy(&collected).into_owned()
    })
}

async fn drain(
    stdout: Option<&mut JoinHandle<String>>,
    stderr: Option<&mut JoinHandle<String>>,
) -> (String, String) {
    (collected(stdout).await, collected(stderr).await)
}

async fn collected(task: Option<&mut JoinHandle<String>>) -> String {
    match task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

/// Kill the child's process group and stop collecting; output of a killed process is discarded.
async fn terminate(
    child: &mut tokio::process::Child,
    pid: Option<u32>,
    stdout_task: Option<JoinHandle<String>>,
    stderr_task: Option<JoinHandle<String>>,
) {
    kill_group(pid);
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "kill failed, process may have exited");
    }
    let _ = tokio::time::timeout(Duration::from_secs(2), child.wait()).await;
    for task in [stdout_task, stderr_task].into_iter().flatten() {
        task.abort();
    }
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pgid = pid, error = %e, "killpg failed, group may be gone");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}
