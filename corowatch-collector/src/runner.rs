//! Bounded execution of external commands.
//!
//! Every command runs in its own process group so that, when the deadline
//! passes, the whole group (including anything the tool forked) can be
//! killed at once instead of leaving orphans behind.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

use crate::error::RunError;

/// Deadline applied to each corosync tool invocation.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// What a command produced before it exited.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output and standard error as written. On unix both streams
    /// share one pipe, so their bytes keep the order the process wrote them.
    /// Elsewhere stdout comes first and the interleaving is lost.
    pub combined: Vec<u8>,
    /// Exit status. A non-zero status is not an error at this layer.
    pub status: ExitStatus,
}

impl CommandOutput {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// The combined output decoded lossily as UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.combined)
    }
}

/// Run `program` with `args`, waiting at most `timeout` for it to exit.
///
/// On expiry the process group is sent `SIGKILL` and `RunError::Timeout`
/// is returned; no partial output is kept.
pub async fn run<I, S>(program: &Path, args: I, timeout: Duration) -> Result<CommandOutput, RunError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);

    #[cfg(unix)]
    let mut reader = {
        let (stdout, stderr, reader) = shared_pipe().map_err(RunError::Spawn)?;
        command.stdout(stdout).stderr(stderr).process_group(0);
        reader
    };
    #[cfg(not(unix))]
    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command.spawn().map_err(RunError::Spawn)?;
    // The command still holds our copies of the write end; EOF only
    // arrives once they are closed.
    drop(command);

    let pid = child.id();
    debug!(program = %program.display(), pid = ?pid, "spawned");

    #[cfg(unix)]
    let output = read_interleaved(&mut child, &mut reader);
    #[cfg(not(unix))]
    let output = read_concatenated(child);
    tokio::pin!(output);

    tokio::select! {
        result = &mut output => result,
        _ = tokio::time::sleep(timeout) => {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            Err(RunError::Timeout(timeout))
        }
    }
}

/// One pipe whose write end serves as both stdout and stderr.
#[cfg(unix)]
fn shared_pipe() -> std::io::Result<(Stdio, Stdio, tokio::net::unix::pipe::Receiver)> {
    let (sender, receiver) = tokio::net::unix::pipe::pipe()?;
    let stdout = sender.into_blocking_fd()?;
    let stderr = stdout.try_clone()?;
    Ok((Stdio::from(stdout), Stdio::from(stderr), receiver))
}

#[cfg(unix)]
async fn read_interleaved(
    child: &mut Child,
    reader: &mut tokio::net::unix::pipe::Receiver,
) -> Result<CommandOutput, RunError> {
    use tokio::io::AsyncReadExt;

    let mut combined = Vec::new();
    reader
        .read_to_end(&mut combined)
        .await
        .map_err(RunError::Wait)?;
    let status = child.wait().await.map_err(RunError::Wait)?;
    Ok(CommandOutput { combined, status })
}

#[cfg(not(unix))]
async fn read_concatenated(child: Child) -> Result<CommandOutput, RunError> {
    let output = child.wait_with_output().await.map_err(RunError::Wait)?;
    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);
    Ok(CommandOutput {
        combined,
        status: output.status,
    })
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let pgid = pid as libc::pid_t;
    // The child was started with process_group(0), so its pid is the group id.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "process group already gone"
        );
    }
}

// Without process groups only the leader can be reached; kill_on_drop handles it.
#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
