//! Status command execution for clumon
//!
//! Handles running the cluster status query:
//! - Spawns the configured argv directly (no shell)
//! - Reads stdout and stderr while waiting for exit
//! - Runs in its own process group (unix) so helpers it starts die with it
//! - Bounded by an optional timeout, after which the group is killed and reaped
//! - Non-zero exits are not errors: the output is still handed back

use std::future::Future;
use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command as AsyncCommand};
use tracing::{debug, warn};

/// Captured result of one status command run
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub execution_time_ms: u128,
}

impl CommandOutput {
    /// Output of a command that exited 0 with `stdout` and nothing on stderr
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            execution_time_ms: 0,
        }
    }
}

/// Failure to obtain status output at all
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` did not finish within {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("failed to collect output of `{command}`: {source}")]
    Output {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl SampleError {
    /// Launch failures will not fix themselves between samples
    pub fn is_fatal(&self) -> bool {
        matches!(self, SampleError::Launch { .. })
    }
}

/// Where the sampler gets its status text from
pub trait StatusSource {
    fn fetch(&mut self) -> impl Future<Output = Result<CommandOutput, SampleError>> + Send;
}

/// Runs an external command (`crm status` by default)
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandSource {
    /// `argv[0]` is the program, the rest its arguments
    pub fn new(argv: &[String], timeout: Option<Duration>) -> io::Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty status command"))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn execute(&self) -> Result<CommandOutput, SampleError> {
        let start_time = Instant::now();
        let command = self.command_line();
        debug!("Executing status command: {} (timeout: {:?})", command, self.timeout);

        let mut builder = AsyncCommand::new(&self.program);
        builder
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        builder.process_group(0);

        let mut child = builder
            .spawn()
            .map_err(|source| SampleError::Launch { command: command.clone(), source })?;
        // Armed until the output is fully collected; dropping it kills the group
        let mut group = GroupGuard::new(&child, &command);

        let collected = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, collect_output(&mut child)).await;
                match waited {
                    Ok(collected) => collected,
                    Err(_) => {
                        group.kill();
                        reap(&mut child, &command).await;
                        return Err(SampleError::Timeout {
                            command,
                            timeout_secs: limit.as_secs(),
                        });
                    }
                }
            }
            None => collect_output(&mut child).await,
        };

        let (status, stdout, stderr) =
            collected.map_err(|source| SampleError::Output { command: command.clone(), source })?;
        group.disarm();

        Ok(CommandOutput {
            success: status.success(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}

impl StatusSource for CommandSource {
    fn fetch(&mut self) -> impl Future<Output = Result<CommandOutput, SampleError>> + Send {
        self.execute()
    }
}

/// Drain both pipes while waiting for the child to exit
async fn collect_output(child: &mut Child) -> io::Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>)> {
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let read_stdout = async {
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut stdout).await?;
        }
        Ok::<(), io::Error>(())
    };
    let read_stderr = async {
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut stderr).await?;
        }
        Ok::<(), io::Error>(())
    };

    let (stdout_read, stderr_read, status) = tokio::join!(read_stdout, read_stderr, child.wait());
    stdout_read?;
    stderr_read?;
    Ok((status?, stdout, stderr))
}

/// SIGKILLs the command's process group when dropped while armed
struct GroupGuard {
    pgid: Option<u32>,
    command: String,
}

impl GroupGuard {
    /// With `process_group(0)` the group id is the child's pid
    fn new(child: &Child, command: &str) -> Self {
        Self {
            pgid: child.id(),
            command: command.to_string(),
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    #[cfg(unix)]
    fn kill(&mut self) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.pgid.take() else { return };
        let Ok(raw) = i32::try_from(pgid) else { return };
        match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!("Failed to kill process group of `{}`: {}", self.command, e),
        }
    }

    // kill_on_drop already covers the direct child
    #[cfg(not(unix))]
    fn kill(&mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Kill the child and wait for it so no zombie is left behind
async fn reap(child: &mut Child, command: &str) {
    if let Err(e) = child.kill().await {
        warn!("Failed to kill timed out command `{}`: {}", command, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = CommandSource::new(&[], None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_command_line() {
        let source = CommandSource::new(&argv(&["crm", "status"]), None).unwrap();
        assert_eq!(source.command_line(), "crm status");
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let mut source = CommandSource::new(&argv(&["sh", "-c", "echo 'Online: [ n1 ]'"]), Some(Duration::from_secs(5))).unwrap();
        let output = source.fetch().await.unwrap();

        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "Online: [ n1 ]\n");
        assert!(output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_non_zero_exit_still_returns_output() {
        let script = "echo 'OFFLINE: [ n2 ]'; echo 'connection refused' >&2; exit 3";
        let mut source = CommandSource::new(&argv(&["sh", "-c", script]), None).unwrap();
        let output = source.fetch().await.unwrap();

        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert!(output.stdout.contains("OFFLINE: [ n2 ]"));
        assert!(output.stderr.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_missing_program_is_fatal_launch_error() {
        let mut source = CommandSource::new(&argv(&["/nonexistent/clumon-crm"]), None).unwrap();
        let err = source.fetch().await.unwrap_err();

        assert!(matches!(err, SampleError::Launch { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let mut source = CommandSource::new(&argv(&["sleep", "10"]), Some(Duration::from_secs(1))).unwrap();
        let start = Instant::now();
        let err = source.fetch().await.unwrap_err();

        // Command should timeout and fail
        assert!(matches!(err, SampleError::Timeout { timeout_secs: 1, .. }));
        assert!(!err.is_fatal());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
