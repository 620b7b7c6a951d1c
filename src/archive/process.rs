//! Child process execution with a deadline and bounded output capture.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::core::{CoreError, CoreResult};

/// One program invocation. Arguments are passed as a list; no shell is
/// involved, so paths with spaces or quotes need no escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    /// Lossy string form, for logs and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub truncated: bool,
}

#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn run(&self, command: &ToolCommand) -> CoreResult<ProcessOutput>;
}

/// Runs commands with `tokio::process`.
#[derive(Debug, Clone, Copy)]
pub struct TokioProcessExecutor {
    timeout: Option<Duration>,
    output_cap: usize,
}

impl Default for TokioProcessExecutor {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(600)),
            output_cap: 1024 * 1024,
        }
    }
}

impl TokioProcessExecutor {
    /// `timeout` of `None` waits forever. `output_cap` applies to stdout and
    /// stderr separately.
    pub fn new(timeout: Option<Duration>, output_cap: usize) -> Self {
        Self {
            timeout,
            output_cap,
        }
    }
}

/// Drains `pipe` to the end, keeping at most `cap` bytes.
async fn read_capped<R>(pipe: Option<R>, cap: usize) -> io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return Ok((Vec::new(), false));
    };
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        let n = pipe.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        if n > room {
            truncated = true;
        }
        kept.extend_from_slice(&buf[..n.min(room)]);
    }
    Ok((kept, truncated))
}

#[async_trait]
impl ProcessExecutor for TokioProcessExecutor {
    async fn run(&self, command: &ToolCommand) -> CoreResult<ProcessOutput> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        tracing::info!(
            "Spawning {:?} {:?}",
            command.program,
            command.args_lossy()
        );
        let mut child = cmd
            .spawn()
            .map_err(|e| CoreError::io(e, &command.program))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = self.output_cap;
        let work = async {
            tokio::join!(
                read_capped(stdout, cap),
                read_capped(stderr, cap),
                child.wait()
            )
        };

        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.ok(),
            None => Some(work.await),
        };

        let Some((out, err, status)) = finished else {
            let after = self.timeout.unwrap_or_default();
            tracing::error!(
                "{:?} did not finish within {:?}, killing it",
                command.program,
                after
            );
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to kill {:?}: {}", command.program, e);
            }
            return Err(CoreError::Timeout {
                what: command.program.display().to_string(),
                after,
            });
        };

        let status = status.map_err(|e| CoreError::io(e, &command.program))?;
        let (stdout, out_truncated) = out.map_err(|e| CoreError::io(e, &command.program))?;
        let (stderr, err_truncated) = err.map_err(|e| CoreError::io(e, &command.program))?;
        let truncated = out_truncated || err_truncated;
        if truncated {
            tracing::warn!(
                "Output of {:?} exceeded {} bytes and was truncated",
                command.program,
                cap
            );
        }

        tracing::debug!("{:?} exited with {:?}", command.program, status.code());
        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code: status.code(),
            truncated,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::utils::test_helpers::{setup_test_logging, write_fake_tool, write_script};
    use serial_test::serial;
    use tempfile::tempdir;

    fn command(program: PathBuf, cwd: Option<PathBuf>) -> ToolCommand {
        ToolCommand {
            program,
            args: vec!["a b".into(), "c".into()],
            cwd,
        }
    }

    #[tokio::test]
    #[serial]
    async fn captures_output_and_exit_code() {
        setup_test_logging();
        let dir = tempdir().unwrap();
        let tool = dir.path().join("tool.exe");
        write_fake_tool(&tool, "all ok", "warning", 3).unwrap();

        let out = TokioProcessExecutor::default()
            .run(&command(tool, None))
            .await
            .unwrap();

        assert_eq!(out.stdout, "all ok");
        assert_eq!(out.stderr, "warning");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.truncated);
    }

    #[tokio::test]
    #[serial]
    async fn arguments_are_not_split_and_cwd_is_applied() {
        let dir = tempdir().unwrap();
        let tool = dir.path().join("echo.exe");
        write_script(&tool, "printf '%s|' \"$@\"\npwd 1>&2").unwrap();

        let out = TokioProcessExecutor::default()
            .run(&command(tool, Some(dir.path().to_path_buf())))
            .await
            .unwrap();

        assert_eq!(out.stdout, "a b|c|");
        let cwd = std::fs::canonicalize(out.stderr.trim()).unwrap();
        assert_eq!(cwd, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    #[serial]
    async fn output_beyond_cap_is_dropped() {
        let dir = tempdir().unwrap();
        let tool = dir.path().join("noisy.exe");
        write_script(&tool, "i=0\nwhile [ $i -lt 200 ]; do printf '0123456789'; i=$((i+1)); done").unwrap();

        let out = TokioProcessExecutor::new(None, 64)
            .run(&command(tool, None))
            .await
            .unwrap();

        assert_eq!(out.stdout.len(), 64);
        assert!(out.truncated);
        assert_eq!(out.exit_code, Some(0));
    }

    #[tokio::test]
    #[serial]
    async fn hung_process_is_killed_after_timeout() {
        let dir = tempdir().unwrap();
        let tool = dir.path().join("hang.exe");
        write_script(&tool, "sleep 30").unwrap();

        let started = std::time::Instant::now();
        let err = TokioProcessExecutor::new(Some(Duration::from_millis(200)), 1024)
            .run(&command(tool, None))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Timeout { .. }));
        assert!(err.to_string().ends_with("timed out after 200ms"), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = TokioProcessExecutor::default()
            .run(&command(dir.path().join("nope.exe"), None))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
