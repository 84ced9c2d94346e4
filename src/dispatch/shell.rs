//! Shell executor - runs action references through the user's shell

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ActionExecutor, DispatchError, DispatchResult, DEFAULT_TIMEOUT};
use crate::config::ShellConfig;

/// Runs actions as `<shell> [-i] -c <action>`
///
/// The interactive flag makes aliases and functions from the user's rc files
/// visible. Each action leads its own session, so a Ctrl+C aimed at the
/// controller does not reach it, an interactive shell never finds itself in a
/// background group of the controller's terminal, and a timeout can take the
/// whole group down.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell_path: PathBuf,
    timeout: Duration,
    work_dir: Option<PathBuf>,
    interactive: bool,
}

impl ShellExecutor {
    pub fn new(shell_path: impl Into<PathBuf>) -> Self {
        Self {
            shell_path: shell_path.into(),
            timeout: DEFAULT_TIMEOUT,
            work_dir: None,
            interactive: true,
        }
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            shell_path: PathBuf::from(&config.shell_path),
            timeout: Duration::from_secs(config.timeout_secs),
            work_dir: config.work_dir.as_ref().map(PathBuf::from),
            interactive: config.interactive,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn command(&self, action_ref: &str) -> Command {
        let mut cmd = Command::new(&self.shell_path);
        if self.interactive {
            cmd.arg("-i");
        }
        cmd.arg("-c")
            .arg(action_ref)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        unsafe {
            // Only async-signal-safe calls between fork and exec
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(())
                }
            });
        }

        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl ActionExecutor for ShellExecutor {
    async fn execute(&self, action_ref: &str) -> DispatchResult {
        let started = Instant::now();
        debug!("🔄 Executing: {}", action_ref);

        let mut child = match self.command(action_ref).spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("💥 Error executing {}: {}", action_ref, e);
                return DispatchResult::failed(
                    DispatchError::Spawn {
                        shell: self.shell_path.display().to_string(),
                        reason: e.to_string(),
                    },
                    started.elapsed(),
                );
            }
        };

        let pid = child.id();
        let stdout_task = spawn_reader(child.stdout.take());
        let stderr_task = spawn_reader(child.stderr.take());

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                terminate(&mut child, pid).await;
                stdout_task.abort();
                stderr_task.abort();
                error!("💥 Error waiting for {}: {}", action_ref, e);
                let mut result =
                    DispatchResult::failed(DispatchError::Wait(e.to_string()), started.elapsed());
                result.pid = pid;
                return result;
            }
            Err(_) => {
                terminate(&mut child, pid).await;
                // Readers may never see EOF if a grandchild escaped the group
                stdout_task.abort();
                stderr_task.abort();
                error!("⏰ Timeout executing: {} (after {:?})", action_ref, self.timeout);
                let mut result =
                    DispatchResult::failed(DispatchError::Timeout(self.timeout), started.elapsed());
                result.pid = pid;
                return result;
            }
        };

        let stdout = collect(stdout_task).await;
        let stderr = collect(stderr_task).await;

        if let Some(out) = &stdout {
            debug!("📤 Output: {}", out);
        }
        if let Some(err) = &stderr {
            warn!("⚠️  Error output: {}", err);
        }

        let succeeded = status.success();
        if succeeded {
            info!("✅ Successfully executed: {}", action_ref);
        } else {
            error!("❌ Failed to execute: {} ({})", action_ref, status);
        }

        DispatchResult {
            succeeded,
            exit_code: status.code(),
            stdout,
            stderr,
            timed_out: false,
            pid,
            elapsed: started.elapsed(),
            error: (!succeeded).then(|| DispatchError::NonZeroExit(status.code())),
        }
    }
}

fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            // Partial output is still useful if the read fails midway
            let _ = stream.read_to_end(&mut buf).await;
        }
        String::from_utf8_lossy(&buf).trim().to_string()
    })
}

async fn collect(task: JoinHandle<String>) -> Option<String> {
    match task.await {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            debug!("Output reader ended early: {}", e);
            None
        }
    }
}

/// Kill the action's process group and reap the shell
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            // The shell called setsid(), so pgid == sid == pid
            let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                debug!(
                    "killpg({}) failed: {}",
                    pid,
                    std::io::Error::last_os_error()
                );
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.start_kill() {
        debug!("start_kill after group kill: {}", e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap timed-out action: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh() -> ShellExecutor {
        ShellExecutor::new("/bin/sh").interactive(false)
    }

    #[tokio::test]
    async fn test_successful_action_captures_output() {
        let result = sh().execute("echo hello").await;

        assert!(result.succeeded);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.as_deref(), Some("hello"));
        assert!(!result.timed_out);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_stderr_alone_is_not_failure() {
        let result = sh().execute("echo oops >&2").await;

        assert!(result.succeeded);
        assert_eq!(result.stderr.as_deref(), Some("oops"));
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let result = sh().execute("exit 3").await;

        assert!(!result.succeeded);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.error, Some(DispatchError::NonZeroExit(Some(3))));
    }

    #[tokio::test]
    async fn test_missing_shell_reports_spawn_error() {
        let result = ShellExecutor::new("/definitely/not/a/shell")
            .execute("echo hi")
            .await;

        assert!(!result.succeeded);
        assert!(!result.timed_out);
        assert!(matches!(result.error, Some(DispatchError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let executor = sh().with_timeout(Duration::from_millis(200));
        let result = executor.execute("sleep 5").await;

        assert!(result.timed_out);
        assert!(!result.succeeded);
        assert!(result.elapsed < Duration::from_secs(5));

        let pid = result.pid.expect("pid recorded");
        // Reaped and gone: the pid no longer names a live process
        let alive = unsafe { libc::kill(pid as libc::pid_t, 0) } == 0;
        assert!(!alive, "process {} still running after timeout", pid);
    }

    #[test]
    fn test_from_config() {
        let config = ShellConfig {
            shell_path: "/bin/sh".into(),
            timeout_secs: 12,
            work_dir: None,
            interactive: false,
        };
        let executor = ShellExecutor::from_config(&config);

        assert_eq!(executor.timeout(), Duration::from_secs(12));
        assert_eq!(ShellExecutor::new("/bin/sh").timeout(), DEFAULT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_interactive_shell_runs_action() {
        // Default executor passes -i
        let result = ShellExecutor::new("/bin/sh").execute("echo hi").await;

        assert!(result.succeeded, "interactive shell failed: {:?}", result);
        assert!(!result.timed_out);
        assert_eq!(result.stdout.as_deref(), Some("hi"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_runs_in_own_session() {
        // Field 6 of /proc/<pid>/stat is the session id
        let result = sh()
            .execute("read -r _ _ _ _ _ sid _ < /proc/$$/stat; echo $sid")
            .await;

        assert!(result.succeeded);
        let sid: u32 = result.stdout.unwrap().trim().parse().unwrap();
        assert_eq!(Some(sid), result.pid);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_runs_in_own_process_group() {
        // Field 5 of /proc/<pid>/stat is the process group id
        let result = sh()
            .execute("read -r _ _ _ _ pgrp _ < /proc/$$/stat; echo $pgrp")
            .await;

        assert!(result.succeeded);
        let pgid: u32 = result.stdout.unwrap().trim().parse().unwrap();
        assert_eq!(Some(pgid), result.pid);
    }

    #[tokio::test]
    async fn test_work_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let result = sh().with_work_dir(dir.path()).execute("pwd").await;

        assert!(result.succeeded);
        let reported = std::fs::canonicalize(result.stdout.unwrap()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_environment_is_inherited() {
        let result = sh().execute("test -n \"$PATH\"").await;
        assert!(result.succeeded);
    }
}
