//! Lifecycle of the optional database proxy.
//!
//! Some databases are only reachable through a local proxy (for example
//! `cloud-sql-proxy`). The proxy is started before the first alembic
//! invocation of an operation and killed once the operation is over,
//! whichever way it ends.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

/// Ownership of a running proxy process.
///
/// [`ProxyGuard::stop`] kills and reaps the process. A guard dropped without
/// `stop` (panic, cancelled future) still sends the kill signal.
#[derive(Debug)]
pub struct ProxyGuard {
    child: Option<Child>,
    command: Vec<String>,
}

impl ProxyGuard {
    /// OS process id, while the proxy is running.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// The argument vector the proxy was started with.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Terminate the proxy and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(mut child) = self.child.take() {
            match terminate(&mut child).await {
                Ok(()) => debug!(command = ?self.command, "proxy stopped"),
                Err(e) => warn!(command = ?self.command, error = %e, "failed to stop proxy"),
            }
        }
    }
}

/// Kill and reap `child`. A process that has already exited is not an error.
async fn terminate(child: &mut Child) -> std::io::Result<()> {
    if child.try_wait()?.is_some() {
        return Ok(());
    }
    child.kill().await
}

impl Drop for ProxyGuard {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            warn!(command = ?self.command, "proxy dropped without stop, killing");
            let _ = child.start_kill();
        }
    }
}

/// Starts proxies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyLauncher;

impl ProxyLauncher {
    /// Start `command` and wait `warm_up` for it to accept connections.
    ///
    /// Returns `Ok(None)` when no proxy is configured. Cancelling `cancel`
    /// during the warm-up stops the proxy and returns [`EngineError::Cancelled`].
    pub async fn start(
        &self,
        command: Option<&[String]>,
        warm_up: Duration,
        cancel: &CancellationToken,
    ) -> EngineResult<Option<ProxyGuard>> {
        let Some(command) = command else {
            return Ok(None);
        };

        let (program, args) = command.split_first().ok_or_else(|| {
            EngineError::configuration("proxy_command must contain at least a program name")
        })?;

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::ProxyStart {
                command: command.to_vec(),
                source,
            })?;

        let mut guard = ProxyGuard {
            child: Some(child),
            command: command.to_vec(),
        };
        info!(command = ?guard.command, pid = ?guard.id(), ?warm_up, "proxy started");

        tokio::select! {
            _ = tokio::time::sleep(warm_up) => {}
            _ = cancel.cancelled() => {
                guard.stop().await;
                return Err(EngineError::Cancelled);
            }
        }

        if let Some(child) = guard.child.as_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                warn!(command = ?guard.command, %status, "proxy exited during warm-up");
            }
        }

        Ok(Some(guard))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    fn is_running(pid: u32) -> bool {
        std::path::Path::new(&format!("/proc/{}", pid)).exists()
            || std::process::Command::new("kill")
                .args(["-0", &pid.to_string()])
                .status()
                .map(|s| s.success())
                .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_no_proxy_configured() {
        let guard = ProxyLauncher
            .start(None, Duration::ZERO, &CancellationToken::new())
            .await
            .unwrap();
        assert!(guard.is_none());
    }

    #[tokio::test]
    async fn test_empty_command_is_configuration_error() {
        let err = ProxyLauncher
            .start(Some(&[]), Duration::ZERO, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_start_failure() {
        let command = argv(&["/nonexistent/cloud-sql-proxy"]);
        let err = ProxyLauncher
            .start(Some(&command), Duration::ZERO, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ProxyStart { .. }));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let command = argv(&["sleep", "30"]);
        let guard = ProxyLauncher
            .start(Some(&command), Duration::from_millis(10), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        let pid = guard.id().unwrap();
        assert!(is_running(pid));
        assert_eq!(guard.command(), command.as_slice());

        guard.stop().await;
        assert!(!is_running(pid));
    }

    #[tokio::test]
    async fn test_cancel_during_warm_up() {
        let command = argv(&["sleep", "30"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = std::time::Instant::now();
        let err = ProxyLauncher
            .start(Some(&command), Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_proxy_exiting_early_is_not_an_error() {
        let command = argv(&["true"]);
        let guard = ProxyLauncher
            .start(Some(&command), Duration::from_millis(200), &CancellationToken::new())
            .await
            .unwrap();
        assert!(guard.is_some());
        guard.unwrap().stop().await;
    }

    #[tokio::test]
    async fn test_terminate_after_exit_during_warm_up() {
        let command = argv(&["true"]);
        let mut guard = ProxyLauncher
            .start(Some(&command), Duration::from_millis(200), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        // The warm-up check has already reaped the process.
        let mut child = guard.child.take().unwrap();
        assert!(child.try_wait().unwrap().is_some());
        assert!(terminate(&mut child).await.is_ok());
        assert!(terminate(&mut child).await.is_ok());
    }

    #[tokio::test]
    async fn test_terminate_running_proxy() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id().unwrap();
        terminate(&mut child).await.unwrap();
        assert!(!is_running(pid));
    }
}
