//! Running alembic invocations and classifying their outcome.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::command::CommandSpec;
use crate::error::{EngineError, EngineResult};

/// Captured outcome of one process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// The run was abandoned at its time limit. `stdout` and `stderr` hold
    /// whatever was printed before that.
    pub timed_out: bool,
}

impl ExecutionResult {
    /// A successful run that printed `stdout`.
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    /// A run that exited with `code`.
    pub fn failed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    /// A run abandoned at its time limit after printing `stdout` and `stderr`.
    pub fn expired(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: None,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: true,
        }
    }

    fn status_description(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status: {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs a [`CommandSpec`] to completion.
///
/// Implementations report launch failures as `Err` and every completed run,
/// successful or not, as `Ok`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output.
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<ExecutionResult>;

    /// Run the command, abandoning it once `timeout` elapses.
    ///
    /// The default keeps no output from an abandoned run. Runners that can
    /// observe output as it arrives should override this.
    async fn run_with_timeout(
        &self,
        spec: &CommandSpec,
        timeout: Option<Duration>,
    ) -> std::io::Result<ExecutionResult> {
        let Some(limit) = timeout else {
            return self.run(spec).await;
        };
        match tokio::time::timeout(limit, self.run(spec)).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(ExecutionResult::expired("", "")),
        }
    }
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> std::io::Result<ExecutionResult> {
        self.run_with_timeout(spec, None).await
    }

    async fn run_with_timeout(
        &self,
        spec: &CommandSpec,
        timeout: Option<Duration>,
    ) -> std::io::Result<ExecutionResult> {
        let mut child = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .env_clear()
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        // Both pipes are drained together so neither can fill and stall the child.
        let finished = async {
            let (out, err) = tokio::join!(
                drain(stdout_pipe.as_mut(), &mut stdout),
                drain(stderr_pipe.as_mut(), &mut stderr),
            );
            out?;
            err?;
            Ok::<_, std::io::Error>(child.wait().await?)
        };

        let status = match timeout {
            Some(limit) => tokio::time::timeout(limit, finished).await.ok(),
            None => Some(finished.await),
        }
        .transpose()?;

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        match status {
            Some(status) => Ok(ExecutionResult {
                success: status.success(),
                exit_code: status.code(),
                stdout,
                stderr,
                timed_out: false,
            }),
            None => {
                if let Err(e) = child.kill().await {
                    debug!(error = %e, "timed out process already gone");
                }
                Ok(ExecutionResult::expired(stdout, stderr))
            }
        }
    }
}

/// Append everything `pipe` yields to `buf`, chunk by chunk, so an abandoned
/// read still leaves what arrived so far.
async fn drain<S: AsyncRead + Unpin>(pipe: Option<&mut S>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let Some(pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 4096];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Executes commands through a runner, turning failures into errors.
#[derive(Debug)]
pub struct Executor<'a, R: ?Sized> {
    runner: &'a R,
    timeout: Option<Duration>,
}

impl<'a, R: CommandRunner + ?Sized> Executor<'a, R> {
    /// Create an executor without a timeout.
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            timeout: None,
        }
    }

    /// Bound each run by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `spec`, failing on launch errors, timeouts and non-zero exits.
    pub async fn execute(&self, spec: &CommandSpec) -> EngineResult<ExecutionResult> {
        let operation = spec.operation.as_str();
        debug!(
            operation,
            argv = ?spec.argv(),
            env = ?spec.env_keys(),
            dir = %spec.working_dir.display(),
            "running alembic"
        );

        let result = self
            .runner
            .run_with_timeout(spec, self.timeout)
            .await
            .map_err(|e| EngineError::command_execution(operation, e.to_string(), "", ""))?;

        if result.timed_out {
            let limit = self.timeout.unwrap_or_default();
            return Err(EngineError::command_execution(
                operation,
                format!("timed out after {:?}", limit),
                result.stdout,
                result.stderr,
            ));
        }

        if !result.success {
            return Err(EngineError::command_execution(
                operation,
                result.status_description(),
                result.stdout,
                result.stderr,
            ));
        }

        debug!(operation, bytes = result.stdout.len(), "alembic finished");
        Ok(result)
    }
}
