//! Error types for the reconciliation engine.

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while reconciling migration state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Provider or resource configuration could not be decoded or is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The auxiliary proxy process could not be launched.
    #[error("Failed to start proxy {command:?}: {source}")]
    ProxyStart {
        /// Argument vector of the proxy.
        command: Vec<String>,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The migration tool failed to launch or exited unsuccessfully.
    #[error("alembic {operation} failed: {reason}")]
    CommandExecution {
        /// Sub-operation that was running (`current`, `upgrade`, ...).
        operation: String,
        /// Launch error or exit status description.
        reason: String,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Expected pattern was not found in the tool output.
    #[error("Failed parsing alembic output: pattern '{pattern}' did not match")]
    OutputParse {
        /// The pattern that was searched for.
        pattern: String,
        /// The output that was searched.
        output: String,
    },

    /// The operation was cancelled before the proxy became ready.
    #[error("Operation cancelled")]
    Cancelled,

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a command execution error.
    pub fn command_execution(
        operation: impl Into<String>,
        reason: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandExecution {
            operation: operation.into(),
            reason: reason.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Create an output parse error.
    pub fn output_parse(pattern: impl Into<String>, output: impl Into<String>) -> Self {
        Self::OutputParse {
            pattern: pattern.into(),
            output: output.into(),
        }
    }

    /// Check if the caller may reasonably retry the operation.
    ///
    /// Tool failures are never retried by the engine; only a cancelled
    /// operation is safe to start again as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Detailed diagnostic text including captured tool output, if any.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            Self::CommandExecution { stdout, stderr, .. } => Some(format!(
                "Standard Output:\n{}\n\nStandard Error:\n{}\n",
                stdout, stderr
            )),
            Self::OutputParse { output, .. } => Some(format!(
                "If alembic changed its output format, the parser needs updating.\n\nStandard Output:\n{}\n",
                output
            )),
            _ => None,
        }
    }
}
