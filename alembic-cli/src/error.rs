//! CLI error types and result alias.

use alembic_engine::EngineError;
use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(alembic::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(alembic::config))]
    Config(String),

    /// State file error
    #[error("State error: {0}")]
    #[diagnostic(code(alembic::state))]
    State(String),

    /// Unknown resource name
    #[error("Resource '{0}' is not declared in the configuration")]
    #[diagnostic(
        code(alembic::unknown_resource),
        help("declare it under [resources.<name>] in the configuration file")
    )]
    UnknownResource(String),

    /// Reconciliation failure
    #[error(transparent)]
    #[diagnostic(code(alembic::engine))]
    Engine(#[from] EngineError),
}

impl CliError {
    /// Captured tool output or other detail worth printing below the error.
    pub fn detail(&self) -> Option<String> {
        match self {
            CliError::Engine(err) => err.diagnostic(),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::State(format!("Failed to read or write state: {}", err))
    }
}
