//! CLI command implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use alembic_engine::{Reconciler, ResourceState};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{Config, StateFile};
use crate::error::CliResult;

pub mod apply;
pub mod delete;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod state;
pub mod version;

/// Paths and cancellation shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    /// Desired-state configuration file
    pub config_path: PathBuf,
    /// Persisted state file
    pub state_path: PathBuf,
    /// Cancelled on Ctrl-C
    pub cancel: CancellationToken,
}

impl Context {
    /// Create a context
    pub fn new(config_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            state_path: state_path.into(),
            cancel: CancellationToken::new(),
        }
    }
}

/// Loaded configuration, state and an engine bound to the provider
pub struct Workspace {
    pub config: Config,
    pub state: StateFile,
    pub reconciler: Reconciler,
    state_path: PathBuf,
}

impl Workspace {
    /// Load and validate the configuration, then load state
    pub fn load(ctx: &Context) -> CliResult<Self> {
        let config = Config::load(&ctx.config_path)?;
        config.validate()?;
        let state = StateFile::load(&ctx.state_path)?;

        debug!(
            config = %ctx.config_path.display(),
            state = %ctx.state_path.display(),
            resources = config.resources.len(),
            stored = state.resources.len(),
            "workspace loaded"
        );

        let reconciler = Reconciler::new(Arc::new(config.provider.clone()));
        Ok(Self {
            config,
            state,
            reconciler,
            state_path: ctx.state_path.clone(),
        })
    }

    /// Persist state
    pub fn save(&self) -> CliResult<()> {
        self.state.save(&self.state_path)
    }

    /// Where state is persisted
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Refresh one stored resource, saving the result.
    ///
    /// Returns `None` when nothing is stored under `name`.
    pub async fn refresh(
        &mut self,
        name: &str,
        cancel: &CancellationToken,
    ) -> CliResult<Option<ResourceState>> {
        let Some(refreshed) = self.read(name, cancel).await? else {
            return Ok(None);
        };

        self.state.put(name, refreshed.clone());
        self.save()?;
        Ok(Some(refreshed))
    }

    /// Read one stored resource from the database without persisting it
    pub async fn read(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> CliResult<Option<ResourceState>> {
        let Some(stored) = self.state.get(name) else {
            return Ok(None);
        };

        // Reach the database the way the configuration currently says to.
        let mut stored = stored.clone();
        if let Some(resource) = self.config.resources.get(name) {
            stored.spec.proxy_command = resource.spec.proxy_command.clone();
            stored.spec.proxy_sleep = resource.spec.proxy_sleep.clone();
            stored.spec.command_timeout = resource.spec.command_timeout.clone();
        }

        Ok(Some(self.reconciler.read(&stored, cancel).await?))
    }

    /// Names present in state but no longer declared
    pub fn orphans(&self) -> Vec<&str> {
        self.state
            .resources
            .keys()
            .filter(|name| !self.config.resources.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Short description of a stored resource
pub fn describe(state: &ResourceState) -> String {
    let revision = if state.has_revision() {
        state.revision.as_str()
    } else {
        "<none>"
    };
    format!("{} {} (at {})", state.kind, state.spec.target, revision)
}
