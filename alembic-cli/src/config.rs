//! Desired-state configuration and the persisted state file.

use std::path::{Path, PathBuf};

use alembic_engine::config::resolve_project_root;
use alembic_engine::{ProviderConfig, ResourceKind, ResourceSpec, ResourceState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::error::{CliError, CliResult};

/// Default config file name (lives in the working directory)
pub const CONFIG_FILE_NAME: &str = "alembic-provider.toml";

/// Default state file name (lives next to the config file)
pub const STATE_FILE_NAME: &str = "alembic-provider.state.json";

/// Current state file format version
pub const STATE_VERSION: u32 = 1;

/// Desired state: one provider and any number of named resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider-level settings
    pub provider: ProviderConfig,

    /// Migration resources keyed by name
    #[serde(default)]
    pub resources: IndexMap<String, ResourceConfig>,
}

/// One declared migration resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Upgrade (default) or stamp
    #[serde(default)]
    pub kind: ResourceKind,

    /// Target, tag, environment, proxy, ...
    #[serde(flatten)]
    pub spec: ResourceSpec,
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> CliResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file.
    ///
    /// A relative `project_root` is resolved against the file's directory.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.provider.project_root = resolve_project_root(base, &config.provider.project_root);
        Ok(config)
    }

    /// Validate the provider and every resource
    pub fn validate(&self) -> CliResult<()> {
        self.provider.validate()?;
        for (name, resource) in &self.resources {
            resource
                .spec
                .validate()
                .map_err(|e| CliError::Config(format!("resource '{}': {}", name, e)))?;
        }
        Ok(())
    }

    /// Look up a declared resource
    pub fn resource(&self, name: &str) -> CliResult<&ResourceConfig> {
        self.resources
            .get(name)
            .ok_or_else(|| CliError::UnknownResource(name.to_string()))
    }

    /// Resolve a list of names, defaulting to every declared resource
    pub fn select<'a>(&'a self, names: &[String]) -> CliResult<Vec<(&'a str, &'a ResourceConfig)>> {
        if names.is_empty() {
            return Ok(self
                .resources
                .iter()
                .map(|(name, resource)| (name.as_str(), resource))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                self.resources
                    .get_key_value(name)
                    .map(|(k, v)| (k.as_str(), v))
                    .ok_or_else(|| CliError::UnknownResource(name.clone()))
            })
            .collect()
    }
}

/// Persisted state of every managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// Format version
    pub version: u32,

    /// Resource state keyed by name
    #[serde(default)]
    pub resources: IndexMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: IndexMap::new(),
        }
    }
}

impl StateFile {
    /// Load state, or start empty if the file does not exist yet
    pub fn load(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let state: StateFile = serde_json::from_str(&content)?;
        if state.version != STATE_VERSION {
            return Err(CliError::State(format!(
                "unsupported state version {} in {}",
                state.version,
                path.display()
            )));
        }
        Ok(state)
    }

    /// Write state atomically (temp file in the same directory, then rename)
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;
        file.persist(path).map_err(|e| CliError::Io(e.error))?;
        Ok(())
    }

    /// Stored state for a resource
    pub fn get(&self, name: &str) -> Option<&ResourceState> {
        self.resources.get(name)
    }

    /// Store state for a resource
    pub fn put(&mut self, name: impl Into<String>, state: ResourceState) {
        self.resources.insert(name.into(), state);
    }

    /// Forget a resource, returning what was stored
    pub fn remove(&mut self, name: &str) -> Option<ResourceState> {
        self.resources.shift_remove(name)
    }
}

/// Default state path for a config file
pub fn default_state_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join(STATE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(STATE_FILE_NAME))
}
