//! Provider and resource configuration.
//!
//! Both structs are decoded once at the host boundary (TOML, JSON, or built
//! in code) and then handed to the engine read-only.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::command::SubCommand;
use crate::duration::validate_duration;
use crate::error::{EngineError, EngineResult};

/// Default alembic command line.
pub const DEFAULT_COMMAND: &str = "alembic";

/// Default alembic configuration file, relative to the project root.
pub const DEFAULT_CONFIG_FILE: &str = "alembic.ini";

/// Default section within the alembic configuration file.
pub const DEFAULT_SECTION: &str = "alembic";

fn default_command() -> Vec<String> {
    vec![DEFAULT_COMMAND.to_string()]
}

fn default_config_file() -> String {
    DEFAULT_CONFIG_FILE.to_string()
}

fn default_section() -> String {
    DEFAULT_SECTION.to_string()
}

/// Provider-level settings shared by every resource.
///
/// Fixed once at configuration time; operations only ever borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Directory containing the alembic configuration. Commands run here.
    pub project_root: PathBuf,

    /// Argument list used as the alembic command line.
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Name of the alembic configuration file.
    #[serde(default = "default_config_file")]
    pub config: String,

    /// Section within the configuration file.
    #[serde(default = "default_section")]
    pub section: String,

    /// `-x key=value` arguments passed to every invocation.
    #[serde(default)]
    pub extra: IndexMap<String, String>,
}

impl ProviderConfig {
    /// Create a configuration rooted at `project_root` with defaults.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            command: default_command(),
            config: default_config_file(),
            section: default_section(),
            extra: IndexMap::new(),
        }
    }

    /// Set the alembic command line.
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set the configuration file name.
    pub fn config_file(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    /// Set the configuration section.
    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Add an extra option.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Full path of the alembic configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.project_root.join(&self.config)
    }

    /// Whether `-c`/`-n` must be passed because the defaults were overridden.
    pub(crate) fn has_custom_config(&self) -> bool {
        self.config != DEFAULT_CONFIG_FILE
    }

    pub(crate) fn has_custom_section(&self) -> bool {
        self.section != DEFAULT_SECTION
    }

    /// Check the project layout and command line.
    pub fn validate(&self) -> EngineResult<()> {
        if !self.project_root.is_dir() {
            return Err(EngineError::configuration(format!(
                "project_root must be a valid directory path: {}",
                self.project_root.display()
            )));
        }

        if !self.config_path().is_file() {
            return Err(EngineError::configuration(format!(
                "project_root must contain an alembic configuration: {}",
                self.config_path().display()
            )));
        }

        validate_command("command", &self.command)?;
        validate_extra(&self.extra)
    }
}

/// Which revision-targeting sub-command a resource applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Run migrations up to the target (`alembic upgrade`).
    #[default]
    Upgrade,
    /// Record the target without running migrations (`alembic stamp`).
    Stamp,
}

impl ResourceKind {
    /// Sub-command used to move the database to the target.
    pub fn sub_command(self) -> SubCommand {
        match self {
            ResourceKind::Upgrade => SubCommand::Upgrade,
            ResourceKind::Stamp => SubCommand::Stamp,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Upgrade => write!(f, "upgrade"),
            ResourceKind::Stamp => write!(f, "stamp"),
        }
    }
}

/// Desired configuration of a single migration resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Revision identifier or `head`.
    #[serde(default)]
    pub target: String,

    /// Arbitrary tag passed with `--tag`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Environment variables for the alembic process.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,

    /// Overrides the provider command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    /// `-x key=value` arguments appended after the provider ones.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,

    /// Argument list of a proxy kept alive around alembic invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_command: Option<Vec<String>>,

    /// Warm-up wait after starting the proxy (default `PT5S`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_sleep: Option<String>,

    /// Upper bound for each alembic invocation. Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<String>,
}

impl ResourceSpec {
    /// Create a spec targeting `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Set the tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Override the alembic command line.
    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(command.into_iter().map(Into::into).collect());
        self
    }

    /// Add an extra option.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Run `command` as a proxy, waiting `sleep` before the first invocation.
    pub fn proxy<I, S>(mut self, command: I, sleep: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxy_command = Some(command.into_iter().map(Into::into).collect());
        self.proxy_sleep = sleep.map(str::to_string);
        self
    }

    /// Bound each alembic invocation.
    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.command_timeout = Some(timeout.into());
        self
    }

    /// Validate the resource before any process is started.
    pub fn validate(&self) -> EngineResult<()> {
        if self.target.trim().is_empty() {
            return Err(EngineError::configuration("target must not be empty"));
        }

        if let Some(command) = &self.command {
            validate_command("command", command)?;
        }

        if let Some(proxy) = &self.proxy_command {
            validate_command("proxy_command", proxy)?;
        }

        if let Some(sleep) = &self.proxy_sleep {
            validate_duration(sleep)?;
        }

        if let Some(timeout) = &self.command_timeout {
            validate_duration(timeout)?;
        }

        validate_environment(&self.environment)?;
        validate_extra(&self.extra)
    }
}

fn validate_command(field: &str, command: &[String]) -> EngineResult<()> {
    match command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(EngineError::configuration(format!(
            "{} must contain at least a program name",
            field
        ))),
    }
}

pub(crate) fn validate_environment(environment: &IndexMap<String, String>) -> EngineResult<()> {
    for key in environment.keys() {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(EngineError::configuration(format!(
                "invalid environment variable name '{}'",
                key
            )));
        }
    }
    Ok(())
}

fn validate_extra(extra: &IndexMap<String, String>) -> EngineResult<()> {
    if extra.keys().any(|key| key.is_empty()) {
        return Err(EngineError::configuration("extra keys must not be empty"));
    }
    Ok(())
}

/// Resolve a possibly relative project root against `base`.
pub fn resolve_project_root(base: &Path, root: &Path) -> PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        base.join(root)
    }
}
