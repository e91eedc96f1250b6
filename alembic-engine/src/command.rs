//! Assembly of alembic invocations.
//!
//! Argument order is fixed:
//!
//! ```text
//! <command...> [-c config] [-n section] [-x k=v (provider)...] [-x k=v (resource)...]
//!     <sub-command> [--tag <tag>] [<target>]
//! ```
//!
//! The environment starts from `PATH` alone and only grows with variables
//! the resource supplies explicitly.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::config::{ProviderConfig, ResourceSpec, validate_environment};
use crate::error::{EngineError, EngineResult};

/// Name of the only host variable forwarded to the tool.
pub const PATH_VAR: &str = "PATH";

/// Alembic sub-commands issued by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubCommand {
    /// Print the revision currently applied to the database.
    Current,
    /// Run migrations up to a revision.
    Upgrade,
    /// Record a revision without running migrations.
    Stamp,
    /// Describe a revision, resolving symbolic names.
    Show,
}

impl SubCommand {
    /// Command-line name of the sub-command.
    pub fn as_str(self) -> &'static str {
        match self {
            SubCommand::Current => "current",
            SubCommand::Upgrade => "upgrade",
            SubCommand::Stamp => "stamp",
            SubCommand::Show => "show",
        }
    }

    /// Whether the sub-command takes a positional revision.
    pub fn takes_target(self) -> bool {
        !matches!(self, SubCommand::Current)
    }

    /// Whether `--tag` applies to the sub-command.
    pub fn accepts_tag(self) -> bool {
        matches!(self, SubCommand::Upgrade | SubCommand::Stamp)
    }
}

impl fmt::Display for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully assembled alembic invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Sub-command this invocation runs.
    pub operation: SubCommand,
    /// Program to execute.
    pub program: String,
    /// Arguments following the program.
    pub args: Vec<String>,
    /// Complete environment of the child, in application order.
    pub env: Vec<(String, String)>,
    /// Working directory of the child.
    pub working_dir: PathBuf,
}

impl CommandSpec {
    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Environment variable names, for logging without leaking values.
    pub fn env_keys(&self) -> Vec<&str> {
        self.env.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Effective value of an environment variable (last assignment wins).
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds [`CommandSpec`]s for one resource.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    provider: &'a ProviderConfig,
    resource: &'a ResourceSpec,
}

impl<'a> CommandBuilder<'a> {
    /// Create a builder merging provider defaults with resource settings.
    pub fn new(provider: &'a ProviderConfig, resource: &'a ResourceSpec) -> Self {
        Self { provider, resource }
    }

    /// `alembic current`.
    pub fn current(&self) -> EngineResult<CommandSpec> {
        self.build(SubCommand::Current, None)
    }

    /// `alembic show <target>`.
    pub fn show(&self, target: &str) -> EngineResult<CommandSpec> {
        self.build(SubCommand::Show, Some(target))
    }

    /// `alembic upgrade [--tag t] <target>`.
    pub fn upgrade(&self, target: &str) -> EngineResult<CommandSpec> {
        self.build(SubCommand::Upgrade, Some(target))
    }

    /// `alembic stamp [--tag t] <target>`.
    pub fn stamp(&self, target: &str) -> EngineResult<CommandSpec> {
        self.build(SubCommand::Stamp, Some(target))
    }

    /// Build an invocation of `operation`.
    pub fn build(&self, operation: SubCommand, target: Option<&str>) -> EngineResult<CommandSpec> {
        let base = self
            .resource
            .command
            .as_deref()
            .unwrap_or(&self.provider.command);

        let (program, rest) = base.split_first().ok_or_else(|| {
            EngineError::configuration("alembic command must contain at least a program name")
        })?;

        let mut args: Vec<String> = rest.to_vec();

        if self.provider.has_custom_config() {
            args.push("-c".to_string());
            args.push(self.provider.config.clone());
        }
        if self.provider.has_custom_section() {
            args.push("-n".to_string());
            args.push(self.provider.section.clone());
        }

        push_extras(&mut args, &self.provider.extra);
        push_extras(&mut args, &self.resource.extra);

        args.push(operation.as_str().to_string());

        if operation.takes_target() {
            let target = target.filter(|t| !t.is_empty()).ok_or_else(|| {
                EngineError::configuration(format!("alembic {} requires a target revision", operation))
            })?;

            if operation.accepts_tag() {
                if let Some(tag) = &self.resource.tag {
                    args.push("--tag".to_string());
                    args.push(tag.clone());
                }
            }

            args.push(target.to_string());
        }

        Ok(CommandSpec {
            operation,
            program: program.clone(),
            args,
            env: self.environment()?,
            working_dir: self.provider.project_root.clone(),
        })
    }

    fn environment(&self) -> EngineResult<Vec<(String, String)>> {
        validate_environment(&self.resource.environment)?;

        let path = std::env::var_os(PATH_VAR)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut env = Vec::with_capacity(self.resource.environment.len() + 1);
        env.push((PATH_VAR.to_string(), path));
        env.extend(
            self.resource
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(env)
    }
}

fn push_extras(args: &mut Vec<String>, extra: &IndexMap<String, String>) {
    for (key, value) in extra {
        args.push("-x".to_string());
        args.push(format!("{}={}", key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn provider() -> ProviderConfig {
        ProviderConfig::new("/srv/app")
    }

    #[test]
    fn test_current_defaults() {
        let provider = provider();
        let resource = ResourceSpec::new("head");
        let spec = CommandBuilder::new(&provider, &resource).current().unwrap();

        assert_eq!(spec.program, "alembic");
        assert_eq!(spec.args, vec!["current"]);
        assert_eq!(spec.working_dir, PathBuf::from("/srv/app"));
        assert_eq!(spec.operation, SubCommand::Current);
    }

    #[test]
    fn test_upgrade_argument_order() {
        let provider = provider().extra("a", "1");
        let resource = ResourceSpec::new("rev1").extra("b", "2").tag("t1");
        let spec = CommandBuilder::new(&provider, &resource)
            .upgrade("rev1")
            .unwrap();

        assert_eq!(
            spec.argv(),
            vec!["alembic", "-x", "a=1", "-x", "b=2", "upgrade", "--tag", "t1", "rev1"]
        );
    }

    #[test]
    fn test_resource_command_overrides_provider() {
        let provider = provider().command(["poetry", "run", "alembic"]);
        let resource = ResourceSpec::new("head").command(["/venv/bin/alembic"]);
        let spec = CommandBuilder::new(&provider, &resource).current().unwrap();

        assert_eq!(spec.program, "/venv/bin/alembic");
        assert_eq!(spec.args, vec!["current"]);
    }

    #[test]
    fn test_provider_command_prefix() {
        let provider = provider().command(["poetry", "run", "alembic"]);
        let resource = ResourceSpec::new("head");
        let spec = CommandBuilder::new(&provider, &resource).stamp("head").unwrap();

        assert_eq!(spec.argv(), vec!["poetry", "run", "alembic", "stamp", "head"]);
    }

    #[test]
    fn test_duplicate_extras_are_both_emitted() {
        let provider = provider().extra("tenant", "default");
        let resource = ResourceSpec::new("head").extra("tenant", "acme");
        let spec = CommandBuilder::new(&provider, &resource).current().unwrap();

        assert_eq!(
            spec.args,
            vec!["-x", "tenant=default", "-x", "tenant=acme", "current"]
        );
    }

    #[test]
    fn test_extras_keep_declaration_order() {
        let provider = provider().extra("z", "1").extra("a", "2").extra("m", "3");
        let resource = ResourceSpec::new("head");
        let spec = CommandBuilder::new(&provider, &resource).current().unwrap();

        assert_eq!(
            spec.args,
            vec!["-x", "z=1", "-x", "a=2", "-x", "m=3", "current"]
        );
    }

    #[test]
    fn test_show_ignores_tag() {
        let provider = provider();
        let resource = ResourceSpec::new("head").tag("t1");
        let spec = CommandBuilder::new(&provider, &resource).show("head").unwrap();

        assert_eq!(spec.args, vec!["show", "head"]);
    }

    #[test]
    fn test_custom_config_and_section() {
        let provider = provider().config_file("db.ini").section("tenant_db").extra("a", "1");
        let resource = ResourceSpec::new("head");
        let spec = CommandBuilder::new(&provider, &resource)
            .upgrade("head")
            .unwrap();

        assert_eq!(
            spec.args,
            vec!["-c", "db.ini", "-n", "tenant_db", "-x", "a=1", "upgrade", "head"]
        );
    }

    #[test]
    fn test_environment_is_path_plus_resource() {
        let provider = provider();
        let resource = ResourceSpec::new("head")
            .env("DATABASE_URL", "postgresql://db/app")
            .env("PATH", "/custom/bin");
        let spec = CommandBuilder::new(&provider, &resource).current().unwrap();

        assert_eq!(spec.env_keys(), vec!["PATH", "DATABASE_URL", "PATH"]);
        assert_eq!(spec.env_value("PATH"), Some("/custom/bin"));
        assert_eq!(spec.env_value("DATABASE_URL"), Some("postgresql://db/app"));
        assert_eq!(spec.env_value("HOME"), None);
    }

    #[test]
    fn test_empty_command_is_configuration_error() {
        let provider = provider();
        let mut resource = ResourceSpec::new("head");
        resource.command = Some(Vec::new());

        let err = CommandBuilder::new(&provider, &resource).current().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_missing_target_is_configuration_error() {
        let provider = provider();
        let resource = ResourceSpec::new("head");
        let builder = CommandBuilder::new(&provider, &resource);

        assert!(builder.build(SubCommand::Upgrade, None).is_err());
        assert!(builder.build(SubCommand::Show, Some("")).is_err());
    }

    #[test]
    fn test_invalid_env_key_is_configuration_error() {
        let provider = provider();
        let resource = ResourceSpec::new("head").env("", "x");
        let err = CommandBuilder::new(&provider, &resource).current().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_sub_command_properties() {
        assert!(!SubCommand::Current.takes_target());
        assert!(SubCommand::Show.takes_target());
        assert!(!SubCommand::Show.accepts_tag());
        assert!(SubCommand::Stamp.accepts_tag());
        assert_eq!(SubCommand::Upgrade.to_string(), "upgrade");
    }
}
