//! `alembic-provider state` - Show stored state.

use alembic_engine::ResourceState;
use indexmap::IndexMap;

use crate::cli::StateArgs;
use crate::commands::{Context, describe};
use crate::config::StateFile;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv};

/// Placeholder for environment values in printed state
pub const REDACTED: &str = "(sensitive)";

/// Run the state command.
///
/// Only the state file is read, so this works without a valid configuration.
pub async fn run(ctx: &Context, args: StateArgs) -> CliResult<()> {
    let state = StateFile::load(&ctx.state_path)?;

    let selected: IndexMap<String, ResourceState> = match &args.name {
        Some(name) => {
            let resource = state
                .get(name)
                .ok_or_else(|| CliError::State(format!("{} has no stored state", name)))?;
            IndexMap::from([(name.clone(), resource.clone())])
        }
        None => state.resources.clone(),
    };

    if args.json {
        let redacted: IndexMap<_, _> = selected
            .into_iter()
            .map(|(name, resource)| (name, redact(resource)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&redacted)?);
        return Ok(());
    }

    output::header("State");
    if selected.is_empty() {
        output::info("No stored resources");
        return Ok(());
    }

    for (name, resource) in &selected {
        output::section(name);
        kv("id", &resource.id);
        kv("resource", &describe(resource));
        if let Some(tag) = &resource.spec.tag {
            kv("tag", tag);
        }
        if let Some(updated) = resource.updated_at {
            kv("updated", &updated.to_rfc3339());
        }
        if !resource.spec.environment.is_empty() {
            let keys: Vec<&str> = resource.spec.environment.keys().map(String::as_str).collect();
            kv("environment", &keys.join(", "));
        }
        output::newline();
    }
    Ok(())
}

/// Replace environment values with a placeholder
pub fn redact(mut state: ResourceState) -> ResourceState {
    for value in state.spec.environment.values_mut() {
        *value = REDACTED.to_string();
    }
    state
}
