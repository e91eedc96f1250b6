//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CONFIG_FILE_NAME, default_state_path};

/// Declarative alembic migrations
#[derive(Parser, Debug)]
#[command(name = "alembic-provider")]
#[command(version)]
#[command(about = "Apply, refresh and plan alembic migration resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Desired-state configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "ALEMBIC_PROVIDER_CONFIG",
        default_value = CONFIG_FILE_NAME
    )]
    pub config: PathBuf,

    /// State file (defaults to a file next to the configuration)
    #[arg(short, long, global = true, env = "ALEMBIC_PROVIDER_STATE")]
    pub state: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// State file path, explicit or derived from the config path
    pub fn state_path(&self) -> PathBuf {
        self.state
            .clone()
            .unwrap_or_else(|| default_state_path(&self.config))
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Converge resources to their declared targets
    Apply(ApplyArgs),

    /// Re-read applied revisions and detect drift
    Refresh(RefreshArgs),

    /// Show what apply would change
    Plan(PlanArgs),

    /// Forget a resource (migrations are not rolled back)
    Delete(DeleteArgs),

    /// Adopt an existing resource under a known id
    Import(ImportArgs),

    /// Show stored state
    State(StateArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Apply Command
// =============================================================================

/// Arguments for the `apply` command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Resources to apply (defaults to all)
    pub names: Vec<String>,

    /// Apply even when the plan reports no change
    #[arg(short, long)]
    pub force: bool,

    /// Skip the refresh that precedes planning
    #[arg(long)]
    pub no_refresh: bool,
}

// =============================================================================
// Refresh Command
// =============================================================================

/// Arguments for the `refresh` command
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Resources to refresh (defaults to all with stored state)
    pub names: Vec<String>,
}

// =============================================================================
// Plan Command
// =============================================================================

/// Arguments for the `plan` command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Plan against stored state without refreshing it first
    #[arg(long)]
    pub no_refresh: bool,

    /// Exit with status 2 when changes are pending
    #[arg(long)]
    pub detailed_exitcode: bool,
}

// =============================================================================
// Delete / Import / State Commands
// =============================================================================

/// Arguments for the `delete` command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Resource to forget
    pub name: String,
}

/// Arguments for the `import` command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Resource name
    pub name: String,

    /// Identifier to adopt
    pub id: String,
}

/// Arguments for the `state` command
#[derive(Args, Debug)]
pub struct StateArgs {
    /// Resource to show (defaults to all)
    pub name: Option<String>,

    /// Print JSON (environment values redacted)
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_paths() {
        let cli = Cli::try_parse_from(["alembic-provider", "plan"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE_NAME));
        assert_eq!(
            cli.state_path(),
            PathBuf::from("").join(crate::config::STATE_FILE_NAME)
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "alembic-provider",
            "apply",
            "schema",
            "-c",
            "deploy/db.toml",
            "-s",
            "/tmp/state.json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("deploy/db.toml"));
        assert_eq!(cli.state_path(), PathBuf::from("/tmp/state.json"));
        match cli.command {
            Command::Apply(args) => assert_eq!(args.names, vec!["schema"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_import_requires_id() {
        assert!(Cli::try_parse_from(["alembic-provider", "import", "schema"]).is_err());
    }
}
