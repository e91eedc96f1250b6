//! `alembic-provider import` - Adopt an existing resource.

use crate::cli::ImportArgs;
use crate::commands::{Context, Workspace};
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the import command
pub async fn run(ctx: &Context, args: ImportArgs) -> CliResult<()> {
    output::header("Import");

    let mut ws = Workspace::load(ctx)?;
    if ws.state.get(&args.name).is_some() {
        return Err(CliError::State(format!(
            "{} is already managed; delete it first to re-import",
            args.name
        )));
    }

    let mut state = ws.reconciler.import(&args.id)?;

    // Carry the declared settings so the next refresh knows how to reach
    // the database. Revision stays empty until then.
    if let Some(resource) = ws.config.resources.get(&args.name) {
        state.kind = resource.kind;
        state.spec = resource.spec.clone();
    } else {
        output::warn(&format!(
            "{} is not declared; it will be reported as orphaned",
            args.name
        ));
    }

    ws.state.put(args.name.as_str(), state);
    ws.save()?;

    success(&format!("Imported {} with id {}", args.name, args.id));
    output::dim("Run `alembic-provider refresh` to read its revision.");
    Ok(())
}
