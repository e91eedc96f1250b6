//! `alembic-provider delete` - Forget a resource.

use crate::cli::DeleteArgs;
use crate::commands::{Context, Workspace};
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the delete command.
///
/// Removing state never touches the database, so this succeeds whether or
/// not the resource is known.
pub async fn run(ctx: &Context, args: DeleteArgs) -> CliResult<()> {
    output::header("Delete");

    let mut ws = Workspace::load(ctx)?;
    let removed = ws.state.remove(&args.name);
    let warning = ws.reconciler.delete(removed.as_ref());

    output::warn(warning);
    match removed {
        Some(state) => {
            ws.save()?;
            success(&format!("Forgot {} (id {})", args.name, state.id));
        }
        None => output::info(&format!("{} has no stored state", args.name)),
    }

    if ws.config.resources.contains_key(&args.name) {
        output::dim("It is still declared and will be recreated by the next apply.");
    }
    Ok(())
}
