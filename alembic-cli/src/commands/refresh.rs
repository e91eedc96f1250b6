//! `alembic-provider refresh` - Re-read applied revisions.

use crate::cli::RefreshArgs;
use crate::commands::{Context, Workspace, describe};
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the refresh command
pub async fn run(ctx: &Context, args: RefreshArgs) -> CliResult<()> {
    output::header("Refresh");

    let mut ws = Workspace::load(ctx)?;
    let names = if args.names.is_empty() {
        ws.state.resources.keys().cloned().collect()
    } else {
        args.names
    };

    if names.is_empty() {
        output::info("No stored resources to refresh");
        return Ok(());
    }

    let total = names.len();
    for (idx, name) in names.iter().enumerate() {
        output::step(idx + 1, total, &format!("Refreshing {}...", name));

        let before = ws.state.get(name).map(|s| s.spec.target.clone());
        match ws.refresh(name, &ctx.cancel).await? {
            Some(state) => {
                output::list_item(&describe(&state));
                if before.as_deref() != Some(state.spec.target.as_str()) {
                    output::warn(&format!(
                        "{}: target moved to {}, apply to catch up",
                        name, state.spec.target
                    ));
                }
            }
            None => output::list_item(&format!("{} has no stored state, skipping", name)),
        }
    }

    output::newline();
    success(&format!("Refreshed state saved to {}", ws.state_path().display()));
    Ok(())
}
