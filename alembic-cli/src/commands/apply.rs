//! `alembic-provider apply` - Converge resources to their declared targets.

use tracing::info;

use crate::cli::ApplyArgs;
use crate::commands::{Context, Workspace, describe};
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the apply command
pub async fn run(ctx: &Context, args: ApplyArgs) -> CliResult<()> {
    output::header("Apply");

    let mut ws = Workspace::load(ctx)?;
    let selected: Vec<String> = ws
        .config
        .select(&args.names)?
        .into_iter()
        .map(|(name, _)| name.to_string())
        .collect();

    if selected.is_empty() {
        output::info("No resources declared");
        return Ok(());
    }

    let total = selected.len();
    let mut applied = 0usize;
    for (idx, name) in selected.iter().enumerate() {
        output::step(idx + 1, total, &format!("{}...", name));

        let stored = if args.no_refresh {
            ws.state.get(name).cloned()
        } else {
            ws.refresh(name, &ctx.cancel).await?
        };

        let resource = ws.config.resource(name)?.clone();
        let action = ws
            .reconciler
            .plan(resource.kind, &resource.spec, stored.as_ref());

        if !action.needs_apply() && !args.force {
            let current = stored.as_ref().map(describe).unwrap_or_default();
            output::list_item(&format!("up to date, {}", output::style_success(&current)));
            continue;
        }

        info!(resource = %name, action = %action, "applying");
        let state = ws
            .reconciler
            .apply(resource.kind, &resource.spec, stored.as_ref(), &ctx.cancel)
            .await?;

        output::list_item(&format!("{}: {}", action, describe(&state)));
        ws.state.put(name.as_str(), state);
        ws.save()?;
        applied += 1;
    }

    output::newline();
    success(&format!("{} of {} resource(s) applied", applied, total));
    Ok(())
}
