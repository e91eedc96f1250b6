//! `alembic-provider plan` - Show what apply would change.

use alembic_engine::{PlanAction, ResourceState};

use crate::cli::PlanArgs;
use crate::commands::{Context, Workspace};
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the plan command. Returns whether any change is pending.
pub async fn run(ctx: &Context, args: PlanArgs) -> CliResult<bool> {
    output::header("Plan");

    let ws = Workspace::load(ctx)?;

    let mut pending = 0usize;
    for name in ws.config.resources.keys() {
        // Refreshed state is only used for planning; nothing is persisted.
        let stored = if args.no_refresh {
            ws.state.get(name).cloned()
        } else {
            ws.read(name, &ctx.cancel).await?
        };

        let resource = ws.config.resource(name)?;
        let action = ws
            .reconciler
            .plan(resource.kind, &resource.spec, stored.as_ref());
        if action.needs_apply() {
            pending += 1;
        }

        output::plan_line(name, action, &detail(action, &resource.spec.target, stored.as_ref()));
    }

    let orphans = ws.orphans();
    if !orphans.is_empty() {
        output::newline();
        output::warn("Stored but no longer declared (run `delete` to forget):");
        for name in orphans {
            output::list_item(name);
        }
    }

    output::newline();
    if pending == 0 {
        success("No changes. Database revisions match the configuration.");
    } else {
        output::info(&format!(
            "{} to change",
            output::style_pending(&format!("{} resource(s)", pending))
        ));
    }

    Ok(pending > 0)
}

fn detail(action: PlanAction, desired: &str, stored: Option<&ResourceState>) -> String {
    match (action, stored) {
        (PlanAction::Create, _) => format!("-> {}", desired),
        (PlanAction::Update, Some(state)) if state.spec.target != desired => {
            format!("{} -> {}", state.spec.target, desired)
        }
        (PlanAction::Update, _) => "settings changed".to_string(),
        (PlanAction::NoOp, Some(state)) => format!("at {}", state.revision),
        (PlanAction::NoOp, None) => String::new(),
    }
}
