//! alembic-provider - declarative host for alembic migration resources.

use clap::Parser;

use alembic_cli::cli::{Cli, Command};
use alembic_cli::commands::{self, Context};
use alembic_cli::error::CliResult;
use alembic_cli::{logging, output};

/// Exit status of `plan --detailed-exitcode` when changes are pending
const EXIT_CHANGES_PENDING: i32 = 2;

#[tokio::main]
async fn main() {
    logging::init();

    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&e.to_string());
            if let Some(detail) = e.detail() {
                output::dim_err(&detail);
            }
            std::process::exit(1);
        }
    }
}

async fn run() -> CliResult<i32> {
    let cli = Cli::parse();
    let ctx = Context::new(&cli.config, cli.state_path());

    // Ctrl-C aborts a proxy warm-up; child processes die with us.
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match cli.command {
        Command::Apply(args) => commands::apply::run(&ctx, args).await?,
        Command::Refresh(args) => commands::refresh::run(&ctx, args).await?,
        Command::Plan(args) => {
            let detailed = args.detailed_exitcode;
            let pending = commands::plan::run(&ctx, args).await?;
            if detailed && pending {
                return Ok(EXIT_CHANGES_PENDING);
            }
        }
        Command::Delete(args) => commands::delete::run(&ctx, args).await?,
        Command::Import(args) => commands::import::run(&ctx, args).await?,
        Command::State(args) => commands::state::run(&ctx, args).await?,
        Command::Version => commands::version::run().await?,
    }
    Ok(0)
}
