//! `alembic-provider version` command - Display version information.

use alembic_engine::config::{DEFAULT_COMMAND, DEFAULT_CONFIG_FILE, DEFAULT_SECTION};

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::section("alembic-provider");

    kv("Version", VERSION);
    kv("Package", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    output::newline();
    output::section("Defaults");
    kv("command", DEFAULT_COMMAND);
    kv("config", DEFAULT_CONFIG_FILE);
    kv("section", DEFAULT_SECTION);

    Ok(())
}
