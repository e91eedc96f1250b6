//! Fuzz target for the desired-state config decoder.
//!
//! Feeds arbitrary TOML to the decoder and validates whatever decodes.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_config_parser
//! ```

#![no_main]

use alembic_cli::config::Config;
use alembic_engine::CommandBuilder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    // The decoder should never panic, only return errors
    let Ok(config) = Config::from_toml(input) else {
        return;
    };

    for resource in config.resources.values() {
        if resource.spec.validate().is_ok() {
            let builder = CommandBuilder::new(&config.provider, &resource.spec);
            let _ = builder.build(resource.kind.sub_command(), Some(&resource.spec.target));
            let _ = builder.current();
        }
    }
});
