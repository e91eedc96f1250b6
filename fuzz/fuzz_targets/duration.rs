//! Fuzz target for the duration parser.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_duration
//! ```

#![no_main]

use alembic_engine::{parse_duration, validate_duration};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Never panics, even for huge magnitudes.
        let parsed = parse_duration(input);

        // Anything the validator rejects is treated as zero.
        if validate_duration(input).is_err() {
            assert!(parsed.is_zero());
        }
    }
});
