//! Structured fuzzing for the alembic output parser.
//!
//! Generates `show`/`current` output around a known revision so both the
//! match and no-match paths are explored.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_output_parser
//! ```

#![no_main]

use alembic_engine::{AlembicOutputParser, OutputParser};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzOutput {
    target: String,
    revision: Vec<u8>,
    before: String,
    after: String,
    crlf: bool,
}

impl FuzzOutput {
    fn revision(&self) -> String {
        self.revision
            .iter()
            .take(32)
            .map(|b| char::from(b"0123456789abcdef"[(b % 16) as usize]))
            .collect()
    }

    fn show(&self) -> String {
        let eol = if self.crlf { "\r\n" } else { "\n" };
        format!(
            "{}{eol}Rev: {} ({}){eol}{}",
            self.before,
            self.revision(),
            self.target,
            self.after
        )
    }
}

fuzz_target!(|input: FuzzOutput| {
    let parser = AlembicOutputParser;

    let _ = parser.current_revision(&input.before);

    let well_formed = !input.revision().is_empty()
        && input.target.len() <= 64
        && !input.target.contains(['\r', '\n']);

    match parser.resolve_symbolic(&input.target, &input.show()) {
        Ok(found) => {
            assert!(!found.is_empty());
            assert!(found.chars().all(|c| c.is_ascii_hexdigit()));
        }
        Err(_) => assert!(!well_formed, "missed a well-formed Rev line"),
    }
});
