//! Interpreting alembic output.
//!
//! `alembic current` prints the applied revision as the first token of its
//! first line (`774ddff6187f (head)`). `alembic show head` prints a block
//! starting with `Rev: 774ddff6187f (head)`, which is how a symbolic name is
//! turned into the concrete revision it currently refers to.

use std::fmt;

use regex_lite::Regex;
use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// The symbolic name for the newest revision.
pub const HEAD: &str = "head";

/// A configured migration target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MigrationTarget {
    /// A name the tool resolves at runtime, e.g. `head`.
    Symbolic(String),
    /// An exact revision identifier.
    Concrete(String),
}

impl MigrationTarget {
    /// Classify a configured target string.
    pub fn parse(target: &str) -> Self {
        if target == HEAD {
            MigrationTarget::Symbolic(target.to_string())
        } else {
            MigrationTarget::Concrete(target.to_string())
        }
    }

    /// The target as written in configuration.
    pub fn as_str(&self) -> &str {
        match self {
            MigrationTarget::Symbolic(name) | MigrationTarget::Concrete(name) => name,
        }
    }

    /// Whether the target must be resolved before comparing revisions.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, MigrationTarget::Symbolic(_))
    }
}

impl fmt::Display for MigrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts revisions from tool output.
///
/// Swappable so a different output format, or synthetic output in tests,
/// can be handled without touching the reconciler.
pub trait OutputParser: Send + Sync {
    /// Revision reported by `current`. Empty when none could be found.
    fn current_revision(&self, stdout: &str) -> String;

    /// Concrete revision `target` refers to, from the output of `show <target>`.
    fn resolve_symbolic(&self, target: &str, stdout: &str) -> EngineResult<String>;
}

/// Parser for the stock alembic output format.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlembicOutputParser;

impl AlembicOutputParser {
    /// Pattern matching the `Rev:` line for `target`.
    pub fn show_pattern(target: &str) -> String {
        format!(
            r"(?m)^Rev: ([a-f0-9]+) \({}\)\r?$",
            regex_lite::escape(target)
        )
    }
}

impl OutputParser for AlembicOutputParser {
    fn current_revision(&self, stdout: &str) -> String {
        let revision = stdout
            .trim_start_matches(['\r', '\n'])
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or_default()
            .to_string();

        if revision.is_empty() {
            warn!("alembic current printed no revision");
        }
        revision
    }

    fn resolve_symbolic(&self, target: &str, stdout: &str) -> EngineResult<String> {
        let pattern = Self::show_pattern(target);
        let re = Regex::new(&pattern).map_err(|e| {
            EngineError::output_parse(format!("{} ({})", pattern, e), stdout)
        })?;

        re.captures(stdout)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|rev| !rev.is_empty())
            .ok_or_else(|| EngineError::output_parse(pattern, stdout))
    }
}

/// Resolves applied and target revisions through an [`OutputParser`].
#[derive(Debug, Clone, Default)]
pub struct RevisionResolver<P = AlembicOutputParser> {
    parser: P,
}

impl<P: OutputParser> RevisionResolver<P> {
    /// Create a resolver backed by `parser`.
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Applied revision from `current` output.
    pub fn current_revision(&self, stdout: &str) -> String {
        self.parser.current_revision(stdout)
    }

    /// Concrete revision for `target`. Concrete targets resolve to themselves.
    pub fn resolve_target(&self, target: &MigrationTarget, show_stdout: &str) -> EngineResult<String> {
        match target {
            MigrationTarget::Symbolic(name) => self.parser.resolve_symbolic(name, show_stdout),
            MigrationTarget::Concrete(rev) => Ok(rev.clone()),
        }
    }
}
