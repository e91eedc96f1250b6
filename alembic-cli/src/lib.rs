//! alembic-provider - declarative host for alembic migration resources.
//!
//! Reads a TOML desired-state file, keeps a JSON state file next to it and
//! drives [`alembic_engine`] to apply, refresh, plan, delete and import
//! migration resources.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
