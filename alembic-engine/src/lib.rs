//! # alembic-engine
//!
//! Reconciliation engine for declaratively managed alembic migrations.
//!
//! This crate provides functionality for:
//! - Building `alembic` invocations from provider and resource settings
//! - Running an optional connectivity proxy around those invocations
//! - Executing alembic with a minimal environment and capturing its output
//! - Resolving `head` to a concrete revision to detect drift
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Reconciler   │────▶│ ProxyLauncher  │     │ Command     │
//! │ apply / read │     └────────────────┘     │ Builder     │
//! └──────────────┘              │             └─────────────┘
//!        │                      ▼                    │
//!        │              ┌────────────────┐           │
//!        └─────────────▶│ Executor       │◀──────────┘
//!                       └────────────────┘
//!                               │
//!                               ▼
//!                       ┌────────────────┐
//!                       │ Revision       │
//!                       │ Resolver       │
//!                       └────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use alembic_engine::{ProviderConfig, Reconciler, ResourceKind, ResourceSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn migrate() -> Result<(), alembic_engine::EngineError> {
//!     let provider = ProviderConfig::new("/srv/app").extra("tenant", "acme");
//!     provider.validate()?;
//!
//!     let reconciler = Reconciler::new(Arc::new(provider));
//!     let spec = ResourceSpec::new("head")
//!         .env("DATABASE_URL", "postgresql://localhost:5432/app")
//!         .proxy(["cloud-sql-proxy", "project:region:instance"], Some("PT5S"));
//!
//!     let cancel = CancellationToken::new();
//!     let state = reconciler
//!         .apply(ResourceKind::Upgrade, &spec, None, &cancel)
//!         .await?;
//!     println!("database at {}", state.revision);
//!
//!     // Later: detect whether `head` moved.
//!     let refreshed = reconciler.read(&state, &cancel).await?;
//!     if refreshed.spec.target != spec.target {
//!         println!("pending upgrade to {}", refreshed.spec.target);
//!     }
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod duration;
pub mod error;
pub mod executor;
pub mod proxy;
pub mod reconciler;
pub mod revision;
pub mod state;

// Re-exports
pub use command::{CommandBuilder, CommandSpec, SubCommand};
pub use config::{ProviderConfig, ResourceKind, ResourceSpec};
pub use duration::{DEFAULT_PROXY_SLEEP, parse_duration, parse_optional, validate_duration};
pub use error::{EngineError, EngineResult};
pub use executor::{CommandRunner, ExecutionResult, Executor, ProcessRunner};
pub use proxy::{ProxyGuard, ProxyLauncher};
pub use reconciler::{DELETE_WARNING, Reconciler};
pub use revision::{AlembicOutputParser, HEAD, MigrationTarget, OutputParser, RevisionResolver};
pub use state::{PlanAction, ResourceState};
