//! # alembic-provider
//!
//! Declarative management of alembic migrations.
//!
//! A migration resource names a target revision (or `head`). Applying it
//! runs `alembic upgrade` (or `stamp`) and records the revision the database
//! reports; reading it back resolves `head` again so a newly added migration
//! shows up as drift on the next plan.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alembic_provider::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EngineError> {
//!     let provider = ProviderConfig::new("/srv/app");
//!     provider.validate()?;
//!
//!     let reconciler = Reconciler::new(Arc::new(provider));
//!     let spec = ResourceSpec::new(HEAD).tag("release-7");
//!     let cancel = CancellationToken::new();
//!
//!     let state = reconciler.apply(ResourceKind::Upgrade, &spec, None, &cancel).await?;
//!     let refreshed = reconciler.read(&state, &cancel).await?;
//!
//!     match reconciler.plan(ResourceKind::Upgrade, &spec, Some(&refreshed)) {
//!         PlanAction::NoOp => println!("at {}", refreshed.revision),
//!         action => println!("{action} pending"),
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Reconciliation engine.
pub mod engine {
    pub use alembic_engine::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::engine::{
        EngineError, EngineResult, HEAD, PlanAction, ProviderConfig, Reconciler, ResourceKind,
        ResourceSpec, ResourceState,
    };
    pub use tokio_util::sync::CancellationToken;
}

// Re-export key types at the crate root
pub use engine::{EngineError, EngineResult, Reconciler};
