//! Persisted state of a migration resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ResourceKind, ResourceSpec};
use crate::revision::MigrationTarget;

/// What the host stores between reconciliation passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Opaque identifier, generated on first apply or supplied on import.
    pub id: String,

    /// Which sub-command applies this resource.
    #[serde(default)]
    pub kind: ResourceKind,

    /// Configuration as last applied. `spec.target` is rewritten to a
    /// concrete revision when a symbolic target moved.
    #[serde(flatten)]
    pub spec: ResourceSpec,

    /// Revision reported by `alembic current`. Empty when none is applied.
    #[serde(default)]
    pub revision: String,

    /// When the resource was last applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResourceState {
    /// The stored target, classified.
    pub fn target(&self) -> MigrationTarget {
        MigrationTarget::parse(&self.spec.target)
    }

    /// Whether a revision has been observed for this resource.
    pub fn has_revision(&self) -> bool {
        !self.revision.is_empty()
    }
}

/// Change a host must make to converge a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    /// Nothing stored yet; apply will create the resource.
    Create,
    /// Stored state differs from the desired configuration.
    Update,
    /// Stored state matches the desired configuration.
    NoOp,
}

impl PlanAction {
    /// Compare desired configuration against stored state.
    ///
    /// A symbolic target that was rewritten to a concrete revision by a
    /// read no longer equals the desired `head`, so drift shows up here as
    /// an update.
    pub fn between(kind: ResourceKind, desired: &ResourceSpec, stored: Option<&ResourceState>) -> Self {
        let Some(stored) = stored else {
            return PlanAction::Create;
        };

        let spec = &stored.spec;
        let changed = stored.kind != kind
            || spec.target != desired.target
            || spec.tag != desired.tag
            || spec.extra != desired.extra
            || spec.command != desired.command
            || spec.environment != desired.environment;

        if changed {
            PlanAction::Update
        } else {
            PlanAction::NoOp
        }
    }

    /// Whether an apply is required.
    pub fn needs_apply(self) -> bool {
        !matches!(self, PlanAction::NoOp)
    }
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanAction::Create => write!(f, "create"),
            PlanAction::Update => write!(f, "update"),
            PlanAction::NoOp => write!(f, "no-op"),
        }
    }
}
