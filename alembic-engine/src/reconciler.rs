//! Lifecycle operations for migration resources.
//!
//! ```text
//!              apply                    read / apply
//! Unmanaged ──────────▶ Applied ◀──────────────────┐
//!                          │                        │
//!                          └────────────────────────┘
//! ```
//!
//! Every operation that talks to the database follows the same shape:
//! start the proxy (if any), run one or two alembic commands, stop the
//! proxy, and hand back a new [`ResourceState`]. Delete never transitions
//! back to `Unmanaged` because migrations are not undone by forgetting them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::CommandBuilder;
use crate::config::{ProviderConfig, ResourceKind, ResourceSpec};
use crate::duration::{parse_duration, parse_optional};
use crate::error::{EngineError, EngineResult};
use crate::executor::{CommandRunner, Executor, ProcessRunner};
use crate::proxy::ProxyLauncher;
use crate::revision::{AlembicOutputParser, MigrationTarget, OutputParser, RevisionResolver};
use crate::state::{PlanAction, ResourceState};

/// Warning reported when a resource is deleted.
pub const DELETE_WARNING: &str =
    "Deleting a migration resource does not roll back the database; the applied revision is left in place.";

/// Drives alembic for one provider configuration.
///
/// The provider configuration is shared read-only, so one reconciler can
/// serve many resources concurrently.
#[derive(Debug, Clone)]
pub struct Reconciler<R = ProcessRunner, P = AlembicOutputParser> {
    provider: Arc<ProviderConfig>,
    runner: R,
    resolver: RevisionResolver<P>,
    proxy: ProxyLauncher,
}

impl Reconciler {
    /// Create a reconciler that runs real processes.
    pub fn new(provider: Arc<ProviderConfig>) -> Self {
        Self {
            provider,
            runner: ProcessRunner,
            resolver: RevisionResolver::new(AlembicOutputParser),
            proxy: ProxyLauncher,
        }
    }
}

impl<R, P> Reconciler<R, P> {
    /// Replace the command runner.
    pub fn with_runner<R2>(self, runner: R2) -> Reconciler<R2, P> {
        Reconciler {
            provider: self.provider,
            runner,
            resolver: self.resolver,
            proxy: self.proxy,
        }
    }

    /// Replace the output parser.
    pub fn with_parser<P2: OutputParser>(self, parser: P2) -> Reconciler<R, P2> {
        Reconciler {
            provider: self.provider,
            runner: self.runner,
            resolver: RevisionResolver::new(parser),
            proxy: self.proxy,
        }
    }

    /// The provider configuration.
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// The command runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: CommandRunner, P: OutputParser> Reconciler<R, P> {
    /// Move the database to `spec.target` and record the resulting revision.
    ///
    /// Covers both creation and update. Nothing is returned unless both the
    /// upgrade/stamp and the follow-up `current` succeed.
    pub async fn apply(
        &self,
        kind: ResourceKind,
        spec: &ResourceSpec,
        prior: Option<&ResourceState>,
        cancel: &CancellationToken,
    ) -> EngineResult<ResourceState> {
        spec.validate()?;

        let builder = CommandBuilder::new(&self.provider, spec);
        let migrate = builder.build(kind.sub_command(), Some(&spec.target))?;
        let current = builder.current()?;
        let executor = self.executor(spec);

        info!(%kind, target = %spec.target, tag = ?spec.tag, "applying migration resource");

        let revision = self
            .with_proxy(spec, cancel, async {
                executor.execute(&migrate).await?;
                let output = executor.execute(&current).await?;
                Ok(self.resolver.current_revision(&output.stdout))
            })
            .await?;

        let id = prior
            .map(|state| state.id.clone())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(%kind, id = %id, revision = %revision, "migration resource applied");

        Ok(ResourceState {
            id,
            kind,
            spec: spec.clone(),
            revision,
            updated_at: Some(Utc::now()),
        })
    }

    /// Refresh stored state from the database.
    ///
    /// The applied revision is always replaced by what `current` reports. For
    /// a symbolic target, `show` resolves it; if it now names a revision other
    /// than the applied one, the stored target is rewritten to that revision
    /// so the next plan sees a pending change.
    pub async fn read(
        &self,
        state: &ResourceState,
        cancel: &CancellationToken,
    ) -> EngineResult<ResourceState> {
        let spec = &state.spec;
        let target = state.target();

        let builder = CommandBuilder::new(&self.provider, spec);
        let current = builder.current()?;
        let show = match &target {
            MigrationTarget::Symbolic(name) => Some(builder.show(name)?),
            MigrationTarget::Concrete(_) => None,
        };
        let executor = self.executor(spec);

        let (applied, resolved) = self
            .with_proxy(spec, cancel, async {
                let output = executor.execute(&current).await?;
                let applied = self.resolver.current_revision(&output.stdout);

                let resolved = match &show {
                    Some(show) => {
                        let output = executor.execute(show).await?;
                        self.resolver.resolve_target(&target, &output.stdout)?
                    }
                    None => applied.clone(),
                };

                Ok((applied, resolved))
            })
            .await?;

        let mut next = state.clone();
        if resolved != applied {
            info!(
                id = %state.id,
                target = %target,
                resolved = %resolved,
                applied = %applied,
                "target moved, marking resource for update"
            );
            next.spec.target = resolved;
        }

        if next.revision != applied {
            debug!(id = %state.id, from = %next.revision, to = %applied, "applied revision changed");
        }
        next.revision = applied;

        Ok(next)
    }

    /// Forget a resource. Always succeeds and never touches the database.
    pub fn delete(&self, state: Option<&ResourceState>) -> &'static str {
        warn!(id = ?state.map(|s| s.id.as_str()), "{}", DELETE_WARNING);
        DELETE_WARNING
    }

    /// Seed state from an externally supplied identifier.
    ///
    /// Only the id is known; the next [`Reconciler::read`] fills in the revision.
    pub fn import(&self, id: impl Into<String>) -> EngineResult<ResourceState> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EngineError::configuration("import id must not be empty"));
        }

        Ok(ResourceState {
            id,
            kind: ResourceKind::default(),
            spec: ResourceSpec::default(),
            revision: String::new(),
            updated_at: None,
        })
    }

    /// Decide whether `desired` requires an apply given stored state.
    pub fn plan(
        &self,
        kind: ResourceKind,
        desired: &ResourceSpec,
        stored: Option<&ResourceState>,
    ) -> PlanAction {
        PlanAction::between(kind, desired, stored)
    }

    fn executor(&self, spec: &ResourceSpec) -> Executor<'_, R> {
        let timeout = spec
            .command_timeout
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(parse_duration)
            .filter(|t| *t > Duration::ZERO);
        Executor::new(&self.runner).with_timeout(timeout)
    }

    /// Run `body` with the resource's proxy alive.
    ///
    /// The proxy is stopped after `body` completes, whatever it returned.
    async fn with_proxy<T>(
        &self,
        spec: &ResourceSpec,
        cancel: &CancellationToken,
        body: impl Future<Output = EngineResult<T>>,
    ) -> EngineResult<T> {
        let warm_up = parse_optional(spec.proxy_sleep.as_deref());
        let proxy = self
            .proxy
            .start(spec.proxy_command.as_deref(), warm_up, cancel)
            .await?;

        let result = body.await;

        if let Some(proxy) = proxy {
            proxy.stop().await;
        }
        result
    }
}
