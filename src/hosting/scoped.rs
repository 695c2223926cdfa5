//! # Scoped behaviors.
//!
//! A [`ScopedBehavior`] receives a fresh resolution scope for each lifecycle
//! hook. [`Scoped`] adapts it into a plain [`Behavior`]:
//!
//! ```text
//! start(ctx) / stop(ctx)
//!   ├─► scope = scopes.create_scope()?      (failure → BehaviorError::Resolve)
//!   ├─► hook(&scope.services(), ctx)
//!   └─► drop(scope)                          (always, even when the hook fails)
//! ```
//!
//! Scopes never outlive the hook; no scope is shared between start and stop.

use std::any::type_name;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{BehaviorError, Phase};
use crate::hosting::behavior::Behavior;
use crate::services::{ScopeFactory, ServiceProvider};

/// Lifecycle hooks that resolve their dependencies from a per-call scope.
#[async_trait]
pub trait ScopedBehavior: Send + Sync + 'static {
    /// Human-readable name (for logs and failure reports).
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Runs at host start inside a scope that is disposed once the hook returns.
    async fn on_starting(
        &self,
        services: &Arc<dyn ServiceProvider>,
        ctx: CancellationToken,
    ) -> Result<(), BehaviorError>;

    /// Runs at host stop inside a scope that is disposed once the hook returns.
    async fn on_stopping(
        &self,
        services: &Arc<dyn ServiceProvider>,
        ctx: CancellationToken,
    ) -> Result<(), BehaviorError>;
}

/// Runs a [`ScopedBehavior`] as a [`Behavior`], one scope per hook.
pub struct Scoped<B> {
    scopes: Arc<dyn ScopeFactory>,
    inner: B,
}

impl<B: ScopedBehavior> Scoped<B> {
    /// Wraps `inner`, creating hook scopes from `scopes`.
    pub fn new(scopes: Arc<dyn ScopeFactory>, inner: B) -> Self {
        Self { scopes, inner }
    }

    /// The wrapped behavior.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    async fn in_scope(&self, phase: Phase, ctx: CancellationToken) -> Result<(), BehaviorError> {
        let scope = self.scopes.create_scope()?;
        let services = scope.services();
        debug!(behavior = self.inner.name(), %phase, "scope opened");

        let res = match phase {
            Phase::Start => self.inner.on_starting(&services, ctx).await,
            Phase::Stop => self.inner.on_stopping(&services, ctx).await,
        };

        drop(services);
        drop(scope);
        debug!(behavior = self.inner.name(), %phase, ok = res.is_ok(), "scope disposed");
        res
    }
}

#[async_trait]
impl<B: ScopedBehavior> Behavior for Scoped<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), BehaviorError> {
        self.in_scope(Phase::Start, ctx).await
    }

    async fn stop(&self, ctx: CancellationToken) -> Result<(), BehaviorError> {
        self.in_scope(Phase::Stop, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    use crate::error::ResolveError;
    use crate::services::RegistryBuilder;
    use crate::test_support::{BrokenScopes, CountingScopes};

    /// Marker service resolved inside the hook.
    struct Marker(&'static str);

    #[derive(Default)]
    struct Probe {
        fail: bool,
        resolved: Mutex<Vec<&'static str>>,
    }

    impl Probe {
        fn record(&self, services: &Arc<dyn ServiceProvider>) -> Result<(), BehaviorError> {
            let marker = services.resolve::<Marker>()?;
            self.resolved.lock().push(marker.0);
            if self.fail {
                return Err(BehaviorError::fail("hook failed"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ScopedBehavior for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        async fn on_starting(
            &self,
            services: &Arc<dyn ServiceProvider>,
            _: CancellationToken,
        ) -> Result<(), BehaviorError> {
            self.record(services)
        }

        async fn on_stopping(
            &self,
            services: &Arc<dyn ServiceProvider>,
            _: CancellationToken,
        ) -> Result<(), BehaviorError> {
            self.record(services)
        }
    }

    fn scopes() -> Arc<CountingScopes> {
        CountingScopes::new(
            RegistryBuilder::new()
                .with_scoped::<Marker, _>(|_: &Arc<dyn ServiceProvider>| Ok(Arc::new(Marker("scoped"))))
                .build(),
        )
    }

    #[tokio::test]
    async fn test_each_hook_gets_its_own_scope() {
        let scopes = scopes();
        let behavior = Scoped::new(scopes.clone(), Probe::default());

        behavior.start(CancellationToken::new()).await.unwrap();
        assert_eq!((scopes.created(), scopes.disposed()), (1, 1));

        behavior.stop(CancellationToken::new()).await.unwrap();
        assert_eq!((scopes.created(), scopes.disposed()), (2, 2));

        assert_eq!(*behavior.inner().resolved.lock(), ["scoped", "scoped"]);
        assert_eq!(Behavior::name(&behavior), "probe");
    }

    #[tokio::test]
    async fn test_scope_disposed_when_hook_fails() {
        let scopes = scopes();
        let behavior = Scoped::new(
            scopes.clone(),
            Probe {
                fail: true,
                ..Probe::default()
            },
        );

        let err = behavior.start(CancellationToken::new()).await.unwrap_err();

        assert_eq!(err.as_label(), "behavior_failed");
        assert_eq!((scopes.created(), scopes.disposed()), (1, 1));
    }

    #[tokio::test]
    async fn test_scope_creation_failure_surfaces() {
        let behavior = Scoped::new(Arc::new(BrokenScopes), Probe::default());

        let err = behavior.stop(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, BehaviorError::Resolve(ResolveError::Factory { .. })));
        assert!(behavior.inner().resolved.lock().is_empty());
    }
}
