//! # MessageDispatcher: scope-owning, deadline-bounded fan-out.
//!
//! The dispatcher never borrows the caller's scope. Every call owns:
//! - exactly one cancellation context (deadline = explicit timeout, else the configured default),
//! - exactly one fresh resolution scope.
//!
//! ## Flow
//! ```text
//! dispatch(N, timeout?)
//!   ├─► effective = timeout.unwrap_or(config.dispatch_timeout)     (0 = no deadline)
//!   ├─► source = cancellation.create(effective)                    (dropped on return)
//!   ├─► scope = scopes.create_scope()?
//!   ├─► handlers = scope.resolve_all::<dyn NotificationHandler<N>>()?
//!   │       └─ 0 handlers → empty deliver (log scope only), drop scope, Ok
//!   ├─► spawn { deliver(handlers, &N, token); drop(scope) }
//!   └─► select! {
//!         fan-out joined      → Ok
//!         token cancelled     → warn!, Ok      (fan-out keeps running, scope released when it ends)
//!       }
//! ```
//!
//! ## Rules
//! - The deadline bounds how long the caller waits, not how long handlers run.
//!   Handlers observe the cancelled token and are expected to stop on their own;
//!   nothing is aborted.
//! - A timeout is not an error. Only resolution failures are returned.

use std::any::type_name;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::cancellation::{CancellationSourceFactory, TimedCancellationSourceFactory};
use crate::config::Config;
use crate::error::ResolveError;
use crate::messaging::fan_out::deliver;
use crate::messaging::notification::{Notification, NotificationHandler};
use crate::services::ScopeFactory;

/// Fire-and-forget dispatch with its own scope and deadline.
pub struct MessageDispatcher {
    scopes: Arc<dyn ScopeFactory>,
    cancellation: Arc<dyn CancellationSourceFactory>,
    default_timeout: Duration,
}

impl MessageDispatcher {
    /// Creates a dispatcher using tokio timers for deadlines.
    pub fn new(scopes: Arc<dyn ScopeFactory>, cfg: &Config) -> Self {
        Self {
            scopes,
            cancellation: Arc::new(TimedCancellationSourceFactory),
            default_timeout: cfg.default_dispatch_timeout().unwrap_or(Duration::ZERO),
        }
    }

    /// Replaces the cancellation source factory.
    pub fn with_cancellation_factory(mut self, factory: Arc<dyn CancellationSourceFactory>) -> Self {
        self.cancellation = factory;
        self
    }

    /// Deadline used for a call given its explicit `timeout` (`Duration::ZERO` = none).
    pub fn effective_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.default_timeout)
    }

    /// Delivers `notification` to every handler registered for `N` inside a new scope.
    ///
    /// Returns once all handlers finished or the deadline elapsed, whichever comes first.
    pub async fn dispatch<N: Notification>(
        &self,
        notification: N,
        timeout: Option<Duration>,
    ) -> Result<(), ResolveError> {
        let timeout = self.effective_timeout(timeout);
        let source = self.cancellation.create(timeout);
        let ctx = source.token();

        let scope = self.scopes.create_scope()?;
        let handlers = scope
            .services()
            .resolve_all::<dyn NotificationHandler<N>>()?;
        if handlers.is_empty() {
            debug!(notification = type_name::<N>(), "no handlers registered");
            deliver(&handlers, &notification, &ctx).await;
            return Ok(());
        }
        let count = handlers.len();

        let fan_out = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                deliver(&handlers, &notification, &ctx).await;
                drop(scope);
            }
        });

        tokio::select! {
            biased;
            joined = fan_out => {
                if let Err(e) = joined {
                    error!(notification = type_name::<N>(), error = %e, "dispatch task failed");
                }
            }
            _ = ctx.cancelled() => {
                warn!(
                    notification = type_name::<N>(),
                    handlers = count,
                    timeout = ?timeout,
                    "dispatch deadline elapsed; handlers left running"
                );
            }
        }

        drop(source);
        Ok(())
    }

    /// Spawns [`dispatch`](Self::dispatch) and returns immediately.
    ///
    /// For producers that cannot await (platform event callbacks). Resolution
    /// failures are logged instead of returned.
    pub fn dispatch_detached<N: Notification>(
        self: &Arc<Self>,
        notification: N,
        timeout: Option<Duration>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.dispatch(notification, timeout).await {
                error!(
                    notification = type_name::<N>(),
                    error = %e,
                    label = e.as_label(),
                    "dispatch failed"
                );
            }
        })
    }
}
