//! # MessagePublisher: in-scope, awaited fan-out.
//!
//! The publisher borrows the scope it was resolved from. Use it when the caller
//! already owns a scope (a request, a behavior hook) and wants to await every
//! handler inline. For fire-and-forget delivery from code that owns no scope, use
//! [`MessageDispatcher`](crate::MessageDispatcher).
//!
//! ```text
//! publish(&N, ctx)
//!   ├─► resolve_all::<dyn NotificationHandler<N>>()   (caller's scope, late-bound)
//!   └─► deliver(handlers, &N, ctx)                    (sequential, failures logged;
//!                                                      log scope opened even for 0 handlers)
//! ```

use std::any::type_name;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::ResolveError;
use crate::messaging::fan_out::deliver;
use crate::messaging::notification::{Notification, NotificationHandler};
use crate::services::ServiceProvider;

/// Publishes notifications to the handlers visible from one scope.
///
/// Registered as a scoped service by [`RegistryBuilder::new`](crate::RegistryBuilder::new).
pub struct MessagePublisher {
    services: Arc<dyn ServiceProvider>,
}

impl MessagePublisher {
    /// Creates a publisher resolving handlers from `services`.
    pub fn new(services: Arc<dyn ServiceProvider>) -> Self {
        Self { services }
    }

    /// Invokes every handler registered for `N`, one after another.
    ///
    /// Handler failures are logged and swallowed; the call still succeeds once
    /// every handler was attempted. Only a resolution failure is returned.
    pub async fn publish<N: Notification>(
        &self,
        notification: &N,
        ctx: &CancellationToken,
    ) -> Result<(), ResolveError> {
        let handlers = self.services.resolve_all::<dyn NotificationHandler<N>>()?;
        if handlers.is_empty() {
            trace!(notification = type_name::<N>(), "no handlers registered");
        }

        deliver(&handlers, notification, ctx).await;
        Ok(())
    }
}
