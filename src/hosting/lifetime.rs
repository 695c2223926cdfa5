//! # Host lifetime notifications.
//!
//! Publishes [`HostStarting`] when the host starts and [`HostStopping`] when it
//! stops, so any component can react to the host lifecycle by registering a
//! [`NotificationHandler`](crate::NotificationHandler) instead of a behavior.
//!
//! Each notification is published through the [`MessagePublisher`] of the hook's
//! own scope.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BehaviorError;
use crate::hosting::scoped::{Scoped, ScopedBehavior};
use crate::messaging::{MessagePublisher, Notification};
use crate::services::{ScopeFactory, ServiceProvider};

/// Published once while the host starts.
#[derive(Debug, Clone, Copy)]
pub struct HostStarting {
    /// Wall-clock time the notification was created.
    pub at: SystemTime,
}

impl Notification for HostStarting {}

/// Published once while the host stops.
#[derive(Debug, Clone, Copy)]
pub struct HostStopping {
    /// Wall-clock time the notification was created.
    pub at: SystemTime,
}

impl Notification for HostStopping {}

/// Scoped behavior translating host start/stop into notifications.
#[derive(Debug, Default)]
pub struct HostLifetimeNotifications;

impl HostLifetimeNotifications {
    /// Ready-to-register behavior creating its scopes from `scopes`.
    pub fn behavior(scopes: Arc<dyn ScopeFactory>) -> Scoped<Self> {
        Scoped::new(scopes, Self)
    }

    async fn publish<N: Notification>(
        services: &Arc<dyn ServiceProvider>,
        notification: N,
        ctx: &CancellationToken,
    ) -> Result<(), BehaviorError> {
        let publisher = services.resolve::<MessagePublisher>()?;
        publisher.publish(&notification, ctx).await?;
        Ok(())
    }
}

#[async_trait]
impl ScopedBehavior for HostLifetimeNotifications {
    fn name(&self) -> &str {
        "host_lifetime_notifications"
    }

    async fn on_starting(
        &self,
        services: &Arc<dyn ServiceProvider>,
        ctx: CancellationToken,
    ) -> Result<(), BehaviorError> {
        let at = SystemTime::now();
        Self::publish(services, HostStarting { at }, &ctx).await
    }

    async fn on_stopping(
        &self,
        services: &Arc<dyn ServiceProvider>,
        ctx: CancellationToken,
    ) -> Result<(), BehaviorError> {
        let at = SystemTime::now();
        Self::publish(services, HostStopping { at }, &ctx).await
    }
}
