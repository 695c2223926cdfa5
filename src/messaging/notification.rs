//! # Notifications and their handlers.
//!
//! A notification is any value published to the handlers registered for its type.
//! Handlers are fan-out readers: they receive `&N` and never mutate it.

use std::any::type_name;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::error::HandlerError;

/// Marker for values that can be published or dispatched.
///
/// Most notifications need nothing beyond an empty impl. Override
/// [`log_scope_provider`](Notification::log_scope_provider) to have every
/// handler run inside a span built from the notification.
pub trait Notification: Send + Sync + 'static {
    /// Returns the notification's log scope capability, if it has one.
    fn log_scope_provider(&self) -> Option<&dyn LogScopeProvider> {
        None
    }
}

/// Optional capability: open a logging scope describing the notification.
///
/// # Example
/// ```
/// use relayhost::{LogScopeProvider, Notification};
///
/// struct UserJoined { user_id: u64 }
///
/// impl LogScopeProvider for UserJoined {
///     fn begin_log_scope(&self) -> tracing::Span {
///         tracing::info_span!("user_joined", user_id = self.user_id)
///     }
/// }
///
/// impl Notification for UserJoined {
///     fn log_scope_provider(&self) -> Option<&dyn LogScopeProvider> {
///         Some(self)
///     }
/// }
/// ```
pub trait LogScopeProvider {
    /// Creates the span. It is entered for the whole fan-out and closed when
    /// the fan-out ends, whatever the outcome.
    fn begin_log_scope(&self) -> Span;
}

/// Handles one notification type.
///
/// Resolved fresh for every publish/dispatch from that call's scope. Errors are
/// logged by the caller and never reach the publisher; return
/// [`HandlerError::Canceled`] when giving up because `ctx` was cancelled.
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync + 'static {
    /// Processes `notification`.
    async fn handle_notification(
        &self,
        notification: &N,
        ctx: CancellationToken,
    ) -> Result<(), HandlerError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}
