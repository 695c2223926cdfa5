//! # Sequential, fault-isolated delivery of one notification.
//!
//! Shared by [`MessagePublisher`](crate::MessagePublisher) and
//! [`MessageDispatcher`](crate::MessageDispatcher).
//!
//! ```text
//! deliver(handlers, &N, ctx)
//!   └─ [log scope span, if N provides one]
//!        ├─► handler 1 ── Ok / Err → error! / panic → error!
//!        ├─► handler 2
//!        └─► handler N
//! ```
//!
//! ## Rules
//! - Handlers run one after another in resolution order.
//! - A failing or panicking handler never prevents the next one from running.
//! - [`HandlerError::Canceled`] is logged at `debug`, everything else at `error`.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a handler panics while holding a lock.

use std::any::{Any, type_name};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error};

use crate::error::HandlerError;
use crate::messaging::notification::{Notification, NotificationHandler};

/// Outcome counters of one fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Delivery {
    /// Handlers invoked.
    pub invoked: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

/// Runs every handler, inside the notification's log scope when it has one.
pub(crate) async fn deliver<N: Notification>(
    handlers: &[Arc<dyn NotificationHandler<N>>],
    notification: &N,
    ctx: &CancellationToken,
) -> Delivery {
    let span = notification
        .log_scope_provider()
        .map(|provider| provider.begin_log_scope());

    match span {
        Some(span) => fan_out(handlers, notification, ctx).instrument(span).await,
        None => fan_out(handlers, notification, ctx).await,
    }
}

async fn fan_out<N: Notification>(
    handlers: &[Arc<dyn NotificationHandler<N>>],
    notification: &N,
    ctx: &CancellationToken,
) -> Delivery {
    let mut delivery = Delivery::default();

    for handler in handlers {
        delivery.invoked += 1;
        let fut = handler.handle_notification(notification, ctx.clone());

        let err = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) => continue,
            Ok(Err(HandlerError::Canceled)) => {
                debug!(
                    handler = handler.name(),
                    notification = type_name::<N>(),
                    "notification handler cancelled"
                );
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("panicked: {}", panic_message(&*panic)),
        };

        delivery.failed += 1;
        error!(
            handler = handler.name(),
            notification = type_name::<N>(),
            error = %err,
            "notification handler failed"
        );
    }

    debug!(
        notification = type_name::<N>(),
        invoked = delivery.invoked,
        failed = delivery.failed,
        "notification delivered"
    );
    delivery
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
