//! # Behavior abstraction.
//!
//! A [`Behavior`] is a long-running background component (a gateway connector,
//! a web host) that must come up when the process starts and go down when it
//! stops. Behaviors are registered once with a [`BehaviorHost`](crate::BehaviorHost)
//! and started/stopped concurrently with their siblings.

use std::any::type_name;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BehaviorError;

/// Shared handle to a behavior.
pub type BehaviorRef = Arc<dyn Behavior>;

/// # Startable, stoppable background component.
///
/// Both hooks receive the host caller's token unchanged; honour it to abort a
/// slow start or to learn that a stop is no longer graceful.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use relayhost::{Behavior, BehaviorError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Behavior for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn start(&self, _ctx: CancellationToken) -> Result<(), BehaviorError> {
///         Ok(())
///     }
///
///     async fn stop(&self, _ctx: CancellationToken) -> Result<(), BehaviorError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior: Send + Sync + 'static {
    /// Human-readable name (for logs and failure reports).
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Brings the component up.
    async fn start(&self, ctx: CancellationToken) -> Result<(), BehaviorError>;

    /// Takes the component down.
    async fn stop(&self, ctx: CancellationToken) -> Result<(), BehaviorError>;
}
