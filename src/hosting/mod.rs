//! # Background behaviors and their host.
//!
//! - [`Behavior`]: a startable, stoppable component.
//! - [`BehaviorHost`]: starts and stops every registered behavior concurrently.
//! - [`ScopedBehavior`] + [`Scoped`]: lifecycle hooks that run inside a fresh scope.
//! - [`HostLifetimeNotifications`]: publishes [`HostStarting`] / [`HostStopping`].

mod behavior;
mod host;
mod lifetime;
mod scoped;
mod shutdown;

pub use behavior::{Behavior, BehaviorRef};
pub use host::BehaviorHost;
pub use lifetime::{HostLifetimeNotifications, HostStarting, HostStopping};
pub use scoped::{Scoped, ScopedBehavior};
