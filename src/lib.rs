//! # relayhost
//!
//! **Relayhost** is the in-process plumbing for a long-running tokio service:
//! typed notifications fanned out to late-bound handlers, and a host that starts
//! and stops background behaviors together.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  producer (owns a scope)          producer (owns nothing, e.g. a platform callback)
//!          │                                      │
//!          ▼                                      ▼
//! ┌──────────────────┐                 ┌──────────────────────┐
//! │ MessagePublisher │                 │  MessageDispatcher   │
//! │ (scoped service) │                 │ - fresh scope / call │
//! └────────┬─────────┘                 │ - deadline / call    │
//!          │                           └──────────┬───────────┘
//!          └──────────────┬───────────────────────┘
//!                         ▼
//!          resolve_all::<dyn NotificationHandler<N>>()
//!                         ▼
//!           ┌─────────────────────────────┐
//!           │  fan-out (sequential)       │
//!           │  - optional log scope span  │
//!           │  - failures logged, skipped │
//!           └──┬──────────┬──────────┬────┘
//!              ▼          ▼          ▼
//!          handler1   handler2   handlerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! BehaviorHost::run(shutdown)
//!   ├─► start(shutdown)  ── all behaviors in parallel, every failure collected
//!   ├─► wait: OS signal | shutdown.cancelled()
//!   └─► stop(fresh token) bounded by Config::grace
//!
//! Scoped<B: ScopedBehavior>
//!   start/stop ─► create scope ─► hook(&services) ─► drop scope
//!
//! HostLifetimeNotifications (a ScopedBehavior)
//!   start ─► MessagePublisher::publish(HostStarting)
//!   stop  ─► MessagePublisher::publish(HostStopping)
//! ```
//!
//! ## Features
//! | Area             | Description                                                   | Key types / traits                                   |
//! |------------------|---------------------------------------------------------------|------------------------------------------------------|
//! | **Services**     | Register singletons, scoped and transient services.           | [`RegistryBuilder`], [`ServiceProvider`], [`ScopeFactory`] |
//! | **Messaging**    | Publish in-scope or dispatch with an owned scope and deadline.| [`MessagePublisher`], [`MessageDispatcher`]          |
//! | **Handlers**     | React to a notification type.                                 | [`Notification`], [`NotificationHandler`]            |
//! | **Hosting**      | Start and stop background components together.                | [`BehaviorHost`], [`Behavior`], [`Scoped`]           |
//! | **Errors**       | Typed errors with stable labels.                              | [`HandlerError`], [`ResolveError`], [`HostError`]    |
//! | **Configuration**| Dispatch deadline and stop grace, loadable from TOML.         | [`Config`]                                           |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use relayhost::{
//!     Config, HandlerError, HostLifetimeNotifications, HostStarting, MessageDispatcher,
//!     Notification, NotificationHandler, RegistryBuilder,
//! };
//!
//! struct OrderPlaced { id: u64 }
//! impl Notification for OrderPlaced {}
//!
//! struct Audit;
//!
//! #[async_trait::async_trait]
//! impl NotificationHandler<OrderPlaced> for Audit {
//!     async fn handle_notification(&self, n: &OrderPlaced, _: CancellationToken) -> Result<(), HandlerError> {
//!         println!("order {} placed", n.id);
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl NotificationHandler<HostStarting> for Audit {
//!     async fn handle_notification(&self, _: &HostStarting, _: CancellationToken) -> Result<(), HandlerError> {
//!         println!("host starting");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = RegistryBuilder::new()
//!         .with_handler::<OrderPlaced, _, _>(|_| Ok(Audit))
//!         .with_handler::<HostStarting, _, _>(|_| Ok(Audit))
//!         .build();
//!
//!     let host = relayhost::BehaviorHost::new(vec![
//!         Arc::new(HostLifetimeNotifications::behavior(registry.clone())),
//!     ]);
//!     host.start(CancellationToken::new()).await?;
//!
//!     let dispatcher = MessageDispatcher::new(registry.clone(), &Config::default());
//!     dispatcher.dispatch(OrderPlaced { id: 7 }, Some(Duration::from_secs(1))).await?;
//!
//!     host.stop(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```
mod cancellation;
mod config;
mod error;
mod hosting;
mod messaging;
mod services;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use cancellation::{
    CancellationSource, CancellationSourceFactory, TimedCancellationSource,
    TimedCancellationSourceFactory,
};
pub use config::Config;
pub use error::{
    BehaviorError, BehaviorFailure, ConfigError, HandlerError, HostError, Phase, ResolveError,
};
pub use hosting::{
    Behavior, BehaviorHost, BehaviorRef, HostLifetimeNotifications, HostStarting, HostStopping,
    Scoped, ScopedBehavior,
};
pub use messaging::{
    LogScopeProvider, MessageDispatcher, MessagePublisher, Notification, NotificationHandler,
};
pub use services::{
    RegistryBuilder, Scope, ScopeFactory, Service, ServiceKey, ServiceProvider, ServiceRegistry,
    ServiceScope, erase,
};
