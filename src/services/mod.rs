//! # Service registration and scoped resolution.
//!
//! - [`ServiceProvider`], [`ServiceScope`], [`ScopeFactory`]: the resolution surface
//!   consumed by messaging and hosting. Any container can sit behind them.
//! - [`RegistryBuilder`] / [`ServiceRegistry`]: the built-in registry, a map from
//!   service type to factories, frozen at composition time.
//!
//! ```text
//! RegistryBuilder ──build()──► ServiceRegistry ──create_scope()──► Scope
//!                                                                   │
//!                                           services() ─► ServiceProvider
//!                                                          ├─ resolve::<S>()
//!                                                          └─ resolve_all::<S>()
//! drop(Scope) ─► scoped services released
//! ```

mod provider;
mod registry;

pub use provider::{
    ScopeFactory, Service, ServiceKey, ServiceProvider, ServiceScope, erase,
};
pub use registry::{RegistryBuilder, Scope, ServiceRegistry};
