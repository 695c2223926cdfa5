//! # Service registry and scopes.
//!
//! [`RegistryBuilder`] is the registration surface used once at composition time;
//! [`ServiceRegistry`] is the immutable result and the crate's built-in
//! [`ScopeFactory`].
//!
//! ## Lifetimes
//! ```text
//! singleton  ── one shared Arc, handed out by every scope
//! scoped     ── factory runs on first resolution in a scope, cached until the scope drops
//! transient  ── factory runs on every resolution (notification handlers)
//! ```
//!
//! ## Rules
//! - Registrations are read-only after [`RegistryBuilder::build`].
//! - Each [`Scope`] has its own cache; nothing scoped is shared across scopes.
//! - Providers handed to factories hold a weak reference to their scope, so a
//!   cached service that keeps its provider does not keep the scope alive.
//!   Resolving through such a provider after disposal yields
//!   [`ResolveError::ScopeDisposed`].
//! - The cache lock is never held while a factory runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::ResolveError;
use crate::messaging::{MessagePublisher, Notification, NotificationHandler};
use crate::services::provider::{
    ScopeFactory, Service, ServiceKey, ServiceProvider, ServiceScope, erase,
};

type Factory = Box<dyn Fn(&Arc<dyn ServiceProvider>) -> Result<Service, ResolveError> + Send + Sync>;

enum Registration {
    Singleton(Service),
    Scoped(Factory),
    Transient(Factory),
}

type Registrations = HashMap<ServiceKey, Vec<Registration>>;

/// Builder for a [`ServiceRegistry`].
///
/// A fresh builder already registers [`MessagePublisher`] as a scoped service
/// bound to the scope that resolves it.
pub struct RegistryBuilder {
    registrations: Registrations,
}

impl RegistryBuilder {
    /// Creates a builder with the built-in messaging services registered.
    pub fn new() -> Self {
        Self::empty().with_scoped::<MessagePublisher, _>(|services| {
            Ok(Arc::new(MessagePublisher::new(Arc::clone(services))))
        })
    }

    /// Creates a builder with no registrations at all.
    pub fn empty() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    /// Registers one shared instance of `S`.
    pub fn with_singleton<S>(self, svc: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register::<S>(Registration::Singleton(erase(svc)))
    }

    /// Registers `S` as created once per scope.
    pub fn with_scoped<S, F>(self, factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Arc<dyn ServiceProvider>) -> Result<Arc<S>, ResolveError> + Send + Sync + 'static,
    {
        self.register::<S>(Registration::Scoped(Box::new(
            move |sp: &Arc<dyn ServiceProvider>| factory(sp).map(erase),
        )))
    }

    /// Registers `S` as created on every resolution.
    pub fn with_transient<S, F>(self, factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Arc<dyn ServiceProvider>) -> Result<Arc<S>, ResolveError> + Send + Sync + 'static,
    {
        self.register::<S>(Registration::Transient(Box::new(
            move |sp: &Arc<dyn ServiceProvider>| factory(sp).map(erase),
        )))
    }

    /// Registers a handler for notifications of type `N`.
    ///
    /// The factory runs for every publish/dispatch, inside the scope of that call,
    /// so the handler may capture scope-local services.
    ///
    /// ## Example
    /// ```rust
    /// use relayhost::{HandlerError, Notification, NotificationHandler, RegistryBuilder};
    /// use tokio_util::sync::CancellationToken;
    ///
    /// struct Ping;
    /// impl Notification for Ping {}
    ///
    /// struct Pong;
    ///
    /// #[async_trait::async_trait]
    /// impl NotificationHandler<Ping> for Pong {
    ///     async fn handle_notification(&self, _: &Ping, _: CancellationToken) -> Result<(), HandlerError> {
    ///         Ok(())
    ///     }
    /// }
    ///
    /// let registry = RegistryBuilder::new()
    ///     .with_handler::<Ping, _, _>(|_services| Ok(Pong))
    ///     .build();
    /// assert_eq!(registry.handler_count::<Ping>(), 1);
    /// ```
    pub fn with_handler<N, H, F>(self, factory: F) -> Self
    where
        N: Notification,
        H: NotificationHandler<N>,
        F: Fn(&Arc<dyn ServiceProvider>) -> Result<H, ResolveError> + Send + Sync + 'static,
    {
        self.with_transient::<dyn NotificationHandler<N>, _>(move |sp| {
            let handler: Arc<dyn NotificationHandler<N>> = Arc::new(factory(sp)?);
            Ok(handler)
        })
    }

    /// Registers an already-built handler shared by every resolution.
    pub fn with_shared_handler<N>(self, handler: Arc<dyn NotificationHandler<N>>) -> Self
    where
        N: Notification,
    {
        self.with_transient::<dyn NotificationHandler<N>, _>(move |_| Ok(Arc::clone(&handler)))
    }

    /// Freezes the registrations.
    pub fn build(self) -> Arc<ServiceRegistry> {
        Arc::new(ServiceRegistry {
            registrations: Arc::new(self.registrations),
            next_scope: AtomicU64::new(1),
            live_scopes: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn register<S: ?Sized + 'static>(mut self, registration: Registration) -> Self {
        self.registrations
            .entry(ServiceKey::of::<S>())
            .or_default()
            .push(registration);
        self
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable registrations plus scope bookkeeping.
pub struct ServiceRegistry {
    registrations: Arc<Registrations>,
    next_scope: AtomicU64,
    live_scopes: Arc<AtomicUsize>,
}

impl ServiceRegistry {
    /// Number of scopes created from this registry and not yet dropped.
    pub fn live_scopes(&self) -> usize {
        self.live_scopes.load(Ordering::Acquire)
    }

    /// Number of handlers registered for notification type `N`.
    pub fn handler_count<N: Notification>(&self) -> usize {
        self.registrations
            .get(&ServiceKey::of::<dyn NotificationHandler<N>>())
            .map_or(0, Vec::len)
    }

    /// Opens a scope with its concrete type.
    pub fn scope(&self) -> Scope {
        let id = self.next_scope.fetch_add(1, Ordering::Relaxed);
        self.live_scopes.fetch_add(1, Ordering::AcqRel);
        trace!(scope = id, "scope created");
        Scope {
            state: Arc::new(ScopeState {
                id,
                registrations: Arc::clone(&self.registrations),
                cache: Mutex::new(HashMap::new()),
                disposed: AtomicBool::new(false),
            }),
            live_scopes: Arc::clone(&self.live_scopes),
        }
    }
}

impl ScopeFactory for ServiceRegistry {
    fn create_scope(&self) -> Result<Box<dyn ServiceScope>, ResolveError> {
        Ok(Box::new(self.scope()))
    }
}

struct ScopeState {
    id: u64,
    registrations: Arc<Registrations>,
    cache: Mutex<HashMap<(ServiceKey, usize), Service>>,
    disposed: AtomicBool,
}

/// A resolution scope created by [`ServiceRegistry`]. Dropping it disposes it.
pub struct Scope {
    state: Arc<ScopeState>,
    live_scopes: Arc<AtomicUsize>,
}

impl Scope {
    /// Scope id, unique per registry.
    pub fn id(&self) -> u64 {
        self.state.id
    }
}

impl ServiceScope for Scope {
    fn services(&self) -> Arc<dyn ServiceProvider> {
        Arc::new(ScopeProvider {
            state: Arc::downgrade(&self.state),
        })
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.state.disposed.store(true, Ordering::Release);
        let released = std::mem::take(&mut *self.state.cache.lock());
        self.live_scopes.fetch_sub(1, Ordering::AcqRel);
        trace!(scope = self.state.id, released = released.len(), "scope disposed");
    }
}

struct ScopeProvider {
    state: Weak<ScopeState>,
}

impl ScopeProvider {
    fn state(&self) -> Result<Arc<ScopeState>, ResolveError> {
        self.state
            .upgrade()
            .filter(|s| !s.disposed.load(Ordering::Acquire))
            .ok_or(ResolveError::ScopeDisposed)
    }

    fn materialize(
        &self,
        state: &ScopeState,
        key: ServiceKey,
        index: usize,
        registration: &Registration,
    ) -> Result<Service, ResolveError> {
        let provider: Arc<dyn ServiceProvider> = Arc::new(ScopeProvider {
            state: self.state.clone(),
        });

        match registration {
            Registration::Singleton(svc) => Ok(Arc::clone(svc)),
            Registration::Transient(factory) => factory(&provider),
            Registration::Scoped(factory) => {
                if let Some(svc) = state.cache.lock().get(&(key, index)) {
                    return Ok(Arc::clone(svc));
                }
                let created = factory(&provider)?;
                // A concurrent resolution may have won; keep the first instance.
                let mut cache = state.cache.lock();
                Ok(Arc::clone(cache.entry((key, index)).or_insert(created)))
            }
        }
    }
}

impl ServiceProvider for ScopeProvider {
    fn get_service(&self, key: ServiceKey) -> Result<Option<Service>, ResolveError> {
        let state = self.state()?;
        let Some(registrations) = state.registrations.get(&key) else {
            return Ok(None);
        };
        let Some(index) = registrations.len().checked_sub(1) else {
            return Ok(None);
        };
        self.materialize(&state, key, index, &registrations[index])
            .map(Some)
    }

    fn get_services(&self, key: ServiceKey) -> Result<Vec<Service>, ResolveError> {
        let state = self.state()?;
        let Some(registrations) = state.registrations.get(&key) else {
            return Ok(Vec::new());
        };
        registrations
            .iter()
            .enumerate()
            .map(|(index, registration)| self.materialize(&state, key, index, registration))
            .collect()
    }
}
