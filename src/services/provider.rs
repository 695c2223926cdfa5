//! # Resolution surface.
//!
//! [`ServiceProvider`] is the object-safe lookup the messaging and hosting layers
//! consume. Services travel type-erased as [`Service`] (`Arc<dyn Any>` wrapping an
//! `Arc<S>`), so `S` may itself be a trait object such as
//! `dyn NotificationHandler<Ping>`. The typed helpers on `dyn ServiceProvider`
//! ([`resolve`](trait.ServiceProvider.html#method.resolve),
//! [`resolve_all`](trait.ServiceProvider.html#method.resolve_all)) undo the erasure.
//!
//! A [`ServiceScope`] owns an isolated resolution context. Dropping the scope
//! disposes it and every scope-owned service with it.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::ResolveError;

/// A type-erased service instance. Always wraps an `Arc<S>` for the key's `S`.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Identifies a service type.
#[derive(Clone, Copy)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    /// Key for service type `S` (may be unsized, e.g. a trait object).
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    /// Type name of the service, for logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Resolves services from one resolution context.
///
/// Implementations must be safe to call repeatedly and from several tasks.
pub trait ServiceProvider: Send + Sync {
    /// Returns the service registered for `key` (last registration wins), or `None`.
    fn get_service(&self, key: ServiceKey) -> Result<Option<Service>, ResolveError>;

    /// Returns every service registered for `key`, in registration order.
    fn get_services(&self, key: ServiceKey) -> Result<Vec<Service>, ResolveError>;
}

impl dyn ServiceProvider + '_ {
    /// Resolves `S`, or `None` when nothing is registered.
    pub fn try_resolve<S>(&self) -> Result<Option<Arc<S>>, ResolveError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<S>();
        self.get_service(key)?
            .map(|svc| downcast::<S>(key, svc))
            .transpose()
    }

    /// Resolves `S`, failing with [`ResolveError::NotRegistered`] when absent.
    pub fn resolve<S>(&self) -> Result<Arc<S>, ResolveError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.try_resolve::<S>()?
            .ok_or(ResolveError::NotRegistered {
                service: type_name::<S>(),
            })
    }

    /// Resolves every registration of `S`. An empty vector is not an error.
    pub fn resolve_all<S>(&self) -> Result<Vec<Arc<S>>, ResolveError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<S>();
        self.get_services(key)?
            .into_iter()
            .map(|svc| downcast::<S>(key, svc))
            .collect()
    }
}

/// Wraps a typed service for storage behind [`ServiceProvider`].
pub fn erase<S>(svc: Arc<S>) -> Service
where
    S: ?Sized + Send + Sync + 'static,
{
    Arc::new(svc)
}

fn downcast<S>(key: ServiceKey, svc: Service) -> Result<Arc<S>, ResolveError>
where
    S: ?Sized + Send + Sync + 'static,
{
    (*svc)
        .downcast_ref::<Arc<S>>()
        .cloned()
        .ok_or(ResolveError::TypeMismatch {
            service: key.name(),
        })
}

/// An isolated resolution context. Dropping it disposes every scope-owned service.
pub trait ServiceScope: Send + Sync {
    /// The scope's resolution surface.
    fn services(&self) -> Arc<dyn ServiceProvider>;
}

/// Creates isolated scopes.
pub trait ScopeFactory: Send + Sync + 'static {
    /// Opens a new scope. The caller owns it and releases it by dropping.
    fn create_scope(&self) -> Result<Box<dyn ServiceScope>, ResolveError>;
}
