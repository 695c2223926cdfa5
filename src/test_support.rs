//! Test doubles shared by unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::span::{Attributes, Id};
use tracing::{Span, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::cancellation::{CancellationSource, CancellationSourceFactory};
use crate::error::{HandlerError, ResolveError};
use crate::messaging::{LogScopeProvider, Notification, NotificationHandler};
use crate::services::{Scope, ScopeFactory, ServiceProvider, ServiceRegistry, ServiceScope};

pub(crate) fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Scope factory that counts created and disposed scopes.
pub(crate) struct CountingScopes {
    inner: Arc<ServiceRegistry>,
    pub created: Arc<AtomicUsize>,
    pub disposed: Arc<AtomicUsize>,
}

impl CountingScopes {
    pub fn new(inner: Arc<ServiceRegistry>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            created: counter(),
            disposed: counter(),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl ScopeFactory for CountingScopes {
    fn create_scope(&self) -> Result<Box<dyn ServiceScope>, ResolveError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingScope {
            inner: self.inner.scope(),
            disposed: self.disposed.clone(),
        }))
    }
}

struct CountingScope {
    inner: Scope,
    disposed: Arc<AtomicUsize>,
}

impl ServiceScope for CountingScope {
    fn services(&self) -> Arc<dyn ServiceProvider> {
        self.inner.services()
    }
}

impl Drop for CountingScope {
    fn drop(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scope factory that always fails.
pub(crate) struct BrokenScopes;

impl ScopeFactory for BrokenScopes {
    fn create_scope(&self) -> Result<Box<dyn ServiceScope>, ResolveError> {
        Err(ResolveError::Factory {
            service: "scope",
            error: "container shut down".into(),
        })
    }
}

/// Cancellation factory that records requested delays and hands out one shared token.
pub(crate) struct RecordingCancellation {
    pub token: CancellationToken,
    delays: Mutex<Vec<Duration>>,
    dropped: Arc<AtomicUsize>,
}

impl RecordingCancellation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            token: CancellationToken::new(),
            delays: Mutex::new(Vec::new()),
            dropped: counter(),
        })
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl CancellationSourceFactory for RecordingCancellation {
    fn create(&self, delay: Duration) -> Box<dyn CancellationSource> {
        self.delays.lock().push(delay);
        Box::new(RecordedSource {
            token: self.token.clone(),
            dropped: self.dropped.clone(),
        })
    }
}

struct RecordedSource {
    token: CancellationToken,
    dropped: Arc<AtomicUsize>,
}

impl CancellationSource for RecordedSource {
    fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for RecordedSource {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Test notification.
#[derive(Debug, Default)]
pub(crate) struct Ping;

impl Notification for Ping {}

/// Test notification carrying a log scope.
#[derive(Debug, Default)]
pub(crate) struct Traced;

impl LogScopeProvider for Traced {
    fn begin_log_scope(&self) -> Span {
        tracing::info_span!("traced_notification")
    }
}

impl Notification for Traced {
    fn log_scope_provider(&self) -> Option<&dyn LogScopeProvider> {
        Some(self)
    }
}

/// What a [`Recorder`] saw.
#[derive(Default)]
pub(crate) struct Seen {
    /// Address of every notification instance received.
    pub addresses: Mutex<Vec<usize>>,
    /// Token of every invocation.
    pub tokens: Mutex<Vec<CancellationToken>>,
}

impl Seen {
    pub fn calls(&self) -> usize {
        self.addresses.lock().len()
    }
}

/// Handler that records its invocations and optionally fails.
pub(crate) struct Recorder {
    pub seen: Arc<Seen>,
    pub fail: bool,
}

#[async_trait]
impl<N: Notification> NotificationHandler<N> for Recorder {
    async fn handle_notification(
        &self,
        notification: &N,
        ctx: CancellationToken,
    ) -> Result<(), HandlerError> {
        self.seen
            .addresses
            .lock()
            .push(notification as *const N as usize);
        self.seen.tokens.lock().push(ctx);
        if self.fail {
            return Err(HandlerError::fail("recorder told to fail"));
        }
        Ok(())
    }
}

/// Counts opened and closed spans with a given name.
pub(crate) struct SpanCounter {
    name: &'static str,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl SpanCounter {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            opened: counter(),
            closed: counter(),
        }
    }
}

impl<S> Layer<S> for SpanCounter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        if attrs.metadata().name() == self.name {
            self.opened.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if ctx.span(&id).is_some_and(|span| span.name() == self.name) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
