use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use relayhost::{
    Behavior, BehaviorError, BehaviorHost, Config, HandlerError, HostError,
    HostLifetimeNotifications, HostStarting, HostStopping, MessageDispatcher, MessagePublisher,
    Notification, NotificationHandler, RegistryBuilder, ResolveError, ScopeFactory,
    ServiceProvider,
};

#[derive(Debug)]
struct OrderPlaced {
    id: u64,
}

impl Notification for OrderPlaced {}

/// Journal shared by every handler instance.
#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<(&'static str, usize, u64)>>,
    tokens: Mutex<Vec<CancellationToken>>,
}

struct Audit {
    label: &'static str,
    journal: Arc<Journal>,
}

#[async_trait]
impl NotificationHandler<OrderPlaced> for Audit {
    async fn handle_notification(
        &self,
        n: &OrderPlaced,
        ctx: CancellationToken,
    ) -> Result<(), HandlerError> {
        self.journal
            .entries
            .lock()
            .push((self.label, n as *const _ as usize, n.id));
        self.journal.tokens.lock().push(ctx);
        Ok(())
    }
}

fn audit(
    label: &'static str,
    journal: &Arc<Journal>,
) -> impl Fn(&Arc<dyn ServiceProvider>) -> Result<Audit, ResolveError> + Send + Sync + 'static {
    let journal = journal.clone();
    move |_| {
        Ok(Audit {
            label,
            journal: journal.clone(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn dispatch_reaches_every_handler_with_one_instance_and_deadline() {
    let journal = Arc::new(Journal::default());
    let registry = RegistryBuilder::new()
        .with_handler::<OrderPlaced, _, _>(audit("billing", &journal))
        .with_handler::<OrderPlaced, _, _>(audit("shipping", &journal))
        .with_handler::<OrderPlaced, _, _>(audit("email", &journal))
        .build();
    let dispatcher = MessageDispatcher::new(registry.clone(), &Config::default());

    dispatcher
        .dispatch(OrderPlaced { id: 42 }, Some(Duration::from_secs(1)))
        .await
        .unwrap();

    let entries = journal.entries.lock().clone();
    let labels: Vec<_> = entries.iter().map(|e| e.0).collect();
    assert_eq!(labels, ["billing", "shipping", "email"]);
    assert!(entries.windows(2).all(|w| w[0].1 == w[1].1));
    assert!(entries.iter().all(|e| e.2 == 42));

    // The source is released on return; its token never fires afterwards.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(journal.tokens.lock().iter().all(|t| !t.is_cancelled()));
    assert_eq!(registry.live_scopes(), 0);
}

#[tokio::test]
async fn publisher_from_scope_reaches_handlers() {
    let journal = Arc::new(Journal::default());
    let registry = RegistryBuilder::new()
        .with_handler::<OrderPlaced, _, _>(audit("billing", &journal))
        .build();

    let scope = registry.create_scope().unwrap();
    let publisher = scope.services().resolve::<MessagePublisher>().unwrap();
    let ctx = CancellationToken::new();
    publisher.publish(&OrderPlaced { id: 1 }, &ctx).await.unwrap();
    assert_eq!(registry.live_scopes(), 1);
    drop(publisher);
    drop(scope);

    assert_eq!(journal.entries.lock().len(), 1);
    assert_eq!(registry.live_scopes(), 0);
}

/// Records which lifetime notifications arrived.
#[derive(Default)]
struct Lifecycle {
    seen: Mutex<Vec<&'static str>>,
}

struct Watcher(Arc<Lifecycle>);

#[async_trait]
impl NotificationHandler<HostStarting> for Watcher {
    async fn handle_notification(
        &self,
        _: &HostStarting,
        _: CancellationToken,
    ) -> Result<(), HandlerError> {
        self.0.seen.lock().push("starting");
        Ok(())
    }
}

#[async_trait]
impl NotificationHandler<HostStopping> for Watcher {
    async fn handle_notification(
        &self,
        _: &HostStopping,
        _: CancellationToken,
    ) -> Result<(), HandlerError> {
        self.0.seen.lock().push("stopping");
        Ok(())
    }
}

struct Flaky;

#[async_trait]
impl Behavior for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn start(&self, _: CancellationToken) -> Result<(), BehaviorError> {
        Ok(())
    }

    async fn stop(&self, _: CancellationToken) -> Result<(), BehaviorError> {
        Err(BehaviorError::fail("socket already closed"))
    }
}

#[tokio::test]
async fn host_runs_lifetime_notifications_beside_other_behaviors() {
    let lifecycle = Arc::new(Lifecycle::default());
    let (a, b) = (lifecycle.clone(), lifecycle.clone());
    let registry = RegistryBuilder::new()
        .with_handler::<HostStarting, _, _>(move |_| Ok(Watcher(a.clone())))
        .with_handler::<HostStopping, _, _>(move |_| Ok(Watcher(b.clone())))
        .build();
    let scopes: Arc<dyn ScopeFactory> = registry.clone();

    let host = BehaviorHost::new(vec![
        Arc::new(HostLifetimeNotifications::behavior(scopes)),
        Arc::new(Flaky),
    ]);
    assert_eq!(host.len(), 2);

    let shutdown = CancellationToken::new();
    shutdown.cancel();
    let err = host.run(shutdown).await.unwrap_err();

    assert!(matches!(err, HostError::BehaviorsFailed { .. }));
    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].behavior, "flaky");
    assert_eq!(*lifecycle.seen.lock(), ["starting", "stopping"]);
    assert_eq!(registry.live_scopes(), 0);
}
