//! # Example: lifecycle
//!
//! A small service wired end to end:
//! - a `Gateway` behavior that emits `MessageReceived` from a background task,
//! - two handlers reacting to `MessageReceived` (one of them always fails),
//! - `HostLifetimeNotifications` announcing start and stop.
//!
//! ## Flow
//! ```text
//! BehaviorHost::run(shutdown)
//!   ├─► HostLifetimeNotifications.start ─► publish(HostStarting) ─► Banner
//!   ├─► Gateway.start ─► spawn pump
//!   │        └─ every 300ms: dispatcher.dispatch_detached(MessageReceived)
//!   │                          ├─► Echo
//!   │                          └─► Moderation (fails, logged, Echo unaffected)
//!   ├─► Ctrl-C, or shutdown after 2s
//!   └─► stop: Gateway cancels its pump, HostStopping ─► Banner
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example lifecycle
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use tracing_subscriber::EnvFilter;

use relayhost::{
    Behavior, BehaviorError, BehaviorHost, BehaviorRef, Config, HandlerError,
    HostLifetimeNotifications, HostStarting, HostStopping, LogScopeProvider, MessageDispatcher,
    Notification, NotificationHandler, RegistryBuilder,
};

/// A chat message arriving from the outside world.
struct MessageReceived {
    channel: String,
    content: String,
}

impl LogScopeProvider for MessageReceived {
    fn begin_log_scope(&self) -> Span {
        tracing::info_span!("message", channel = %self.channel)
    }
}

impl Notification for MessageReceived {
    fn log_scope_provider(&self) -> Option<&dyn LogScopeProvider> {
        Some(self)
    }
}

struct Echo;

#[async_trait]
impl NotificationHandler<MessageReceived> for Echo {
    async fn handle_notification(
        &self,
        n: &MessageReceived,
        _ctx: CancellationToken,
    ) -> Result<(), HandlerError> {
        println!("[echo] #{}: {}", n.channel, n.content);
        Ok(())
    }
}

struct Moderation;

#[async_trait]
impl NotificationHandler<MessageReceived> for Moderation {
    async fn handle_notification(
        &self,
        _n: &MessageReceived,
        _ctx: CancellationToken,
    ) -> Result<(), HandlerError> {
        Err(HandlerError::fail("moderation backend unreachable"))
    }
}

struct Banner;

#[async_trait]
impl NotificationHandler<HostStarting> for Banner {
    async fn handle_notification(
        &self,
        _: &HostStarting,
        _: CancellationToken,
    ) -> Result<(), HandlerError> {
        println!("[banner] host starting");
        Ok(())
    }
}

#[async_trait]
impl NotificationHandler<HostStopping> for Banner {
    async fn handle_notification(
        &self,
        _: &HostStopping,
        _: CancellationToken,
    ) -> Result<(), HandlerError> {
        println!("[banner] host stopping");
        Ok(())
    }
}

/// Emits a message every 300ms until stopped.
struct Gateway {
    dispatcher: Arc<MessageDispatcher>,
    pump: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

#[async_trait]
impl Behavior for Gateway {
    fn name(&self) -> &str {
        "gateway"
    }

    async fn start(&self, _ctx: CancellationToken) -> Result<(), BehaviorError> {
        let stop = CancellationToken::new();
        let dispatcher = self.dispatcher.clone();
        let handle = tokio::spawn({
            let stop = stop.clone();
            async move {
                let mut seq = 0u64;
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_millis(300)) => {}
                    }
                    seq += 1;
                    dispatcher.dispatch_detached(
                        MessageReceived {
                            channel: "general".into(),
                            content: format!("hello #{seq}"),
                        },
                        None,
                    );
                }
            }
        });
        *self.pump.lock() = Some((stop, handle));
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), BehaviorError> {
        let pump = self.pump.lock().take();
        if let Some((stop, handle)) = pump {
            stop.cancel();
            handle.await.map_err(BehaviorError::fail)?;
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_toml_str(
        r#"
        dispatch_timeout_ms = 500
        grace_ms = 2000
        "#,
    )?;

    let registry = RegistryBuilder::new()
        .with_handler::<MessageReceived, _, _>(|_| Ok(Echo))
        .with_handler::<MessageReceived, _, _>(|_| Ok(Moderation))
        .with_handler::<HostStarting, _, _>(|_| Ok(Banner))
        .with_handler::<HostStopping, _, _>(|_| Ok(Banner))
        .build();

    let dispatcher = Arc::new(MessageDispatcher::new(registry.clone(), &cfg));
    let behaviors: Vec<BehaviorRef> = vec![
        Arc::new(HostLifetimeNotifications::behavior(registry.clone())),
        Arc::new(Gateway {
            dispatcher,
            pump: Mutex::new(None),
        }),
    ];
    let host = BehaviorHost::with_config(behaviors, &cfg);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            shutdown.cancel();
        }
    });

    host.run(shutdown).await?;
    println!("[main] live scopes after shutdown: {}", registry.live_scopes());
    Ok(())
}
