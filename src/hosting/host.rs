//! # BehaviorHost: parallel start/stop of every registered behavior.
//!
//! ## Architecture
//! ```text
//! start(ctx) / stop(ctx)
//!   ├─ no behaviors → Ok (no task spawned)
//!   └─ JoinSet
//!        ├─► spawn behavior[0].start(ctx.clone())   ── catch_unwind
//!        ├─► spawn behavior[1].start(ctx.clone())   ── catch_unwind
//!        └─► spawn behavior[N].start(ctx.clone())   ── catch_unwind
//!   join ALL (no short-circuit)
//!   └─ failures? → HostError::BehaviorsFailed { phase, failures }
//! ```
//!
//! ## Rules
//! - Behaviors start (and stop) concurrently; no ordering among them.
//! - The caller's token is passed to every behavior unchanged.
//! - One failing behavior never cancels its siblings; every failure is reported.
//! - The behavior set is fixed at construction.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{BehaviorError, BehaviorFailure, HostError, Phase};
use crate::hosting::behavior::BehaviorRef;
use crate::hosting::shutdown;
use crate::messaging::panic_message;

/// Starts and stops a fixed set of behaviors together.
pub struct BehaviorHost {
    behaviors: Arc<[BehaviorRef]>,
    grace: Option<Duration>,
}

impl BehaviorHost {
    /// Creates a host with the default [`Config`].
    pub fn new(behaviors: Vec<BehaviorRef>) -> Self {
        Self::with_config(behaviors, &Config::default())
    }

    /// Creates a host using `cfg.grace` to bound [`run`](Self::run)'s stop phase.
    pub fn with_config(behaviors: Vec<BehaviorRef>, cfg: &Config) -> Self {
        Self {
            behaviors: behaviors.into(),
            grace: cfg.stop_grace(),
        }
    }

    /// Number of registered behaviors.
    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    /// Returns `true` if no behaviors are registered.
    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// Starts every behavior concurrently and waits for all of them.
    pub async fn start(&self, ctx: CancellationToken) -> Result<(), HostError> {
        self.run_phase(Phase::Start, ctx).await
    }

    /// Stops every behavior concurrently and waits for all of them.
    pub async fn stop(&self, ctx: CancellationToken) -> Result<(), HostError> {
        self.run_phase(Phase::Stop, ctx).await
    }

    /// Starts all behaviors, waits for a termination signal or `shutdown`, then stops them.
    ///
    /// ### Shutdown semantics
    /// - `start` receives `shutdown`, so a slow start can be abandoned.
    /// - `stop` receives a fresh token that is cancelled once the grace period elapses.
    /// - Exceeding the grace returns [`HostError::GraceExceeded`]; unfinished stop
    ///   tasks are aborted.
    /// - If `start` fails or signal handlers cannot be installed, every behavior is
    ///   still stopped before the original error is returned.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), HostError> {
        if let Err(e) = self.start(shutdown.clone()).await {
            warn!(error = %e, label = e.as_label(), "start failed; stopping behaviors");
            if let Err(stop_err) = self.stop_within_grace().await {
                warn!(error = %stop_err, label = stop_err.as_label(), "stop after failed start");
            }
            return Err(e);
        }
        info!(behaviors = self.len(), "behaviors started");

        let signal = tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => {
                if res.is_ok() {
                    info!("shutdown signal received");
                }
                res
            }
            _ = shutdown.cancelled() => {
                info!("shutdown requested");
                Ok(())
            }
        };

        let stopped = self.stop_within_grace().await;
        if let Err(e) = signal {
            if let Err(stop_err) = stopped {
                warn!(error = %stop_err, label = stop_err.as_label(), "stop after signal failure");
            }
            return Err(e.into());
        }
        stopped
    }

    /// Stops every behavior with a fresh token, bounded by the configured grace.
    async fn stop_within_grace(&self) -> Result<(), HostError> {
        let stop_ctx = CancellationToken::new();
        let Some(grace) = self.grace else {
            return self.stop(stop_ctx).await;
        };

        match tokio::time::timeout(grace, self.stop(stop_ctx.clone())).await {
            Ok(res) => res,
            Err(_elapsed) => {
                stop_ctx.cancel();
                warn!(grace = ?grace, "behaviors did not stop within grace");
                Err(HostError::GraceExceeded { grace })
            }
        }
    }

    async fn run_phase(&self, phase: Phase, ctx: CancellationToken) -> Result<(), HostError> {
        if self.behaviors.is_empty() {
            return Ok(());
        }

        let mut set = JoinSet::new();
        for behavior in self.behaviors.iter().cloned() {
            let ctx = ctx.clone();
            set.spawn(async move {
                let name = behavior.name().to_string();
                debug!(behavior = %name, %phase, "behavior phase begins");

                let fut = async {
                    match phase {
                        Phase::Start => behavior.start(ctx).await,
                        Phase::Stop => behavior.stop(ctx).await,
                    }
                };
                let res = match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(res) => res,
                    Err(panic) => Err(BehaviorError::Panicked {
                        info: panic_message(&*panic),
                    }),
                };
                (name, res)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (behavior, res) = match joined {
                Ok(outcome) => outcome,
                Err(join_err) => (
                    "<unknown>".to_string(),
                    Err(BehaviorError::Panicked {
                        info: join_err.to_string(),
                    }),
                ),
            };
            if let Err(error) = res {
                error!(
                    behavior = %behavior,
                    %phase,
                    error = %error,
                    label = error.as_label(),
                    "behavior failed"
                );
                failures.push(BehaviorFailure { behavior, error });
            }
        }

        if failures.is_empty() {
            debug!(%phase, behaviors = self.len(), "all behaviors completed");
            Ok(())
        } else {
            Err(HostError::BehaviorsFailed { phase, failures })
        }
    }
}
