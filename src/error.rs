//! Error types used by the relayhost runtime, handlers and behaviors.
//!
//! This module defines the error enums that cross module boundaries:
//!
//! - [`HandlerError`]: raised by a single notification handler. Never propagated
//!   past the fan-out; it is logged and the next handler runs.
//! - [`BehaviorError`]: raised by a behavior's start/stop hook.
//! - [`HostError`]: raised by [`BehaviorHost`](crate::BehaviorHost) after every
//!   behavior has been awaited.
//! - [`ResolveError`]: the resolution surface could not produce a scope or service.
//! - [`ConfigError`]: configuration could not be read or parsed.
//!
//! All types provide `as_label` (stable snake_case string for logs/metrics).

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by notification handlers.
///
/// These are recovered locally by the fan-out: logged with handler and
/// notification context, then swallowed.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Handler failed to process the notification.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler observed cancellation and gave up.
    #[error("handler cancelled")]
    Canceled,
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use relayhost::HandlerError;
    ///
    /// assert_eq!(HandlerError::fail("boom").as_label(), "handler_failed");
    /// assert_eq!(HandlerError::Canceled.as_label(), "handler_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Canceled => "handler_canceled",
        }
    }
}

/// # Errors produced by the resolution surface.
///
/// Fatal to the single publish/dispatch/behavior call that hit it; returned to
/// the immediate caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No registration exists for the requested service.
    #[error("service not registered: {service}")]
    NotRegistered {
        /// Type name of the requested service.
        service: &'static str,
    },

    /// The scope backing this provider has already been disposed.
    #[error("service scope already disposed")]
    ScopeDisposed,

    /// A registration produced a value of an unexpected type.
    #[error("service registered with a mismatched type: {service}")]
    TypeMismatch {
        /// Type name of the requested service.
        service: &'static str,
    },

    /// A service factory failed.
    #[error("factory for {service} failed: {error}")]
    Factory {
        /// Type name of the requested service.
        service: &'static str,
        /// The underlying error message.
        error: String,
    },
}

impl ResolveError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::NotRegistered { .. } => "resolve_not_registered",
            ResolveError::ScopeDisposed => "resolve_scope_disposed",
            ResolveError::TypeMismatch { .. } => "resolve_type_mismatch",
            ResolveError::Factory { .. } => "resolve_factory_failed",
        }
    }
}

/// # Errors produced by behaviors.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BehaviorError {
    /// Behavior hook failed.
    #[error("behavior failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Scope or service resolution failed inside the behavior.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Behavior panicked while starting or stopping.
    #[error("behavior panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl BehaviorError {
    /// Shorthand for [`BehaviorError::Fail`].
    pub fn fail(error: impl fmt::Display) -> Self {
        BehaviorError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BehaviorError::Fail { .. } => "behavior_failed",
            BehaviorError::Resolve(_) => "behavior_resolve_failed",
            BehaviorError::Panicked { .. } => "behavior_panicked",
        }
    }
}

/// Which host operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `BehaviorHost::start`.
    Start,
    /// `BehaviorHost::stop`.
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => f.write_str("start"),
            Phase::Stop => f.write_str("stop"),
        }
    }
}

/// A single behavior that failed during a host operation.
#[derive(Debug)]
pub struct BehaviorFailure {
    /// Behavior name (see [`Behavior::name`](crate::Behavior::name)).
    pub behavior: String,
    /// What went wrong.
    pub error: BehaviorError,
}

/// # Errors produced by the behavior host.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// One or more behaviors failed. Every behavior was awaited before this was returned.
    #[error("{} behavior(s) failed to {phase}; first: {}", failures.len(), first_failure(failures))]
    BehaviorsFailed {
        /// Operation that failed.
        phase: Phase,
        /// All failures, in completion order.
        failures: Vec<BehaviorFailure>,
    },

    /// Stop did not finish within the configured grace period.
    #[error("shutdown grace {grace:?} exceeded")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },

    /// Could not install OS signal handlers.
    #[error("signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

fn first_failure(failures: &[BehaviorFailure]) -> String {
    failures
        .first()
        .map(|f| format!("{}: {}", f.behavior, f.error))
        .unwrap_or_default()
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::BehaviorsFailed { .. } => "host_behaviors_failed",
            HostError::GraceExceeded { .. } => "host_grace_exceeded",
            HostError::Signal(_) => "host_signal",
        }
    }

    /// Returns the collected behavior failures, if any.
    pub fn failures(&self) -> &[BehaviorFailure] {
        match self {
            HostError::BehaviorsFailed { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// # Errors produced while loading configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML or has unexpected fields.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
