//! # Cancellation sources with optional deadlines.
//!
//! A [`CancellationSource`] owns a [`CancellationToken`] and, optionally, a timer
//! that cancels the token once a deadline elapses. Sources are produced by a
//! [`CancellationSourceFactory`] so callers (the dispatcher) can be tested with
//! deterministic doubles instead of real timers.
//!
//! ## Rules
//! - `Duration::ZERO` → no timer; the token is only cancelled explicitly.
//! - Dropping a source stops its timer. It does **not** cancel the token, so
//!   clones handed to still-running work keep their current state.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// An owned cancellation context.
pub trait CancellationSource: Send + Sync {
    /// Token observed by work running under this context.
    fn token(&self) -> CancellationToken;

    /// Cancels the token now.
    fn cancel(&self) {
        self.token().cancel();
    }
}

/// Creates cancellation contexts, optionally bound to a deadline.
pub trait CancellationSourceFactory: Send + Sync + 'static {
    /// Creates a context that cancels itself after `delay` (`Duration::ZERO` = never).
    fn create(&self, delay: Duration) -> Box<dyn CancellationSource>;
}

/// Factory backed by tokio timers.
///
/// Must be used from within a tokio runtime when `delay > 0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimedCancellationSourceFactory;

impl CancellationSourceFactory for TimedCancellationSourceFactory {
    fn create(&self, delay: Duration) -> Box<dyn CancellationSource> {
        Box::new(TimedCancellationSource::new(delay))
    }
}

/// Token plus an optional deadline timer.
#[derive(Debug)]
pub struct TimedCancellationSource {
    token: CancellationToken,
    timer: Option<JoinHandle<()>>,
}

impl TimedCancellationSource {
    /// Creates a source; a non-zero `delay` arms a timer on the current runtime.
    pub fn new(delay: Duration) -> Self {
        let token = CancellationToken::new();
        let timer = (delay > Duration::ZERO).then(|| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => token.cancel(),
                    _ = token.cancelled() => {}
                }
            })
        });
        Self { token, timer }
    }

    /// Returns `true` if a deadline timer was armed.
    pub fn has_deadline(&self) -> bool {
        self.timer.is_some()
    }
}

impl CancellationSource for TimedCancellationSource {
    fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for TimedCancellationSource {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_token() {
        let source = TimedCancellationSourceFactory.create(Duration::from_secs(1));
        let token = source.token();
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(!token.is_cancelled());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_never_fires() {
        let source = TimedCancellationSource::new(Duration::ZERO);
        assert!(!source.has_deadline());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!source.token().is_cancelled());

        source.cancel();
        assert!(source.token().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_disarms_timer_without_cancelling() {
        let source = TimedCancellationSource::new(Duration::from_secs(1));
        let token = source.token();
        drop(source);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!token.is_cancelled());
    }
}
