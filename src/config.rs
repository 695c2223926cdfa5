//! # Global runtime configuration.
//!
//! Provides [`Config`], centralized settings for the dispatcher and the behavior host.
//!
//! Config is used in two places:
//! 1. **Dispatch defaults**: `MessageDispatcher::new(.., &config)` reads the default dispatch timeout
//! 2. **Host shutdown**: `BehaviorHost::with_config(.., &config)` reads the stop grace period
//!
//! ## Sentinel values
//! - `dispatch_timeout = 0s` → no deadline (dispatch waits until handlers finish)
//! - `grace = 0s` → stop is not bounded
//!
//! ## File format
//! ```toml
//! dispatch_timeout_ms = 5000
//! grace_ms = 30000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Global configuration for messaging and hosting.
///
/// ## Field semantics
/// - `dispatch_timeout`: Default deadline for [`MessageDispatcher`](crate::MessageDispatcher) (`0s` = none)
/// - `grace`: Maximum wait for behaviors to stop in [`BehaviorHost::run`](crate::BehaviorHost::run) (`0s` = unbounded)
///
/// All fields are public. Prefer the helper accessors over sprinkling `0` checks.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Deadline applied by the dispatcher when the caller does not pass one.
    #[serde(rename = "dispatch_timeout_ms", deserialize_with = "duration_ms")]
    pub dispatch_timeout: Duration,

    /// Maximum time to wait for all behaviors to stop after a shutdown request.
    #[serde(rename = "grace_ms", deserialize_with = "duration_ms")]
    pub grace: Duration,
}

impl Config {
    /// Parses configuration from a TOML document. Missing keys keep their defaults.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use relayhost::Config;
    ///
    /// let cfg = Config::from_toml_str("dispatch_timeout_ms = 1500").unwrap();
    /// assert_eq!(cfg.dispatch_timeout, Duration::from_millis(1500));
    /// assert_eq!(cfg.grace, Config::default().grace);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Returns the default dispatch deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → dispatch stops waiting after `d`
    #[inline]
    pub fn default_dispatch_timeout(&self) -> Option<Duration> {
        if self.dispatch_timeout == Duration::ZERO {
            None
        } else {
            Some(self.dispatch_timeout)
        }
    }

    /// Returns the stop grace period as an `Option` (`None` = unbounded).
    #[inline]
    pub fn stop_grace(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `dispatch_timeout = 0s` (no deadline)
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::ZERO,
            grace: Duration::from_secs(30),
        }
    }
}

fn duration_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.default_dispatch_timeout(), None);
        assert_eq!(cfg.stop_grace(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_all_fields() {
        let cfg = Config::from_toml_str("dispatch_timeout_ms = 250\ngrace_ms = 0\n").unwrap();
        assert_eq!(cfg.default_dispatch_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(cfg.stop_grace(), None);
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_toml_str("dispatch_timeout = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
