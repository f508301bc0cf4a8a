//! Runtime configuration for the store and its services.
//!
//! # Responsibility
//! - Carry tunables (storage key, toast lifetimes, reminder cadence) with
//!   defaults that match the shipped behavior.
//! - Load overrides from a JSON document where every field is optional.
//!
//! # Invariants
//! - Durations are expressed in milliseconds on the wire.
//! - `storage_key` is non-blank and `check_interval` is non-zero after load.

use serde::{Deserialize, Deserializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_STORAGE_KEY: &str = "todo-app.todos";
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(4_000);
pub const DEFAULT_ERROR_TOAST_DURATION: Duration = Duration::from_millis(6_000);
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_REMINDER_LEAD_TIME: Duration = Duration::from_secs(60);
pub const DEFAULT_REMINDER_TOAST_DURATION: Duration = Duration::from_millis(8_000);

/// Configuration load/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Store persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Durable slot name the full list is written under.
    pub storage_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// Toast lifetimes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    #[serde(rename = "default_duration_ms", deserialize_with = "millis")]
    pub default_duration: Duration,
    #[serde(rename = "error_duration_ms", deserialize_with = "millis")]
    pub error_duration: Duration,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_TOAST_DURATION,
            error_duration: DEFAULT_ERROR_TOAST_DURATION,
        }
    }
}

/// Reminder poller cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    #[serde(rename = "check_interval_ms", deserialize_with = "millis")]
    pub check_interval: Duration,
    /// How long before the due time a reminder may fire.
    #[serde(rename = "lead_time_ms", deserialize_with = "millis")]
    pub lead_time: Duration,
    #[serde(rename = "toast_duration_ms", deserialize_with = "millis")]
    pub toast_duration: Duration,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_REMINDER_INTERVAL,
            lead_time: DEFAULT_REMINDER_LEAD_TIME,
            toast_duration: DEFAULT_REMINDER_TOAST_DURATION,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub store: StoreConfig,
    pub toasts: ToastConfig,
    pub reminders: ReminderConfig,
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store.storage_key must not be blank".to_string(),
            ));
        }
        if self.reminders.check_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "reminders.check_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DEFAULT_STORAGE_KEY};
    use std::time::Duration;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.store.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.toasts.error_duration, Duration::from_millis(6_000));
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config = CoreConfig::from_json_str(
            r#"{"reminders": {"check_interval_ms": 5000}, "store": {"storage_key": "work"}}"#,
        )
        .unwrap();
        assert_eq!(config.reminders.check_interval, Duration::from_secs(5));
        assert_eq!(config.reminders.lead_time, Duration::from_secs(60));
        assert_eq!(config.store.storage_key, "work");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = CoreConfig::from_json_str(r#"{"reminders": {"check_interval_ms": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
