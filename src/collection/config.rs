//! Engine configuration
//!
//! Loaded from JSON; every field has a default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{QueryError, QueryResult};

/// What to do with queries classified as slow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlowQueriesMode {
    /// Run slow queries on the slow connection
    #[default]
    Redirect,
    /// Run slow queries on the fast connection
    Enable,
    /// Reject slow queries
    Disable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Server-side LIMIT ceiling (default: 50)
    #[serde(default = "default_max_result_limit")]
    pub max_result_limit: usize,

    /// LIMIT used when the caller gives none (default: 50)
    #[serde(default = "default_result_limit")]
    pub default_result_limit: usize,

    /// Delay between polls of a wait-for call (default: 5000)
    #[serde(default = "default_wait_poll_interval_ms")]
    pub wait_poll_interval_ms: u64,

    /// Upper bound for a requested wait timeout (default: 2147483647)
    #[serde(default = "default_max_wait_timeout_ms")]
    pub max_wait_timeout_ms: u64,

    /// Buffered-or-pending documents per subscription (default: 10)
    #[serde(default = "default_subscription_queue_capacity")]
    pub subscription_queue_capacity: usize,

    /// Period of index catalog polling (default: 60000)
    #[serde(default = "default_index_refresh_interval_ms")]
    pub index_refresh_interval_ms: u64,

    #[serde(default)]
    pub slow_queries: SlowQueriesMode,
}

fn default_max_result_limit() -> usize {
    50
}

fn default_result_limit() -> usize {
    50
}

fn default_wait_poll_interval_ms() -> u64 {
    5000
}

fn default_max_wait_timeout_ms() -> u64 {
    2_147_483_647
}

fn default_subscription_queue_capacity() -> usize {
    10
}

fn default_index_refresh_interval_ms() -> u64 {
    60_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_result_limit: default_max_result_limit(),
            default_result_limit: default_result_limit(),
            wait_poll_interval_ms: default_wait_poll_interval_ms(),
            max_wait_timeout_ms: default_max_wait_timeout_ms(),
            subscription_queue_capacity: default_subscription_queue_capacity(),
            index_refresh_interval_ms: default_index_refresh_interval_ms(),
            slow_queries: SlowQueriesMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> QueryResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| QueryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.max_result_limit == 0 {
            return Err(QueryError::Config("max_result_limit must be positive".into()));
        }
        if self.subscription_queue_capacity == 0 {
            return Err(QueryError::Config(
                "subscription_queue_capacity must be positive".into(),
            ));
        }
        if self.wait_poll_interval_ms == 0 {
            return Err(QueryError::Config("wait_poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Effective LIMIT for a caller-requested limit
    pub fn result_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_result_limit)
            .min(self.max_result_limit)
    }

    pub fn wait_poll_interval(&self) -> Duration {
        Duration::from_millis(self.wait_poll_interval_ms)
    }

    pub fn index_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.index_refresh_interval_ms)
    }

    /// Requested wait timeout clamped to the configured maximum
    pub fn wait_timeout(&self, requested_ms: u64) -> Duration {
        Duration::from_millis(requested_ms.min(self.max_wait_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_result_limit, 50);
        assert_eq!(config.wait_poll_interval(), Duration::from_secs(5));
        assert_eq!(config.subscription_queue_capacity, 10);
        assert_eq!(config.slow_queries, SlowQueriesMode::Redirect);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"slow_queries": "disable"}"#).unwrap();
        assert_eq!(config.slow_queries, SlowQueriesMode::Disable);
        assert_eq!(config.index_refresh_interval_ms, 60_000);
    }

    #[test]
    fn test_limit_is_capped() {
        let config = EngineConfig::default();
        assert_eq!(config.result_limit(Some(1000)), 50);
        assert_eq!(config.result_limit(Some(7)), 7);
        assert_eq!(config.result_limit(None), 50);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(EngineConfig::from_json_str(r#"{"max_result_limit": 0}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"slow_queries": "sometimes"}"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"wait_poll_interval_ms": 100}"#).unwrap();
        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.wait_poll_interval(), Duration::from_millis(100));
        assert!(EngineConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
