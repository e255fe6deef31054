use std::time::Duration;

use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use service_core::retry::RetryConfig;

use crate::services::Deadline;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    #[serde(default)]
    pub linking: LinkingConfig,
}

/// Tuning knobs for the linking engine.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkingConfig {
    /// Retries for transient storage conflicts before surfacing failure.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Initial conflict-retry backoff in milliseconds (doubles per attempt).
    #[serde(default = "default_conflict_backoff_ms")]
    pub conflict_backoff_ms: u64,
    /// Default per-operation deadline in milliseconds; 0 means unbounded.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_conflict_backoff_ms() -> u64 {
    50
}

fn default_operation_timeout_ms() -> u64 {
    10_000
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: default_max_conflict_retries(),
            conflict_backoff_ms: default_conflict_backoff_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl LinkingConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_conflict_retries,
            initial_backoff: Duration::from_millis(self.conflict_backoff_ms),
            ..Default::default()
        }
    }

    /// Deadline applied when a caller passes an unbounded one.
    pub fn default_deadline(&self) -> Deadline {
        if self.operation_timeout_ms == 0 {
            Deadline::none()
        } else {
            Deadline::after(Duration::from_millis(self.operation_timeout_ms))
        }
    }
}

impl IdentityConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config::default(),
            linking: LinkingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linking_defaults() {
        let linking = LinkingConfig::default();
        assert_eq!(linking.max_conflict_retries, 3);
        assert_eq!(linking.retry().max_retries, 3);
        assert!(!linking.default_deadline().is_unbounded());
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let linking = LinkingConfig {
            operation_timeout_ms: 0,
            ..Default::default()
        };
        assert!(linking.default_deadline().is_unbounded());
    }
}
