use crate::modules::sync_queue::core::backoff::RetryPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = ".freelance_ops";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub max_retry_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub startup_grace: Duration,
    pub weekly_target_minutes: u64,
    pub backfill_weeks: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            max_retry_attempts: policy.max_retry_attempts,
            initial_backoff: policy.initial_backoff,
            max_backoff: policy.max_backoff,
            startup_grace: policy.startup_grace,
            weekly_target_minutes: 2_400,
            backfill_weeks: 12,
        }
    }
}

impl AppConfig {
    /// Reads `FREELANCE_OPS_*` variables. Call `dotenvy::dotenv()` first to pick up a `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            data_dir: lookup("FREELANCE_OPS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_retry_attempts: parse(&lookup, "FREELANCE_OPS_MAX_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.max_retry_attempts),
            initial_backoff: parse(&lookup, "FREELANCE_OPS_INITIAL_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: parse(&lookup, "FREELANCE_OPS_MAX_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
            startup_grace: parse(&lookup, "FREELANCE_OPS_STARTUP_GRACE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.startup_grace),
            weekly_target_minutes: parse(&lookup, "FREELANCE_OPS_WEEKLY_TARGET_MINUTES")?
                .unwrap_or(defaults.weekly_target_minutes),
            backfill_weeks: parse(&lookup, "FREELANCE_OPS_BACKFILL_WEEKS")?
                .unwrap_or(defaults.backfill_weeks),
        };

        if config.max_retry_attempts == 0 {
            return Err(ConfigError::Invalid {
                name: "FREELANCE_OPS_MAX_RETRY_ATTEMPTS",
                value: "0".into(),
                expected: "at least 1",
            });
        }
        if config.max_backoff < config.initial_backoff {
            return Err(ConfigError::Invalid {
                name: "FREELANCE_OPS_MAX_BACKOFF_MS",
                value: config.max_backoff.as_millis().to_string(),
                expected: "no smaller than the initial backoff",
            });
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retry_attempts: self.max_retry_attempts,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
            startup_grace: self.startup_grace,
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }

    pub fn key_value_path(&self) -> PathBuf {
        self.data_dir.join("state.json")
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            expected: "a non-negative integer",
        })
}

#[cfg(test)]
mod app_config_tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[rstest]
    fn it_should_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.weekly_target_minutes, 2_400);
        assert_eq!(config.backfill_weeks, 12);
    }

    #[rstest]
    fn it_should_read_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FREELANCE_OPS_DATA_DIR", "/tmp/ops"),
            ("FREELANCE_OPS_MAX_RETRY_ATTEMPTS", "3"),
            ("FREELANCE_OPS_INITIAL_BACKOFF_MS", " 250 "),
            ("FREELANCE_OPS_WEEKLY_TARGET_MINUTES", "1800"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/ops"));
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/ops/store"));
        let policy = config.retry_policy();
        assert_eq!(policy.max_retry_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
        assert_eq!(policy.max_backoff, Duration::from_secs(60));
        assert_eq!(config.weekly_target_minutes, 1_800);
    }

    #[rstest]
    #[case("FREELANCE_OPS_BACKFILL_WEEKS", "twelve")]
    #[case("FREELANCE_OPS_STARTUP_GRACE_MS", "-5")]
    #[case("FREELANCE_OPS_MAX_RETRY_ATTEMPTS", "0")]
    #[case("FREELANCE_OPS_MAX_BACKOFF_MS", "10")]
    fn it_should_reject_invalid_values(#[case] name: &str, #[case] value: &str) {
        let result = AppConfig::from_lookup(lookup(&[(name, value)]));
        assert!(matches!(result, Err(ConfigError::Invalid { name: n, .. }) if n == name));
    }
}
