use std::time::Duration;

use scribe_core::error::CoreError;
use scribe_core::history::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};

/// Default number of retries after a lost append race.
pub const DEFAULT_APPEND_MAX_RETRIES: u32 = 3;

/// Default delay before the first append retry.
pub const DEFAULT_APPEND_RETRY_BACKOFF_MS: u64 = 25;

/// History service configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Page size when the caller gives none (default: `20`).
    pub default_page_limit: i64,
    /// Upper bound on any requested page size (default: `100`).
    pub max_page_limit: i64,
    /// Retries after a `ConflictingWrite` on append (default: `3`).
    pub append_max_retries: u32,
    /// First retry delay; doubles on each further attempt (default: `25ms`).
    pub append_retry_backoff: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_HISTORY_LIMIT,
            max_page_limit: MAX_HISTORY_LIMIT,
            append_max_retries: DEFAULT_APPEND_MAX_RETRIES,
            append_retry_backoff: Duration::from_millis(DEFAULT_APPEND_RETRY_BACKOFF_MS),
        }
    }
}

impl HistoryConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                           | Default |
    /// |-----------------------------------|---------|
    /// | `HISTORY_DEFAULT_PAGE_LIMIT`      | `20`    |
    /// | `HISTORY_MAX_PAGE_LIMIT`          | `100`   |
    /// | `HISTORY_APPEND_MAX_RETRIES`      | `3`     |
    /// | `HISTORY_APPEND_RETRY_BACKOFF_MS` | `25`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let defaults = Self::default();

        let config = Self {
            default_page_limit: parse_var(
                &lookup,
                "HISTORY_DEFAULT_PAGE_LIMIT",
                defaults.default_page_limit,
            )?,
            max_page_limit: parse_var(&lookup, "HISTORY_MAX_PAGE_LIMIT", defaults.max_page_limit)?,
            append_max_retries: parse_var(
                &lookup,
                "HISTORY_APPEND_MAX_RETRIES",
                defaults.append_max_retries,
            )?,
            append_retry_backoff: Duration::from_millis(parse_var(
                &lookup,
                "HISTORY_APPEND_RETRY_BACKOFF_MS",
                DEFAULT_APPEND_RETRY_BACKOFF_MS,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_page_limit < 1 {
            return Err(CoreError::Validation(
                "HISTORY_MAX_PAGE_LIMIT must be at least 1".into(),
            ));
        }
        if self.default_page_limit < 1 || self.default_page_limit > self.max_page_limit {
            return Err(CoreError::Validation(format!(
                "HISTORY_DEFAULT_PAGE_LIMIT must be between 1 and {}",
                self.max_page_limit
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, CoreError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| {
                CoreError::Validation(format!("{key} must be a valid number, got {raw:?}"))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = HistoryConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HistoryConfig::default());
        assert_eq!(config.append_retry_backoff, Duration::from_millis(25));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = HistoryConfig::from_lookup(lookup(&[
            ("HISTORY_DEFAULT_PAGE_LIMIT", "10"),
            ("HISTORY_MAX_PAGE_LIMIT", "50"),
            ("HISTORY_APPEND_MAX_RETRIES", "0"),
            ("HISTORY_APPEND_RETRY_BACKOFF_MS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.default_page_limit, 10);
        assert_eq!(config.max_page_limit, 50);
        assert_eq!(config.append_max_retries, 0);
        assert_eq!(config.append_retry_backoff, Duration::from_millis(5));
    }

    #[test]
    fn bad_values_rejected() {
        let non_numeric = lookup(&[("HISTORY_MAX_PAGE_LIMIT", "many")]);
        assert!(HistoryConfig::from_lookup(non_numeric).is_err());
        let over_max = lookup(&[("HISTORY_DEFAULT_PAGE_LIMIT", "500")]);
        assert!(HistoryConfig::from_lookup(over_max).is_err());
    }
}
