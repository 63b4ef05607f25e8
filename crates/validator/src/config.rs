use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("validator config is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("max_cycles_per_slice must be at least 1")]
    ZeroCycleBudget,
}

/// Time-slicing and restart policy for a [`crate::Validator`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Wall-clock budget of one slice. Zero means a slice runs until the
    /// pass completes.
    pub max_timespan: Duration,
    /// Delay before the next slice once a slice has used its budget.
    pub timeout: Duration,
    /// Optional cap on cycles per slice, checked alongside `max_timespan`.
    pub max_cycles_per_slice: Option<usize>,
    /// Restart from the nearest valid checkpoint instead of from the root.
    pub partial_restart: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_timespan: Duration::from_millis(100),
            timeout: Duration::from_millis(200),
            max_cycles_per_slice: None,
            partial_restart: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    max_timespan_ms: u64,
    timeout_ms: u64,
    max_cycles_per_slice: Option<usize>,
    partial_restart: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        let config = ValidatorConfig::default();
        Self {
            max_timespan_ms: config.max_timespan.as_millis() as u64,
            timeout_ms: config.timeout.as_millis() as u64,
            max_cycles_per_slice: config.max_cycles_per_slice,
            partial_restart: config.partial_restart,
        }
    }
}

impl ValidatorConfig {
    /// Reads a config table; missing keys keep their defaults.
    ///
    /// ```toml
    /// max_timespan_ms = 50
    /// timeout_ms = 10
    /// max_cycles_per_slice = 200
    /// partial_restart = false
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(source)?;
        if raw.max_cycles_per_slice == Some(0) {
            return Err(ConfigError::ZeroCycleBudget);
        }
        Ok(Self {
            max_timespan: Duration::from_millis(raw.max_timespan_ms),
            timeout: Duration::from_millis(raw.timeout_ms),
            max_cycles_per_slice: raw.max_cycles_per_slice,
            partial_restart: raw.partial_restart,
        })
    }

    /// Slices bounded only by a cycle count, for reproducible runs.
    pub fn deterministic(cycles_per_slice: usize) -> Self {
        Self {
            max_timespan: Duration::ZERO,
            timeout: Duration::from_millis(200),
            max_cycles_per_slice: Some(cycles_per_slice.max(1)),
            partial_restart: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_gives_defaults() {
        assert_eq!(
            ValidatorConfig::from_toml_str("").unwrap(),
            ValidatorConfig::default()
        );
    }

    #[test]
    fn reads_millisecond_fields() {
        let config = ValidatorConfig::from_toml_str(
            "max_timespan_ms = 0\ntimeout_ms = 5\nmax_cycles_per_slice = 3\npartial_restart = false\n",
        )
        .unwrap();
        assert_eq!(config.max_timespan, Duration::ZERO);
        assert_eq!(config.timeout, Duration::from_millis(5));
        assert_eq!(config.max_cycles_per_slice, Some(3));
        assert!(!config.partial_restart);
    }

    #[test]
    fn rejects_zero_cycle_budget_and_unknown_keys() {
        assert!(matches!(
            ValidatorConfig::from_toml_str("max_cycles_per_slice = 0"),
            Err(ConfigError::ZeroCycleBudget)
        ));
        assert!(matches!(
            ValidatorConfig::from_toml_str("slice = 1"),
            Err(ConfigError::Toml(_))
        ));
    }
}
