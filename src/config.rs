//! Configuration for the revision store

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Store tunables.
///
/// Every field has a serde default, so a partial (or empty) TOML document
/// yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store a revision as a delta only if its change estimate against the
    /// base is at or below this value.
    #[serde(default = "default_delta_threshold")]
    pub delta_threshold: f64,

    /// Maximum number of delta hops between any revision and its nearest
    /// full blob. Writes that would exceed it fall back to a full blob.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: u32,

    /// How many bytes the change estimator scans from each end of a
    /// revision pair.
    #[serde(default = "default_scan_window")]
    pub scan_window: usize,

    /// Capacity of the chain-depth memo.
    #[serde(default = "default_chain_cache_entries")]
    pub chain_cache_entries: usize,

    /// Expected number of delta records, used to size the bloom filter.
    #[serde(default = "default_bloom_capacity")]
    pub bloom_capacity: usize,

    /// Target false-positive rate for the bloom filter at capacity.
    #[serde(default = "default_bloom_error")]
    pub bloom_error: f64,

    /// Maximum revision size in bytes.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
}

impl StoreConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the store cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.delta_threshold) {
            return Err(ConfigError::Invalid(format!(
                "delta_threshold must be in [0, 1], got {}",
                self.delta_threshold
            )));
        }
        if self.max_chain_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_chain_depth must be at least 1".to_string(),
            ));
        }
        if self.bloom_error <= 0.0 || self.bloom_error >= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "bloom_error must be in (0, 1), got {}",
                self.bloom_error
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            delta_threshold: default_delta_threshold(),
            max_chain_depth: default_max_chain_depth(),
            scan_window: default_scan_window(),
            chain_cache_entries: default_chain_cache_entries(),
            bloom_capacity: default_bloom_capacity(),
            bloom_error: default_bloom_error(),
            max_object_size: default_max_object_size(),
        }
    }
}

// Default value functions for serde

fn default_delta_threshold() -> f64 {
    0.8
}

fn default_max_chain_depth() -> u32 {
    50
}

fn default_scan_window() -> usize {
    1000
}

fn default_chain_cache_entries() -> usize {
    200
}

fn default_bloom_capacity() -> usize {
    10_000
}

fn default_bloom_error() -> f64 {
    0.01
}

fn default_max_object_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.delta_threshold, 0.8);
        assert_eq!(config.max_chain_depth, 50);
        assert_eq!(config.scan_window, 1000);
        assert_eq!(config.chain_cache_entries, 200);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = StoreConfig::from_toml_str("").unwrap();
        assert_eq!(config.max_chain_depth, 50);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = StoreConfig::from_toml_str(
            r#"
            delta_threshold = 0.5
            max_chain_depth = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.delta_threshold, 0.5);
        assert_eq!(config.max_chain_depth, 10);
        assert_eq!(config.scan_window, 1000);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = StoreConfig::from_toml_str("delta_threshold = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_zero_chain_depth_rejected() {
        let err = StoreConfig::from_toml_str("max_chain_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
