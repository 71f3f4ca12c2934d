//! Configuration for the lineage engine

use lineage_llm::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for lineage generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Retries after the first attempt when the model is throttled
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,

    /// Uniform jitter applied to each delay, as a fraction of it
    pub jitter_ratio: f64,

    /// Minimum confidence for a node to count as verified
    pub confidence_threshold: f64,

    /// First segment of table qualified names
    pub qualified_name_prefix: String,

    /// List locally inferred data types in prompts
    pub include_type_hints: bool,
}

impl EngineConfig {
    /// Get the base retry delay as a Duration
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff schedule for the model invoker
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.base_delay(),
            jitter_ratio: self.jitter_ratio,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.jitter_ratio) {
            return Err("jitter_ratio must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("confidence_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.max_retries > 16 {
            return Err("max_retries cannot exceed 16".to_string());
        }
        if self.qualified_name_prefix.trim().is_empty() {
            return Err("qualified_name_prefix must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    /// Default configuration: five retries from one second, 0.7 threshold
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
            jitter_ratio: 0.2,
            confidence_threshold: 0.7,
            qualified_name_prefix: "domain".to_string(),
            include_type_hints: true,
        }
    }
}

impl EngineConfig {
    /// Aggressive preset: fewer, shorter retries for interactive use
    pub fn aggressive() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            ..Self::default()
        }
    }

    /// Lenient preset: more patient retries and a lower verification bar
    pub fn lenient() -> Self {
        Self {
            max_retries: 8,
            base_delay_ms: 2000,
            confidence_threshold: 0.5,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
