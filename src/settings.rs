//! Engine settings with persistence.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schema::ValidatorStrictness;

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub validator: ValidatorSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub observation: ObservationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Sampling and flattening settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSettings {
    #[serde(default = "default_sample_size")]
    pub sample_size: u64,
    /// Nesting depth below which documents are no longer walked.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Leading elements walked in an array of objects. 1 keeps the first-element heuristic.
    #[serde(default = "default_array_element_samples")]
    pub array_element_samples: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            max_depth: default_max_depth(),
            array_element_samples: default_array_element_samples(),
        }
    }
}

/// Validator synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidatorSettings {
    #[serde(default)]
    pub strictness: ValidatorStrictness,
}

/// Query-pattern analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default = "default_slow_query_millis")]
    pub slow_query_millis: u64,
    #[serde(default = "default_top_pattern_limit")]
    pub top_pattern_limit: usize,
    #[serde(default = "default_large_array_threshold")]
    pub large_array_threshold: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            slow_query_millis: default_slow_query_millis(),
            top_pattern_limit: default_top_pattern_limit(),
            large_array_threshold: default_large_array_threshold(),
        }
    }
}

/// Profiler observation window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSettings {
    #[serde(default = "default_observe_seconds")]
    pub observe_seconds: u64,
    /// Hard upper bound on any observation window.
    #[serde(default = "default_max_observe_seconds")]
    pub max_observe_seconds: u64,
}

impl ObservationSettings {
    /// Clamp a requested window to the configured upper bound.
    pub fn window(&self, requested: Option<Duration>) -> Duration {
        let requested = requested.unwrap_or(Duration::from_secs(self.observe_seconds));
        requested.min(Duration::from_secs(self.max_observe_seconds))
    }
}

impl Default for ObservationSettings {
    fn default() -> Self {
        Self {
            observe_seconds: default_observe_seconds(),
            max_observe_seconds: default_max_observe_seconds(),
        }
    }
}

/// Snapshot cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true, ttl_seconds: default_cache_ttl_seconds() }
    }
}

fn default_sample_size() -> u64 {
    1000
}

fn default_max_depth() -> usize {
    32
}

fn default_array_element_samples() -> usize {
    1
}

fn default_slow_query_millis() -> u64 {
    100
}

fn default_top_pattern_limit() -> usize {
    5
}

fn default_large_array_threshold() -> usize {
    50
}

fn default_observe_seconds() -> u64 {
    10
}

fn default_max_observe_seconds() -> u64 {
    60
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_true() -> bool {
    true
}
