//! Runtime configuration for the navigation engine.
//!
//! All fields have defaults; a JSON document only needs to name the values it
//! overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::nav_error::NavError;

/// Smallest budget a request may ask for.
pub const MIN_BUDGET: usize = 5;
/// Largest budget a request may ask for.
pub const MAX_BUDGET: usize = 500;
/// Budget used when a request does not name one.
pub const DEFAULT_BUDGET: usize = 25;
/// Share of the budget spent on the base cut.
pub const HEADROOM_RATIO: f64 = 0.45;
/// Budgets below `TINY_BUDGET + 1` use every slot but one for the base cut.
pub const TINY_BUDGET: usize = 8;

const_assert!(MIN_BUDGET >= 2);
const_assert!(MIN_BUDGET < MAX_BUDGET);
const_assert!(TINY_BUDGET >= MIN_BUDGET);
const_assert!(DEFAULT_BUDGET >= MIN_BUDGET && DEFAULT_BUDGET <= MAX_BUDGET);

/// Thresholds for the expansion strategy selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// A tag splits a cluster only when its `in - not_in` score exceeds this.
    pub tag_margin: i64,
    /// Between-class share of degree variance needed to call a cluster bimodal.
    pub bimodality_threshold: f64,
    /// Core mean degree must be at least this multiple of the periphery mean.
    pub core_degree_ratio: f64,
    /// Smallest part a structural split may produce.
    pub min_part_size: usize,
    /// Smaller side of a bridge cut must hold this share of the cluster.
    pub bridge_min_fraction: f64,
    /// Upper bound on accounts promoted by `sample_individuals`.
    pub sample_size: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            tag_margin: 2,
            bimodality_threshold: 0.75,
            core_degree_ratio: 2.0,
            min_part_size: 2,
            bridge_min_fraction: 0.2,
            sample_size: 5,
        }
    }
}

/// Layout computation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub power_iterations: usize,
    pub tolerance: f64,
    /// Seed mixed into the fallback layout for degenerate inputs.
    pub fallback_seed: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            power_iterations: 200,
            tolerance: 1e-10,
            fallback_seed: 0x5eed,
        }
    }
}

/// View cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Zero disables caching.
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            ttl_secs: 300,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Clusters with fewer leaves (but more than one) are absorbed upward.
    pub min_cluster_size: usize,
    pub representatives_per_cluster: usize,
    pub max_expand_depth: usize,
    pub expansion: ExpansionConfig,
    pub layout: LayoutConfig,
    pub cache: CacheConfig,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            representatives_per_cluster: 3,
            max_expand_depth: 3,
            expansion: ExpansionConfig::default(),
            layout: LayoutConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl NavigatorConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let cfg: NavigatorConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        log::info!("loaded navigator config from {}", path.as_ref().display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), NavError> {
        if self.min_cluster_size == 0 {
            return Err(NavError::validation("min_cluster_size", "must be at least 1"));
        }
        if self.max_expand_depth == 0 {
            return Err(NavError::validation("max_expand_depth", "must be at least 1"));
        }
        let e = &self.expansion;
        if e.min_part_size == 0 {
            return Err(NavError::validation("expansion.min_part_size", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&e.bimodality_threshold) {
            return Err(NavError::validation(
                "expansion.bimodality_threshold",
                format!("{} is outside [0, 1]", e.bimodality_threshold),
            ));
        }
        if !(0.0..=0.5).contains(&e.bridge_min_fraction) {
            return Err(NavError::validation(
                "expansion.bridge_min_fraction",
                format!("{} is outside [0, 0.5]", e.bridge_min_fraction),
            ));
        }
        if e.core_degree_ratio < 1.0 {
            return Err(NavError::validation(
                "expansion.core_degree_ratio",
                "must be at least 1",
            ));
        }
        if self.layout.power_iterations == 0 {
            return Err(NavError::validation("layout.power_iterations", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        NavigatorConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: NavigatorConfig =
            serde_json::from_str(r#"{"min_cluster_size": 3, "expansion": {"sample_size": 2}}"#)
                .unwrap();
        assert_eq!(cfg.min_cluster_size, 3);
        assert_eq!(cfg.expansion.sample_size, 2);
        assert_eq!(cfg.expansion.tag_margin, 2);
        assert_eq!(cfg.cache, CacheConfig::default());
    }

    #[test]
    fn rejects_bad_threshold() {
        let mut cfg = NavigatorConfig::default();
        cfg.expansion.bimodality_threshold = 1.5;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.reason(), "validation");
    }
}
