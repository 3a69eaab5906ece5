//! Configuration loading from TOML and environment variables.
//!
//! The simulator reads its configuration from:
//! 1. A TOML config file (optional)
//! 2. Environment variables (override TOML values)
//!
//! Environment variable prefix: TAGTRUST_

use std::path::Path;

use serde::{Deserialize, Serialize};
use tagtrust_gossip::RandomExchangePolicy;
use tagtrust_reputation::{AggregatorConfig, ThresholdMetric};

use crate::peer::PeerSettings;
use crate::NodeError;

/// Top-level simulator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Gossip schedule and batch size.
    #[serde(default)]
    pub gossip: GossipConfig,
    /// Vote ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Reputation aggregation configuration.
    #[serde(default)]
    pub reputation: ReputationConfig,
    /// Clock, seed and run length.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gossip configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipConfig {
    /// Seconds between two rounds of the same peer.
    #[serde(default = "default_exchange_interval")]
    pub exchange_interval_secs: u64,
    /// Maximum number of votes pulled per round.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Vote ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// How many DAG tips a new vote links to.
    #[serde(default = "default_tips_per_vote")]
    pub tips_per_vote: usize,
}

/// Reputation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Minimum trust magnitude for a voter to count towards tag reputation.
    #[serde(default = "default_trust_threshold")]
    pub trust_threshold: f64,
    /// Which trust value is compared with the threshold.
    #[serde(default)]
    pub threshold_metric: ThresholdMetric,
}

/// Simulation run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the simulation PRNG.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Simulated run length in seconds.
    #[serde(default = "default_duration")]
    pub duration_secs: u64,
    /// Recompute every peer's reputations when the clock stops.
    #[serde(default = "default_true")]
    pub recompute_at_end: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tagtrust_node=debug").
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output JSON-formatted logs.
    #[serde(default)]
    pub json_format: bool,
}

// -- Defaults --

fn default_exchange_interval() -> u64 {
    tagtrust_protocol::DEFAULT_EXCHANGE_INTERVAL_SECS
}
fn default_batch_size() -> usize {
    tagtrust_protocol::DEFAULT_EXCHANGE_BATCH_SIZE
}
fn default_tips_per_vote() -> usize {
    tagtrust_protocol::DEFAULT_TIPS_PER_VOTE
}
fn default_trust_threshold() -> f64 {
    tagtrust_protocol::DEFAULT_TRUST_THRESHOLD
}
fn default_seed() -> u64 {
    tagtrust_protocol::DEFAULT_SIMULATION_SEED
}
fn default_duration() -> u64 {
    tagtrust_protocol::DEFAULT_SIMULATION_DURATION_SECS
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

// -- Trait impls --

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            exchange_interval_secs: default_exchange_interval(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tips_per_vote: default_tips_per_vote(),
        }
    }
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            trust_threshold: default_trust_threshold(),
            threshold_metric: ThresholdMetric::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            duration_secs: default_duration(),
            recompute_at_end: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, with environment variable overrides.
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    pub fn load(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let mut config = if let Some(path) = path {
            if path.exists() {
                Self::from_file(path)?
            } else {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not found, using defaults"
                );
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply `TAGTRUST_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TAGTRUST_EXCHANGE_INTERVAL") {
            if let Ok(secs) = val.parse() {
                self.gossip.exchange_interval_secs = secs;
            }
        }
        if let Some(val) = lookup("TAGTRUST_BATCH_SIZE") {
            if let Ok(n) = val.parse() {
                self.gossip.batch_size = n;
            }
        }
        if let Some(val) = lookup("TAGTRUST_TIPS_PER_VOTE") {
            if let Ok(k) = val.parse() {
                self.ledger.tips_per_vote = k;
            }
        }
        if let Some(val) = lookup("TAGTRUST_TRUST_THRESHOLD") {
            if let Ok(t) = val.parse() {
                self.reputation.trust_threshold = t;
            }
        }
        if let Some(val) = lookup("TAGTRUST_THRESHOLD_METRIC") {
            match val.as_str() {
                "flow" => self.reputation.threshold_metric = ThresholdMetric::Flow,
                "similarity" => self.reputation.threshold_metric = ThresholdMetric::Similarity,
                _ => {}
            }
        }
        if let Some(val) = lookup("TAGTRUST_SEED") {
            if let Ok(seed) = val.parse() {
                self.simulation.seed = seed;
            }
        }
        if let Some(val) = lookup("TAGTRUST_DURATION") {
            if let Ok(d) = val.parse() {
                self.simulation.duration_secs = d;
            }
        }
        if let Some(val) = lookup("TAGTRUST_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("TAGTRUST_LOG_JSON") {
            self.logging.json_format = val == "true" || val == "1";
        }
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.gossip.exchange_interval_secs == 0 {
            return Err(NodeError::Config(
                "gossip.exchange_interval_secs must be positive".into(),
            ));
        }
        let threshold = self.reputation.trust_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(NodeError::Config(format!(
                "reputation.trust_threshold must be a non-negative number, got {}",
                threshold
            )));
        }
        Ok(())
    }

    /// Per-peer settings derived from this configuration.
    pub fn peer_settings(&self) -> PeerSettings {
        PeerSettings {
            aggregator: AggregatorConfig {
                trust_threshold: self.reputation.trust_threshold,
                threshold_metric: self.reputation.threshold_metric,
            },
            exchange: RandomExchangePolicy::new(self.gossip.batch_size),
            tips_per_vote: self.ledger.tips_per_vote,
        }
    }

    pub fn exchange_interval_millis(&self) -> u64 {
        self.gossip.exchange_interval_secs.saturating_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SimConfig::default();
        assert_eq!(config.gossip.exchange_interval_secs, 5);
        assert_eq!(config.gossip.batch_size, 20);
        assert_eq!(config.ledger.tips_per_vote, 2);
        assert!((config.reputation.trust_threshold - 0.2).abs() < 1e-12);
        assert_eq!(config.reputation.threshold_metric, ThresholdMetric::Flow);
        assert_eq!(config.simulation.seed, 42);
        assert!(config.simulation.recompute_at_end);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            [gossip]
            batch_size = 5

            [reputation]
            threshold_metric = "similarity"
            "#,
        )
        .unwrap();
        assert_eq!(config.gossip.batch_size, 5);
        assert_eq!(config.gossip.exchange_interval_secs, 5);
        assert_eq!(config.reputation.threshold_metric, ThresholdMetric::Similarity);
        assert_eq!(config.simulation.duration_secs, 300);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TAGTRUST_SEED", "7"),
            ("TAGTRUST_BATCH_SIZE", "not-a-number"),
            ("TAGTRUST_THRESHOLD_METRIC", "similarity"),
            ("TAGTRUST_LOG_JSON", "1"),
        ]
        .into_iter()
        .collect();
        let mut config = SimConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.gossip.batch_size, 20);
        assert_eq!(config.reputation.threshold_metric, ThresholdMetric::Similarity);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = SimConfig::default();
        config.gossip.exchange_interval_secs = 0;
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = SimConfig::load(Some(Path::new("/nonexistent/tagtrust.toml"))).unwrap();
        assert_eq!(config.gossip.batch_size, SimConfig::default().gossip.batch_size);
    }
}
