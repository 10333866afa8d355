//! Engine configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML/JSON/YAML file, then `SPOT__<SECTION>__<KEY>` environment variables.

use crate::analyzer::ScoringPolicy;
use crate::batch::{BatchConfig, DEFAULT_CONCURRENCY};
use crate::models::{InterruptionFrequency, DEFAULT_TOP_N};
use crate::zones::WeightPreset;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SPOT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub default_top_n: usize,
    pub min_viable_score: f64,
    pub default_max_interruption: InterruptionFrequency,
    /// Re-score the ranked list with price history when a provider has it
    pub enhanced_scoring: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            default_top_n: DEFAULT_TOP_N,
            min_viable_score: ScoringPolicy::default().min_viable_score,
            default_max_interruption: InterruptionFrequency::Medium,
            enhanced_scoring: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneSettings {
    pub price_lookback_days: u32,
    pub provider_timeout_ms: u64,
    pub default_weights: WeightPreset,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            price_lookback_days: 7,
            provider_timeout_ms: 5_000,
            default_weights: WeightPreset::Balanced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis: AnalysisSettings,
    pub zones: ZoneSettings,
    pub cache: CacheSettings,
    pub batch: BatchSettings,
}

impl EngineConfig {
    /// Load defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`EngineConfig::load`] with an explicit environment map instead
    /// of the process environment
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let defaults = config::Config::try_from(&EngineConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let cfg: EngineConfig = builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.analysis.default_top_n == 0 {
            bail!("analysis.default_top_n must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.analysis.min_viable_score) {
            bail!("analysis.min_viable_score must be within [0, 1]");
        }
        if self.zones.price_lookback_days == 0 {
            bail!("zones.price_lookback_days must be greater than 0");
        }
        if self.zones.provider_timeout_ms == 0 {
            bail!("zones.provider_timeout_ms must be greater than 0");
        }
        if self.batch.concurrency == 0 {
            bail!("batch.concurrency must be greater than 0");
        }
        Ok(())
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy::default().with_min_viable_score(self.analysis.min_viable_score)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.zones.provider_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            concurrency: self.batch.concurrency,
            timeout: self.provider_timeout(),
            lookback_days: self.zones.price_lookback_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::load_with_env(None, env(&[])).unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.analysis.default_top_n, 10);
        assert_eq!(cfg.analysis.min_viable_score, 0.3);
        assert!(!cfg.analysis.enhanced_scoring);
        assert_eq!(cfg.zones.price_lookback_days, 7);
        assert_eq!(cfg.batch.concurrency, 5);
        assert_eq!(cfg.provider_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[analysis]\nmin_viable_score = 0.5\ndefault_max_interruption = \"low\"\n\n[zones]\ndefault_weights = \"cost-optimized\"\n"
        )
        .unwrap();

        let cfg = EngineConfig::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(cfg.analysis.min_viable_score, 0.5);
        assert_eq!(cfg.analysis.default_max_interruption, InterruptionFrequency::Low);
        assert_eq!(cfg.zones.default_weights, WeightPreset::CostOptimized);
        assert_eq!(cfg.analysis.default_top_n, 10);
        assert_eq!(cfg.scoring_policy().min_viable_score, 0.5);
    }

    #[test]
    fn test_env_overrides_file() {
        let cfg = EngineConfig::load_with_env(
            None,
            env(&[
                ("SPOT__BATCH__CONCURRENCY", "8"),
                ("SPOT__ZONES__PROVIDER_TIMEOUT_MS", "250"),
                ("SPOT__ANALYSIS__ENHANCED_SCORING", "true"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.batch.concurrency, 8);
        assert!(cfg.analysis.enhanced_scoring);
        assert_eq!(cfg.batch_config().timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = EngineConfig::load_with_env(Some(Path::new("/nonexistent/spot.toml")), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut cfg = EngineConfig::default();
        cfg.batch.concurrency = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.analysis.min_viable_score = 1.5;
        assert!(cfg.validate().is_err());
    }
}
