//! Service boundary
//!
//! [`SpotAdvisor`] owns the provider registry, the shared cache, metrics and
//! configuration, and turns every outcome into a serializable response.
//! Nothing here panics or returns a raw error to the caller.

use crate::analyzer::SpotAnalyzer;
use crate::batch::{BatchPriceAnalyzer, BatchResult};
use crate::cache::EngineCache;
use crate::config::EngineConfig;
use crate::models::{AnalysisResult, CloudProvider, UsageRequirements};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::providers::ProviderRegistry;
use crate::zones::{PriceForecast, PriceForecaster, ScoreWeights, SmartAZResult, ZoneSelector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Uniform response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            success: true,
            error: None,
            result: Some(result),
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            result: None,
        }
    }
}

pub type AnalyzeResponse = ServiceResponse<AnalysisResult>;
pub type AzResponse = ServiceResponse<SmartAZResult>;
pub type BatchResponse = ServiceResponse<BatchResult>;
pub type ForecastResponse = ServiceResponse<PriceForecast>;

pub struct SpotAdvisor {
    registry: ProviderRegistry,
    cache: Arc<EngineCache>,
    metrics: Option<EngineMetrics>,
    config: EngineConfig,
    logger: StructuredLogger,
}

impl SpotAdvisor {
    pub fn new(registry: ProviderRegistry, config: EngineConfig) -> Self {
        Self {
            cache: Arc::new(EngineCache::new(config.cache_ttl())),
            registry,
            metrics: None,
            config,
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<EngineCache> {
        &self.cache
    }

    pub fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Rank spot offerings of `cloud` against the requirements
    pub async fn analyze(&self, cloud: CloudProvider, requirements: &UsageRequirements) -> AnalyzeResponse {
        let set = match self.registry.get(cloud) {
            Ok(set) => set,
            Err(e) => return ServiceResponse::err(e.to_string()),
        };

        let mut requirements = requirements.clone();
        if requirements.top_n <= 0 {
            requirements.top_n = self.config.analysis.default_top_n as i32;
        }

        let mut analyzer = SpotAnalyzer::new(set.specs.clone(), set.spot.clone())
            .with_policy(self.config.scoring_policy())
            .with_cache(self.cache.clone())
            .with_logger(self.logger.clone());
        if let Some(metrics) = &self.metrics {
            analyzer = analyzer.with_metrics(metrics.clone());
        }
        if self.config.analysis.enhanced_scoring {
            match &set.price_history {
                Some(provider) => {
                    analyzer = analyzer
                        .with_enhanced_scoring(provider.clone())
                        .with_history_lookback_days(self.config.zones.price_lookback_days)
                        .with_history_timeout(self.config.provider_timeout());
                }
                None => warn!(cloud = %cloud, "Enhanced scoring requested without a price history provider"),
            }
        }

        match analyzer.analyze(&requirements).await {
            Ok(result) => ServiceResponse::ok(result),
            Err(e) => ServiceResponse::err(e.to_string()),
        }
    }

    /// Rank the zones of `region` for one instance type. An empty region
    /// resolves to the vendor default; `None` weights use the configured preset.
    pub async fn recommend_az(
        &self,
        cloud: CloudProvider,
        region: &str,
        instance_type: &str,
        weights: Option<ScoreWeights>,
    ) -> AzResponse {
        let instance_type = instance_type.trim();
        if instance_type.is_empty() {
            return ServiceResponse::err("instance_type is required");
        }
        let set = match self.registry.get(cloud) {
            Ok(set) => set,
            Err(e) => return ServiceResponse::err(e.to_string()),
        };

        let region = match region.trim() {
            "" => cloud.default_region(),
            r => r,
        };
        let weights = weights.unwrap_or_else(|| self.config.zones.default_weights.weights());

        let mut selector = ZoneSelector::from_provider_set(cloud, region, set)
            .with_timeout(self.config.provider_timeout())
            .with_lookback_days(self.config.zones.price_lookback_days)
            .with_logger(self.logger.clone());
        if let Some(metrics) = &self.metrics {
            selector = selector.with_metrics(metrics.clone());
        }

        ServiceResponse::ok(selector.recommend_az(instance_type, &weights).await)
    }

    /// 1h/6h/24h price outlook for one instance type. An empty region
    /// resolves to the vendor default.
    pub async fn forecast_price(&self, cloud: CloudProvider, region: &str, instance_type: &str) -> ForecastResponse {
        let instance_type = instance_type.trim();
        if instance_type.is_empty() {
            return ServiceResponse::err("instance_type is required");
        }
        let set = match self.registry.get(cloud) {
            Ok(set) => set,
            Err(e) => return ServiceResponse::err(e.to_string()),
        };
        let region = match region.trim() {
            "" => cloud.default_region(),
            r => r,
        };

        let mut forecaster = PriceForecaster::from_provider_set(region, set)
            .with_timeout(self.config.provider_timeout())
            .with_lookback_days(self.config.zones.price_lookback_days)
            .with_logger(self.logger.clone());
        if let Some(metrics) = &self.metrics {
            forecaster = forecaster.with_metrics(metrics.clone());
        }
        ServiceResponse::ok(forecaster.forecast(instance_type).await)
    }

    /// Concurrent price analysis for many instance types
    pub async fn batch_prices(&self, cloud: CloudProvider, instance_types: &[String]) -> BatchResponse {
        let set = match self.registry.get(cloud) {
            Ok(set) => set,
            Err(e) => return ServiceResponse::err(e.to_string()),
        };
        let Some(provider) = set.price_history.clone() else {
            warn!(cloud = %cloud, "Batch price analysis requested without a price history provider");
            return ServiceResponse::err(format!("no price history provider configured for {}", cloud));
        };

        let mut batch = BatchPriceAnalyzer::new(provider, self.config.batch_config())
            .with_logger(self.logger.clone());
        if let Some(metrics) = &self.metrics {
            batch = batch.with_metrics(metrics.clone());
        }
        ServiceResponse::ok(batch.run(instance_types).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::{spec, spot};
    use crate::providers::{CatalogSnapshot, PriceAnalysis, ProviderSet, StaticCatalog};
    use crate::zones::{ForecastMethod, TrendDirection};
    use std::collections::{BTreeMap, HashMap};

    fn catalog() -> Arc<StaticCatalog> {
        let snapshot = CatalogSnapshot {
            cloud_provider: CloudProvider::Aws,
            specs: vec![spec("m5.large", 2), spec("m5.xlarge", 4), spec("c5.large", 2)],
            spot_data: vec![spot("m5.large", 70), spot("m5.xlarge", 65), spot("c5.large", 60)],
            ..Default::default()
        };
        Arc::new(StaticCatalog::new(snapshot))
    }

    fn advisor() -> SpotAdvisor {
        let registry = ProviderRegistry::new().with(CloudProvider::Aws, ProviderSet::from_catalog(catalog()));
        SpotAdvisor::new(registry, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let advisor = advisor();
        let response = advisor
            .analyze(CloudProvider::Aws, &UsageRequirements::default())
            .await;

        assert!(response.success);
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result.total_analyzed, 3);
        assert!(!result.top_instances.is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_top_n_uses_configured_default() {
        let mut config = EngineConfig::default();
        config.analysis.default_top_n = 1;
        let registry = ProviderRegistry::new().with(CloudProvider::Aws, ProviderSet::from_catalog(catalog()));
        let advisor = SpotAdvisor::new(registry, config);

        let req = UsageRequirements {
            top_n: 0,
            ..Default::default()
        };
        let result = advisor.analyze(CloudProvider::Aws, &req).await.result.unwrap();
        assert_eq!(result.top_instances.len(), 1);
        assert_eq!(result.requirements.top_n, 1);
    }

    #[tokio::test]
    async fn test_errors_become_responses() {
        let advisor = advisor();

        let unsupported = advisor
            .analyze(CloudProvider::Gcp, &UsageRequirements::default())
            .await;
        assert!(!unsupported.success);
        assert!(unsupported.error.unwrap().contains("unsupported cloud provider"));

        let invalid = advisor
            .analyze(
                CloudProvider::Aws,
                &UsageRequirements {
                    min_vcpu: 0,
                    ..Default::default()
                },
            )
            .await;
        assert!(!invalid.success);
        assert!(invalid.error.unwrap().contains("min_vcpu"));
        assert!(invalid.result.is_none());
    }

    #[tokio::test]
    async fn test_recommend_az_defaults() {
        let advisor = advisor();

        let empty = advisor.recommend_az(CloudProvider::Aws, "us-east-1", "  ", None).await;
        assert!(!empty.success);

        let response = advisor.recommend_az(CloudProvider::Aws, "", "m5.large", None).await;
        assert!(response.success);
        let result = response.result.unwrap();
        assert_eq!(result.region, "us-east-1");
        // empty catalog zones fall back to the regional defaults
        assert_eq!(result.rankings.len(), 3);
        assert!(result.best_az.is_some());
    }

    #[tokio::test]
    async fn test_batch_prices_requires_price_history() {
        let registry = ProviderRegistry::new().with(
            CloudProvider::Aws,
            ProviderSet::new(catalog(), catalog()),
        );
        let advisor = SpotAdvisor::new(registry, EngineConfig::default());

        let response = advisor
            .batch_prices(CloudProvider::Aws, &["m5.large".to_string()])
            .await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("price history"));
    }

    fn history_catalog() -> Arc<StaticCatalog> {
        let history = |instance_type: &str, volatility: f64, trend_slope: f64| PriceAnalysis {
            instance_type: instance_type.to_string(),
            current_price: 0.05,
            avg_price: 0.05,
            min_price: 0.04,
            max_price: 0.06,
            std_dev: 0.05 * volatility,
            volatility,
            trend_slope,
            data_points: 200,
            last_updated: None,
            time_span_hours: 168.0,
            hourly_pattern: BTreeMap::new(),
            per_zone: HashMap::new(),
        };
        let snapshot = CatalogSnapshot {
            cloud_provider: CloudProvider::Aws,
            specs: vec![spec("m5.large", 2), spec("c5.large", 2)],
            spot_data: vec![spot("m5.large", 62), spot("c5.large", 60)],
            price_history: HashMap::from([
                ("m5.large".to_string(), history("m5.large", 0.5, 0.0005)),
                ("c5.large".to_string(), history("c5.large", 0.02, -0.0005)),
            ]),
            ..Default::default()
        };
        Arc::new(StaticCatalog::new(snapshot))
    }

    #[tokio::test]
    async fn test_enhanced_scoring_follows_config() {
        let registry = || {
            ProviderRegistry::new().with(CloudProvider::Aws, ProviderSet::from_catalog(history_catalog()))
        };
        let top = |advisor: SpotAdvisor| async move {
            let result = advisor
                .analyze(CloudProvider::Aws, &UsageRequirements::default())
                .await
                .result
                .unwrap();
            result.top_instances[0].clone()
        };

        let base = top(SpotAdvisor::new(registry(), EngineConfig::default())).await;
        assert_eq!(base.specs.instance_type, "m5.large");
        assert!(base.enhanced.is_none());

        let mut config = EngineConfig::default();
        config.analysis.enhanced_scoring = true;
        let enhanced = top(SpotAdvisor::new(registry(), config)).await;
        assert_eq!(enhanced.specs.instance_type, "c5.large");
        assert!(enhanced.enhanced.unwrap().from_history);
    }

    #[tokio::test]
    async fn test_forecast_price() {
        let advisor = advisor();
        assert!(!advisor.forecast_price(CloudProvider::Aws, "", " ").await.success);

        let placeholder = advisor
            .forecast_price(CloudProvider::Aws, "", "m5.large")
            .await
            .result
            .unwrap();
        assert_eq!(placeholder.region, "us-east-1");
        assert_eq!(placeholder.method, ForecastMethod::Heuristic);

        let registry = ProviderRegistry::new().with(CloudProvider::Aws, ProviderSet::from_catalog(history_catalog()));
        let advisor = SpotAdvisor::new(registry, EngineConfig::default());
        let forecast = advisor
            .forecast_price(CloudProvider::Aws, "us-east-1", "c5.large")
            .await
            .result
            .unwrap();
        assert_eq!(forecast.method, ForecastMethod::LinearTrend);
        assert_eq!(forecast.trend_direction, TrendDirection::Falling);

        assert!(!advisor.forecast_price(CloudProvider::Gcp, "", "m5.large").await.success);
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let response: ServiceResponse<u32> = ServiceResponse::err("boom");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "boom");
        assert!(json.get("result").is_none());

        let response = tokio_test::block_on(advisor().analyze(CloudProvider::Azure, &UsageRequirements::default()));
        assert!(!response.success);
    }
}
