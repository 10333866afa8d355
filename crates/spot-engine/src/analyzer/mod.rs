//! Spot instance analysis pipeline
//!
//! This module provides:
//! - Eligibility filtering against hard workload constraints
//! - Composite scoring with an explainable breakdown
//! - Recommendation text and warnings
//! - Deterministic ranking and top-N truncation
//! - An opt-in history-aware pass that blends secondary factors into the
//!   ranked list
//!
//! ```text
//! validate -> fetch spot (cached) -> fetch specs (cached) -> enrich
//!          -> filter -> score -> drop below min viable -> annotate -> rank
//!          -> [price history -> blend -> re-rank]
//! ```

pub mod enhanced;
pub mod filter;
pub mod rank;
pub mod recommendation;
pub mod scorer;


pub use enhanced::EnhancedScorer;
pub use filter::{Eligibility, EligibilityFilter};
pub use rank::{compare_analyses, rank_and_truncate};
pub use recommendation::{label_for_score, RecommendationEngine};
pub use scorer::{ScoringPolicy, Scorer};

use crate::cache::{EngineCache, TtlCache};
use crate::error::{AnalysisError, AnalysisPhase, ProviderError, ValidationError};
use crate::models::{
    AnalysisResult, InstanceAnalysis, InstanceSpecs, OperatingSystem, SpotData, UsageRequirements,
};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::providers::{InstanceSpecsProvider, PriceAnalysis, PriceHistoryProvider, SpotDataProvider};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default deadline for the price history lookup of the enhanced pass
pub const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default price history window of the enhanced pass
pub const DEFAULT_HISTORY_LOOKBACK_DAYS: u32 = 7;

/// Reject malformed requirements before any provider call
pub fn validate_requirements(req: &UsageRequirements) -> Result<(), ValidationError> {
    if req.min_vcpu <= 0 {
        return Err(ValidationError::new("min_vcpu", "must be greater than 0"));
    }
    if req.region.trim().is_empty() {
        return Err(ValidationError::new("region", "must be specified"));
    }
    if req.max_vcpu > 0 && req.max_vcpu < req.min_vcpu {
        return Err(ValidationError::new("max_vcpu", "must be >= min_vcpu"));
    }
    Ok(())
}

/// Runs the filter/score/rank pipeline for one cloud vendor
pub struct SpotAnalyzer {
    specs_provider: Arc<dyn InstanceSpecsProvider>,
    spot_provider: Arc<dyn SpotDataProvider>,
    filter: EligibilityFilter,
    scorer: Scorer,
    recommender: RecommendationEngine,
    enhanced: EnhancedScorer,
    price_history: Option<Arc<dyn PriceHistoryProvider>>,
    history_lookback_days: u32,
    history_timeout: Duration,
    cache: Option<Arc<EngineCache>>,
    metrics: Option<EngineMetrics>,
    logger: StructuredLogger,
}

impl SpotAnalyzer {
    pub fn new(
        specs_provider: Arc<dyn InstanceSpecsProvider>,
        spot_provider: Arc<dyn SpotDataProvider>,
    ) -> Self {
        let cloud = specs_provider.cloud_provider();
        Self {
            specs_provider,
            spot_provider,
            filter: EligibilityFilter::new(cloud),
            scorer: Scorer::default(),
            recommender: RecommendationEngine::new(),
            enhanced: EnhancedScorer::new(),
            price_history: None,
            history_lookback_days: DEFAULT_HISTORY_LOOKBACK_DAYS,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
            cache: None,
            metrics: None,
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
        self.scorer = Scorer::new(policy);
        self
    }

    /// Re-score the ranked list with price history from `provider`
    pub fn with_enhanced_scoring(mut self, provider: Arc<dyn PriceHistoryProvider>) -> Self {
        self.price_history = Some(provider);
        self
    }

    pub fn with_history_lookback_days(mut self, days: u32) -> Self {
        self.history_lookback_days = days;
        self
    }

    pub fn with_history_timeout(mut self, timeout: Duration) -> Self {
        self.history_timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: Arc<EngineCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn recommender(&self) -> &RecommendationEngine {
        &self.recommender
    }

    /// Analyze spot offerings against the requirements
    pub async fn analyze(&self, requirements: &UsageRequirements) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let cloud = self.specs_provider.cloud_provider();
        let outcome = self.run(requirements).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_analysis_latency(started.elapsed().as_secs_f64());
            let label = if outcome.is_ok() { "success" } else { "error" };
            metrics.inc_analyses(cloud.as_str(), label);
            if let Ok(result) = &outcome {
                metrics.add_instances_filtered(result.filtered_out as u64);
            }
        }

        match &outcome {
            Ok(result) => self.logger.log_analysis_completed(
                cloud.as_str(),
                &result.region,
                result.total_analyzed,
                result.filtered_out,
                result.top_instances.len(),
                result.top_instances.first().map(|a| a.specs.instance_type.as_str()),
                started.elapsed().as_millis(),
            ),
            Err(e) => self
                .logger
                .log_analysis_failed(cloud.as_str(), e.phase().as_str(), &e.to_string()),
        }

        outcome
    }

    async fn run(&self, req: &UsageRequirements) -> Result<AnalysisResult, AnalysisError> {
        validate_requirements(req)?;

        let spot_list = self.spot_data(&req.region, req.os).await?;
        let spot_by_type: HashMap<String, SpotData> = spot_list
            .iter()
            .map(|s| (s.instance_type.clone(), s.clone()))
            .collect();

        let catalog = self.all_specs().await?;
        let all_specs = self.enrich_specs(catalog, &spot_list).await;

        let eligible = self.filter.filter(&all_specs, &spot_by_type, req);
        let filtered_out = all_specs.len().saturating_sub(eligible.len());

        let mut analyses = Vec::with_capacity(eligible.len());
        for specs in eligible {
            let Some(spot) = spot_by_type.get(&specs.instance_type) else {
                continue;
            };
            let (score, breakdown) = self.scorer.score_instance(&specs, spot, req);
            if !self.scorer.is_viable(score) {
                debug!(instance_type = %specs.instance_type, score, "Below minimum viable score");
                continue;
            }

            let mut analysis = InstanceAnalysis {
                specs,
                spot_data: spot.clone(),
                score,
                rank: 0,
                score_breakdown: breakdown,
                recommendation: String::new(),
                warnings: Vec::new(),
                enhanced: None,
            };
            self.recommender.annotate(&mut analysis, req);
            analyses.push(analysis);
        }

        let mut top_instances = rank_and_truncate(analyses, req.effective_top_n());
        if let Some(history) = self.history_for(&top_instances).await {
            top_instances = self.enhanced.apply(top_instances, &req.region, &history);
        }

        Ok(AnalysisResult {
            requirements: req.clone(),
            top_instances,
            total_analyzed: spot_list.len(),
            filtered_out,
            analyzed_at: Utc::now(),
            region: req.region.clone(),
            cloud_provider: self.specs_provider.cloud_provider(),
        })
    }

    async fn spot_data(&self, region: &str, os: OperatingSystem) -> Result<Vec<SpotData>, AnalysisError> {
        let key = format!(
            "{}spot:{}:{}",
            self.spot_provider.cloud_provider().cache_key_prefix(),
            region,
            os
        );
        cached_fetch(
            self.cache.as_deref().map(|c| &c.spot),
            &key,
            self.spot_provider.fetch_spot_data(region, os),
        )
        .await
        .map_err(|e| {
            self.record_failure("fetch_spot_data");
            AnalysisError::provider(AnalysisPhase::FetchSpotData, e)
        })
    }

    async fn all_specs(&self) -> Result<Vec<InstanceSpecs>, AnalysisError> {
        let key = format!("{}specs", self.specs_provider.cloud_provider().cache_key_prefix());
        cached_fetch(
            self.cache.as_deref().map(|c| &c.specs),
            &key,
            self.specs_provider.get_all_instance_specs(),
        )
        .await
        .map_err(|e| {
            self.record_failure("fetch_specs");
            AnalysisError::provider(AnalysisPhase::FetchSpecs, e)
        })
    }

    /// Add catalog entries for spot-only instance types; lookups that fail are skipped
    async fn enrich_specs(&self, mut specs: Vec<InstanceSpecs>, spot_list: &[SpotData]) -> Vec<InstanceSpecs> {
        let mut known: HashSet<String> = specs.iter().map(|s| s.instance_type.clone()).collect();
        for spot in spot_list {
            if known.contains(&spot.instance_type) {
                continue;
            }
            match self.specs_provider.get_instance_specs(&spot.instance_type).await {
                Ok(derived) => {
                    known.insert(spot.instance_type.clone());
                    specs.push(derived);
                }
                Err(e) => {
                    debug!(instance_type = %spot.instance_type, error = %e, "No specs for spot-only instance")
                }
            }
        }
        specs
    }

    /// Price history for the ranked instance types, or `None` when the
    /// enhanced pass is off or no history could be obtained
    async fn history_for(&self, ranked: &[InstanceAnalysis]) -> Option<HashMap<String, PriceAnalysis>> {
        let provider = self.price_history.as_ref()?;
        if ranked.is_empty() {
            return None;
        }
        if !provider.is_available() {
            debug!("Price history unavailable, keeping base ranking");
            return None;
        }

        let types: Vec<String> = ranked.iter().map(|a| a.specs.instance_type.clone()).collect();
        let call = provider.get_batch_price_analysis(&types, self.history_lookback_days);
        let outcome = match tokio::time::timeout(self.history_timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout {
                operation: "get_batch_price_analysis",
                elapsed: self.history_timeout,
            }),
        };

        match outcome {
            Ok(history) if !history.is_empty() => Some(history),
            Ok(_) => {
                debug!(count = types.len(), "No price history for ranked instances");
                None
            }
            Err(e) => {
                self.record_failure("get_batch_price_analysis");
                self.logger
                    .log_provider_fallback("get_batch_price_analysis", "base_score", &e.to_string());
                None
            }
        }
    }

    fn record_failure(&self, operation: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_provider_failures(operation);
        }
    }
}

/// Serve fresh cache entries, otherwise fetch; a failed fetch falls back to a
/// stale entry when one exists.
async fn cached_fetch<V, F>(
    cache: Option<&TtlCache<V>>,
    key: &str,
    fetch: F,
) -> crate::error::Result<V>
where
    V: Clone,
    F: Future<Output = crate::error::Result<V>>,
{
    let cached = cache.and_then(|c| c.get(key));
    if let Some(hit) = &cached {
        if !hit.stale {
            debug!(key = %key, "Cache hit");
            return Ok(hit.value.clone());
        }
    }

    match fetch.await {
        Ok(value) => {
            if let Some(cache) = cache {
                cache.insert(key, value.clone());
            }
            Ok(value)
        }
        Err(e) => match cached {
            Some(hit) => {
                warn!(key = %key, error = %e, "Fetch failed, serving stale cache entry");
                Ok(hit.value)
            }
            None => Err(e),
        },
    }
}
