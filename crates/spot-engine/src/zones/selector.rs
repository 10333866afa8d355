//! Zone selector: gathers zone data, scores each zone and explains the result

use super::pricing::{default_zones, fill_predictions, observed_prices, ZonePriceData};
use super::weights::ScoreWeights;
use super::{
    SmartAZRank, SmartAZResult, SOURCE_CAPACITY, SOURCE_PRICE_HISTORY, SOURCE_PRICE_PREDICTION,
    SOURCE_ZONE_AVAILABILITY,
};
use crate::error::{ProviderError, Result};
use crate::models::CloudProvider;
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::providers::{
    CapacityProvider, PriceHistoryProvider, ProviderSet, ZoneAvailabilityProvider, ZoneInfo,
};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default deadline for a single provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Default price history window
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

const BASE_CONFIDENCE: f64 = 0.3;
const ZONE_SOURCE_CONFIDENCE: f64 = 0.25;
const PRICE_SOURCE_CONFIDENCE: f64 = 0.25;
const CAPACITY_SOURCE_CONFIDENCE: f64 = 0.20;
const MAX_PREDICTION_PENALTY: f64 = 0.20;

/// Score difference below which the runner-up is called out
const CLOSE_ALTERNATIVE_GAP: f64 = 5.0;

const LOW_INTERRUPTION: f64 = 8.0;
const HIGH_INTERRUPTION: f64 = 15.0;

/// Confidence from the sources that delivered data and the share of
/// predicted prices
pub fn compute_confidence(
    zones_working: bool,
    prices_working: bool,
    capacity_working: bool,
    predicted: usize,
    total: usize,
) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if zones_working {
        confidence += ZONE_SOURCE_CONFIDENCE;
    }
    if prices_working {
        confidence += PRICE_SOURCE_CONFIDENCE;
    }
    if capacity_working {
        confidence += CAPACITY_SOURCE_CONFIDENCE;
    }
    if total > 0 && predicted > 0 {
        confidence -= predicted as f64 / total as f64 * MAX_PREDICTION_PENALTY;
    }
    confidence.clamp(0.1, 1.0)
}

pub fn availability_score(zone: &ZoneInfo) -> f64 {
    match (zone.available, zone.restricted) {
        (true, false) => 100.0,
        (true, true) => 50.0,
        (false, _) => 0.0,
    }
}

/// Price score on 0-100; a missing or zero price scores 50
pub fn price_score(price: Option<&ZonePriceData>) -> f64 {
    match price {
        Some(p) if p.spot_price > 0.0 => (100.0 - p.spot_price * 100.0).clamp(0.0, 100.0),
        _ => 50.0,
    }
}

pub fn stability_score(price: Option<&ZonePriceData>) -> f64 {
    match price {
        Some(p) => (100.0 - p.volatility * 200.0).clamp(0.0, 100.0),
        None => 50.0,
    }
}

/// Estimated interruption rate in percent, within [2, 25]
pub fn interruption_rate(capacity: f64, volatility: f64) -> f64 {
    let mut rate = 5.0 + (100.0 - capacity) * 0.15;
    if volatility > 0.0 {
        rate += volatility * 20.0;
    }
    rate.clamp(2.0, 25.0)
}

pub fn interruption_score(rate: f64) -> f64 {
    (100.0 - rate * 5.0).clamp(0.0, 100.0)
}

/// Recommends availability zones for one cloud region
pub struct ZoneSelector {
    cloud: CloudProvider,
    region: String,
    zone_provider: Option<Arc<dyn ZoneAvailabilityProvider>>,
    price_provider: Option<Arc<dyn PriceHistoryProvider>>,
    capacity_provider: Option<Arc<dyn CapacityProvider>>,
    timeout: Duration,
    lookback_days: u32,
    metrics: Option<EngineMetrics>,
    logger: StructuredLogger,
}

impl ZoneSelector {
    pub fn new(cloud: CloudProvider, region: impl Into<String>) -> Self {
        Self {
            cloud,
            region: region.into(),
            zone_provider: None,
            price_provider: None,
            capacity_provider: None,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            metrics: None,
            logger: StructuredLogger::default(),
        }
    }

    /// Use the optional providers of a provider set
    pub fn from_provider_set(cloud: CloudProvider, region: impl Into<String>, set: &ProviderSet) -> Self {
        let mut selector = Self::new(cloud, region);
        selector.zone_provider = set.zones.clone();
        selector.price_provider = set.price_history.clone();
        selector.capacity_provider = set.capacity.clone();
        selector
    }

    pub fn with_zone_provider(mut self, provider: Arc<dyn ZoneAvailabilityProvider>) -> Self {
        self.zone_provider = Some(provider);
        self
    }

    pub fn with_price_provider(mut self, provider: Arc<dyn PriceHistoryProvider>) -> Self {
        self.price_provider = Some(provider);
        self
    }

    pub fn with_capacity_provider(mut self, provider: Arc<dyn CapacityProvider>) -> Self {
        self.capacity_provider = Some(provider);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
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

    /// Rank the zones of the region for `instance_type`
    pub async fn recommend_az(&self, instance_type: &str, weights: &ScoreWeights) -> SmartAZResult {
        let (zones, zones_working) = self.zones_for(instance_type).await;
        let (mut prices, prices_working) = self.prices_for(instance_type, &zones).await;
        let predicted = fill_predictions(&mut prices, &zones, instance_type, self.cloud);

        let mut capacity_working = false;
        let mut rankings = Vec::with_capacity(zones.len());
        for zone in &zones {
            let capacity = match self.capacity_for(instance_type, &zone.zone).await {
                Some(score) => {
                    capacity_working = true;
                    f64::from(score.min(100))
                }
                None => f64::from(zone.capacity_score.min(100)),
            };
            rankings.push(score_zone(zone, capacity, prices.get(&zone.zone), weights));
        }

        rankings.sort_by(|a, b| {
            b.combined_score
                .total_cmp(&a.combined_score)
                .then_with(|| a.zone.cmp(&b.zone))
        });
        for (idx, rank) in rankings.iter_mut().enumerate() {
            rank.rank = idx + 1;
        }

        let predicted_in_result = rankings.iter().filter(|r| r.price_predicted).count();
        let confidence = compute_confidence(
            zones_working,
            prices_working,
            capacity_working,
            predicted_in_result,
            rankings.len(),
        );

        let mut data_sources = Vec::new();
        if zones_working {
            data_sources.push(SOURCE_ZONE_AVAILABILITY.to_string());
        }
        if prices_working {
            data_sources.push(SOURCE_PRICE_HISTORY.to_string());
        }
        if capacity_working {
            data_sources.push(SOURCE_CAPACITY.to_string());
        }
        if predicted_in_result > 0 {
            data_sources.push(SOURCE_PRICE_PREDICTION.to_string());
        }

        let mut result = SmartAZResult {
            instance_type: instance_type.to_string(),
            region: self.region.clone(),
            best_az: rankings.first().map(|r| r.zone.clone()),
            next_best_az: rankings.get(1).map(|r| r.zone.clone()),
            rankings,
            insights: Vec::new(),
            data_sources,
            confidence,
            generated_at: Utc::now(),
        };
        result.insights = insights(&result);

        if let Some(metrics) = &self.metrics {
            metrics.inc_zone_recommendations(self.cloud.as_str());
            metrics.add_predicted_prices(predicted as u64);
        }
        self.logger.log_zone_recommendation(
            self.cloud.as_str(),
            &self.region,
            instance_type,
            result.best_az.as_deref(),
            result.confidence,
            predicted_in_result,
        );

        result
    }

    async fn zones_for(&self, instance_type: &str) -> (Vec<ZoneInfo>, bool) {
        if let Some(provider) = self.zone_provider.as_ref().filter(|p| p.is_available()) {
            let call = provider.get_zone_availability(instance_type, &self.region);
            match self.timed("get_zone_availability", call).await {
                Ok(zones) if !zones.is_empty() => return (zones, true),
                Ok(_) => debug!(instance_type = %instance_type, "Zone provider returned no zones"),
                Err(e) => self.provider_failed("get_zone_availability", "default_zones", &e),
            }
        }
        debug!(instance_type = %instance_type, region = %self.region, "Using default zone topology");
        (default_zones(self.cloud, &self.region), false)
    }

    async fn prices_for(&self, instance_type: &str, zones: &[ZoneInfo]) -> (HashMap<String, ZonePriceData>, bool) {
        if let Some(provider) = self.price_provider.as_ref().filter(|p| p.is_available()) {
            let call = provider.get_price_analysis(instance_type, self.lookback_days);
            match self.timed("get_price_analysis", call).await {
                Ok(analysis) => return (observed_prices(&analysis, zones), true),
                Err(e) => self.provider_failed("get_price_analysis", SOURCE_PRICE_PREDICTION, &e),
            }
        } else {
            debug!(instance_type = %instance_type, "No price provider available, predicting prices");
        }
        (HashMap::new(), false)
    }

    async fn capacity_for(&self, instance_type: &str, zone: &str) -> Option<u8> {
        let provider = self.capacity_provider.as_ref()?;
        match self
            .timed("get_capacity_score", provider.get_capacity_score(instance_type, zone))
            .await
        {
            Ok(score) => Some(score),
            Err(e) => {
                debug!(instance_type = %instance_type, zone = %zone, error = %e, "Capacity lookup failed");
                if matches!(e, ProviderError::Timeout { .. }) {
                    self.record_failure("get_capacity_score");
                }
                None
            }
        }
    }

    /// Run a provider call under the configured deadline
    async fn timed<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                operation,
                elapsed: self.timeout,
            }),
        }
    }

    fn provider_failed(&self, operation: &str, fallback: &str, error: &ProviderError) {
        warn!(operation = %operation, error = %error, "Zone data provider failed");
        self.record_failure(operation);
        self.logger
            .log_provider_fallback(operation, fallback, &error.to_string());
    }

    fn record_failure(&self, operation: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_provider_failures(operation);
        }
    }
}

/// Score one zone; `rank` is assigned after sorting
pub fn score_zone(
    zone: &ZoneInfo,
    capacity: f64,
    price: Option<&ZonePriceData>,
    weights: &ScoreWeights,
) -> SmartAZRank {
    let volatility = price.map(|p| p.volatility).unwrap_or(0.0);
    let rate = interruption_rate(capacity, volatility);

    let mut rank = SmartAZRank {
        zone: zone.zone.clone(),
        rank: 0,
        combined_score: 0.0,
        availability_score: availability_score(zone),
        capacity_score: capacity,
        price_score: price_score(price),
        stability_score: stability_score(price),
        interruption_score: interruption_score(rate),
        spot_price: price.map(|p| p.spot_price).unwrap_or(0.0),
        on_demand_price: price.map(|p| p.on_demand_price).unwrap_or(0.0),
        price_predicted: price.is_some_and(|p| p.predicted),
        volatility,
        interruption_rate: rate,
        available: zone.available,
        restricted: zone.restricted,
        explanation: String::new(),
    };

    rank.combined_score = rank.availability_score * weights.availability
        + rank.capacity_score * weights.capacity
        + rank.price_score * weights.price
        + rank.stability_score * weights.stability
        + rank.interruption_score * weights.interruption;
    rank.explanation = explain_zone(&rank, zone.restriction_message.as_deref());
    rank
}

fn explain_zone(rank: &SmartAZRank, restriction: Option<&str>) -> String {
    if !rank.available {
        return "VM not available in this zone".to_string();
    }

    let mut parts = Vec::new();
    if rank.restricted {
        match restriction {
            Some(msg) if !msg.is_empty() => parts.push(format!("Restricted access ({})", msg)),
            _ => parts.push("Restricted access".to_string()),
        }
    }

    parts.push(
        if rank.capacity_score >= 80.0 {
            "High capacity"
        } else if rank.capacity_score >= 50.0 {
            "Moderate capacity"
        } else {
            "Limited capacity"
        }
        .to_string(),
    );

    if rank.price_predicted {
        parts.push(format!("Predicted price: ${:.4}", rank.spot_price));
    } else if rank.spot_price > 0.0 {
        parts.push(format!("Spot: ${:.4}", rank.spot_price));
    }

    parts.push(
        if rank.interruption_rate < LOW_INTERRUPTION {
            "Low interruption risk"
        } else if rank.interruption_rate < HIGH_INTERRUPTION {
            "Moderate interruption risk"
        } else {
            "High interruption risk"
        }
        .to_string(),
    );

    parts.join(" | ")
}

fn insights(result: &SmartAZResult) -> Vec<String> {
    let Some(best) = result.rankings.first() else {
        return vec!["No zones available for this VM type".to_string()];
    };

    let mut insights = vec![format!(
        "Best zone: {} (score: {:.1}/100)",
        best.zone, best.combined_score
    )];

    if best.capacity_score >= 80.0 {
        insights.push("High capacity available in recommended zone".to_string());
    } else if best.capacity_score < 50.0 {
        insights.push("Limited capacity - consider alternative VM sizes".to_string());
    }

    if best.price_predicted {
        insights.push(format!(
            "Spot price predicted at ${:.4}/hour (no historical data available)",
            best.spot_price
        ));
    } else if best.spot_price > 0.0 && best.on_demand_price > 0.0 {
        let savings = (best.on_demand_price - best.spot_price) / best.on_demand_price * 100.0;
        insights.push(format!("Estimated savings: {:.0}% vs on-demand", savings));
    }

    if best.interruption_rate < LOW_INTERRUPTION {
        insights.push(format!(
            "Low interruption risk (~{:.0}%)",
            best.interruption_rate
        ));
    } else if best.interruption_rate >= HIGH_INTERRUPTION {
        insights.push(format!(
            "High interruption risk (~{:.0}%) - use Spot Blocks if available",
            best.interruption_rate
        ));
    }

    if let Some(second) = result.rankings.get(1) {
        if best.combined_score - second.combined_score < CLOSE_ALTERNATIVE_GAP {
            insights.push(format!(
                "{} is a close alternative (score: {:.1})",
                second.zone, second.combined_score
            ));
        }
    }

    if result.confidence < 0.5 {
        insights.push("Low confidence - limited data available for this VM type".to_string());
    } else if result.confidence >= 0.8 {
        insights.push("High confidence recommendation based on multiple data sources".to_string());
    }

    insights
}
