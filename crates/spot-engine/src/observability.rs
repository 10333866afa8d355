//! Observability infrastructure for the spot engine
//!
//! Provides:
//! - Prometheus metrics (analysis latency, outcomes, filter and fallback counters)
//! - Structured event logging with tracing
//!
//! Metrics live on a dedicated registry owned by the handle, so several
//! engines (or tests) can coexist in one process.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::{info, warn};

/// Histogram buckets for analysis latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Engine metrics for Prometheus exposition
///
/// Cloning is cheap; clones share the same underlying collectors.
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    analysis_latency_seconds: Histogram,
    analyses_total: IntCounterVec,
    instances_filtered_total: IntCounter,
    predicted_prices_total: IntCounter,
    zone_recommendations_total: IntCounterVec,
    provider_failures_total: IntCounterVec,
}

impl EngineMetrics {
    /// Create metrics on a fresh registry
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics and register them on `registry`
    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let analysis_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "spot_engine_analysis_latency_seconds",
                "Time spent running one instance analysis",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let analyses_total = IntCounterVec::new(
            Opts::new("spot_engine_analyses_total", "Analyses run, by cloud and outcome"),
            &["cloud", "outcome"],
        )?;
        let instances_filtered_total = IntCounter::new(
            "spot_engine_instances_filtered_total",
            "Instances removed by the eligibility filter",
        )?;
        let predicted_prices_total = IntCounter::new(
            "spot_engine_predicted_prices_total",
            "Zone prices filled in by prediction instead of history",
        )?;
        let zone_recommendations_total = IntCounterVec::new(
            Opts::new(
                "spot_engine_zone_recommendations_total",
                "Zone recommendations produced, by cloud",
            ),
            &["cloud"],
        )?;
        let provider_failures_total = IntCounterVec::new(
            Opts::new(
                "spot_engine_provider_failures_total",
                "Provider calls that failed or timed out, by operation",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(analysis_latency_seconds.clone()))?;
        registry.register(Box::new(analyses_total.clone()))?;
        registry.register(Box::new(instances_filtered_total.clone()))?;
        registry.register(Box::new(predicted_prices_total.clone()))?;
        registry.register(Box::new(zone_recommendations_total.clone()))?;
        registry.register(Box::new(provider_failures_total.clone()))?;

        Ok(Self {
            registry,
            analysis_latency_seconds,
            analyses_total,
            instances_filtered_total,
            predicted_prices_total,
            zone_recommendations_total,
            provider_failures_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record an analysis latency observation
    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.analysis_latency_seconds.observe(duration_secs);
    }

    pub fn inc_analyses(&self, cloud: &str, outcome: &str) {
        self.analyses_total.with_label_values(&[cloud, outcome]).inc();
    }

    pub fn add_instances_filtered(&self, count: u64) {
        self.instances_filtered_total.inc_by(count);
    }

    pub fn add_predicted_prices(&self, count: u64) {
        self.predicted_prices_total.inc_by(count);
    }

    pub fn inc_zone_recommendations(&self, cloud: &str) {
        self.zone_recommendations_total.with_label_values(&[cloud]).inc();
    }

    pub fn inc_provider_failures(&self, operation: &str) {
        self.provider_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Structured logger for engine events
///
/// Emits consistently tagged records for analyses, zone recommendations
/// and provider fallbacks.
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new("spot-engine")
    }
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_analysis_completed(
        &self,
        cloud: &str,
        region: &str,
        total_analyzed: usize,
        filtered_out: usize,
        returned: usize,
        top_instance: Option<&str>,
        elapsed_ms: u128,
    ) {
        info!(
            event = "analysis_completed",
            component = %self.component,
            cloud = %cloud,
            region = %region,
            total_analyzed = total_analyzed,
            filtered_out = filtered_out,
            returned = returned,
            top_instance = ?top_instance,
            elapsed_ms = elapsed_ms as u64,
            "Instance analysis completed"
        );
    }

    pub fn log_analysis_failed(&self, cloud: &str, phase: &str, error: &str) {
        warn!(
            event = "analysis_failed",
            component = %self.component,
            cloud = %cloud,
            phase = %phase,
            error = %error,
            "Instance analysis failed"
        );
    }

    pub fn log_zone_recommendation(
        &self,
        cloud: &str,
        region: &str,
        instance_type: &str,
        best_zone: Option<&str>,
        confidence: f64,
        predicted_zones: usize,
    ) {
        info!(
            event = "zone_recommendation",
            component = %self.component,
            cloud = %cloud,
            region = %region,
            instance_type = %instance_type,
            best_zone = ?best_zone,
            confidence = confidence,
            predicted_zones = predicted_zones,
            "Zone recommendation produced"
        );
    }

    /// A provider could not be used and a fallback took over
    pub fn log_provider_fallback(&self, operation: &str, fallback: &str, reason: &str) {
        warn!(
            event = "provider_fallback",
            component = %self.component,
            operation = %operation,
            fallback = %fallback,
            reason = %reason,
            "Provider unavailable, using fallback"
        );
    }

    pub fn log_forecast(&self, region: &str, instance_type: &str, trend: &str, confidence: f64) {
        info!(
            event = "price_forecast",
            component = %self.component,
            region = %region,
            instance_type = %instance_type,
            trend = %trend,
            confidence = confidence,
            "Price forecast produced"
        );
    }

    pub fn log_batch_completed(&self, requested: usize, succeeded: usize, failed: usize, elapsed_ms: u128) {
        if failed > 0 {
            warn!(
                event = "batch_completed",
                component = %self.component,
                requested = requested,
                succeeded = succeeded,
                failed = failed,
                elapsed_ms = elapsed_ms as u64,
                "Batch price analysis completed with failures"
            );
        } else {
            info!(
                event = "batch_completed",
                component = %self.component,
                requested = requested,
                succeeded = succeeded,
                elapsed_ms = elapsed_ms as u64,
                "Batch price analysis completed"
            );
        }
    }

    pub fn log_startup(&self, version: &str, clouds: &[String]) {
        info!(
            event = "engine_started",
            component = %self.component,
            version = %version,
            clouds = ?clouds,
            "Spot engine started"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = EngineMetrics::new().unwrap();
        metrics.observe_analysis_latency(0.012);
        metrics.inc_analyses("aws", "success");
        metrics.add_instances_filtered(3);
        metrics.add_predicted_prices(2);
        metrics.inc_zone_recommendations("azure");
        metrics.inc_provider_failures("get_price_analysis");

        let text = metrics.encode().unwrap();
        assert!(text.contains("spot_engine_analyses_total{cloud=\"aws\",outcome=\"success\"} 1"));
        assert!(text.contains("spot_engine_instances_filtered_total 3"));
        assert!(text.contains("spot_engine_predicted_prices_total 2"));
    }

    #[test]
    fn test_independent_registries() {
        let a = EngineMetrics::new().unwrap();
        let b = EngineMetrics::new().unwrap();
        a.add_instances_filtered(5);
        assert!(b.encode().unwrap().contains("spot_engine_instances_filtered_total 0"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        let _first = EngineMetrics::with_registry(registry.clone()).unwrap();
        assert!(EngineMetrics::with_registry(registry).is_err());
    }

    #[test]
    fn test_structured_logger() {
        let logger = StructuredLogger::new("test");
        logger.log_analysis_completed("aws", "us-east-1", 10, 4, 3, Some("m5.large"), 12);
        logger.log_analysis_failed("aws", "fetch_specs", "boom");
        logger.log_zone_recommendation("gcp", "us-central1", "n2-standard-4", None, 0.3, 3);
        logger.log_provider_fallback("get_price_analysis", "price_prediction", "timeout");
        logger.log_batch_completed(5, 4, 1, 30);
        logger.log_startup("0.1.0", &["aws".to_string()]);
    }
}
