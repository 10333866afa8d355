//! Short-horizon spot price forecast
//!
//! Extrapolates the linear price trend of the lookback window 1, 6 and 24
//! samples ahead (samples are roughly hourly), classifies trend and
//! volatility, and picks the cheapest two-hour launch window from the
//! hourly pattern. Without history a low-confidence placeholder is returned.

use crate::error::{ProviderError, Result};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::providers::{PriceAnalysis, PriceHistoryProvider, ProviderSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::selector::{DEFAULT_LOOKBACK_DAYS, DEFAULT_PROVIDER_TIMEOUT};

/// Confidence reported when no history was available
pub const HEURISTIC_CONFIDENCE: f64 = 0.3;

/// Forecast horizons in hours
pub const HORIZONS: [u32; 3] = [1, 6, 24];

/// |trend score| above which prices count as moving
const TREND_THRESHOLD: f64 = 0.1;

/// Fewest distinct hours needed to name a launch window
const MIN_PATTERN_HOURS: usize = 12;
const LAUNCH_WINDOW_HOURS: u8 = 2;

/// A full week of samples
const FULL_SPAN_HOURS: f64 = 168.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
    Unknown,
}

impl TrendDirection {
    pub fn from_trend_score(score: f64) -> Self {
        if score > TREND_THRESHOLD {
            TrendDirection::Rising
        } else if score < -TREND_THRESHOLD {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Stable => "stable",
            TrendDirection::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRisk {
    Low,
    Medium,
    High,
    Unknown,
}

impl VolatilityRisk {
    pub fn from_volatility(volatility: f64) -> Self {
        if volatility < 0.1 {
            VolatilityRisk::Low
        } else if volatility < 0.25 {
            VolatilityRisk::Medium
        } else {
            VolatilityRisk::High
        }
    }
}

impl fmt::Display for VolatilityRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VolatilityRisk::Low => "low",
            VolatilityRisk::Medium => "medium",
            VolatilityRisk::High => "high",
            VolatilityRisk::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    LinearTrend,
    Heuristic,
}

/// Cheapest launch window in UTC, `end_hour` exclusive and wrapping at 24
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl fmt::Display for LaunchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00 UTC", self.start_hour, self.end_hour)
    }
}

/// Price outlook for one instance type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceForecast {
    pub instance_type: String,
    pub region: String,
    /// `None` when no history was available
    pub current_price: Option<f64>,
    pub predicted_price_1h: Option<f64>,
    pub predicted_price_6h: Option<f64>,
    pub predicted_price_24h: Option<f64>,
    /// 0.1-0.95
    pub confidence: f64,
    pub trend_direction: TrendDirection,
    pub volatility_risk: VolatilityRisk,
    /// `None` when the hourly pattern covers too few hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_launch_window: Option<LaunchWindow>,
    pub method: ForecastMethod,
    pub generated_at: DateTime<Utc>,
}

/// Price `hours` samples ahead on the current trend, never negative
pub fn extrapolate(analysis: &PriceAnalysis, hours: u32) -> f64 {
    (analysis.current_price + analysis.trend_slope * f64::from(hours)).max(0.0)
}

/// Confidence from sample count, volatility and window coverage
pub fn forecast_confidence(analysis: &PriceAnalysis) -> f64 {
    let mut confidence: f64 = 0.5;

    confidence += match analysis.data_points {
        n if n >= 500 => 0.25,
        n if n >= 100 => 0.15,
        n if n >= 50 => 0.05,
        _ => 0.0,
    };

    let v = analysis.volatility;
    if v < 0.1 {
        confidence += 0.2;
    } else if v < 0.2 {
        confidence += 0.1;
    } else if v > 0.4 {
        confidence -= 0.15;
    }

    if analysis.time_span_hours >= FULL_SPAN_HOURS {
        confidence += 0.05;
    }

    confidence.clamp(0.1, 0.95)
}

/// Two-hour window starting at the cheapest hour; the earliest hour wins ties
pub fn optimal_launch_window(hourly: &BTreeMap<u8, f64>) -> Option<LaunchWindow> {
    if hourly.len() < MIN_PATTERN_HOURS {
        return None;
    }
    let (start, _) = hourly
        .iter()
        .fold(None::<(u8, f64)>, |best, (&hour, &price)| match best {
            Some((_, lowest)) if price >= lowest => best,
            _ => Some((hour, price)),
        })?;
    Some(LaunchWindow {
        start_hour: start,
        end_hour: (start + LAUNCH_WINDOW_HOURS) % 24,
    })
}

pub fn forecast_from_history(analysis: &PriceAnalysis, region: &str) -> PriceForecast {
    PriceForecast {
        instance_type: analysis.instance_type.clone(),
        region: region.to_string(),
        current_price: Some(analysis.current_price),
        predicted_price_1h: Some(extrapolate(analysis, HORIZONS[0])),
        predicted_price_6h: Some(extrapolate(analysis, HORIZONS[1])),
        predicted_price_24h: Some(extrapolate(analysis, HORIZONS[2])),
        confidence: forecast_confidence(analysis),
        trend_direction: TrendDirection::from_trend_score(analysis.trend_score()),
        volatility_risk: VolatilityRisk::from_volatility(analysis.volatility),
        optimal_launch_window: optimal_launch_window(&analysis.hourly_pattern),
        method: ForecastMethod::LinearTrend,
        generated_at: Utc::now(),
    }
}

pub fn heuristic_forecast(instance_type: &str, region: &str) -> PriceForecast {
    PriceForecast {
        instance_type: instance_type.to_string(),
        region: region.to_string(),
        current_price: None,
        predicted_price_1h: None,
        predicted_price_6h: None,
        predicted_price_24h: None,
        confidence: HEURISTIC_CONFIDENCE,
        trend_direction: TrendDirection::Unknown,
        volatility_risk: VolatilityRisk::Unknown,
        optimal_launch_window: None,
        method: ForecastMethod::Heuristic,
        generated_at: Utc::now(),
    }
}

/// Builds price forecasts for one region
pub struct PriceForecaster {
    region: String,
    provider: Option<Arc<dyn PriceHistoryProvider>>,
    timeout: Duration,
    lookback_days: u32,
    metrics: Option<EngineMetrics>,
    logger: StructuredLogger,
}

impl PriceForecaster {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            provider: None,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            metrics: None,
            logger: StructuredLogger::default(),
        }
    }

    pub fn from_provider_set(region: impl Into<String>, set: &ProviderSet) -> Self {
        let mut forecaster = Self::new(region);
        forecaster.provider = set.price_history.clone();
        forecaster
    }

    pub fn with_price_provider(mut self, provider: Arc<dyn PriceHistoryProvider>) -> Self {
        self.provider = Some(provider);
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

    /// Forecast from history when available, otherwise the placeholder
    pub async fn forecast(&self, instance_type: &str) -> PriceForecast {
        let forecast = match self.history(instance_type).await {
            Some(analysis) => forecast_from_history(&analysis, &self.region),
            None => heuristic_forecast(instance_type, &self.region),
        };
        self.logger.log_forecast(
            &self.region,
            instance_type,
            &forecast.trend_direction.to_string(),
            forecast.confidence,
        );
        forecast
    }

    async fn history(&self, instance_type: &str) -> Option<PriceAnalysis> {
        let Some(provider) = self.provider.as_ref().filter(|p| p.is_available()) else {
            debug!(instance_type = %instance_type, "No price provider available, heuristic forecast");
            return None;
        };
        let call = provider.get_price_analysis(instance_type, self.lookback_days);
        let outcome: Result<PriceAnalysis> = match tokio::time::timeout(self.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout {
                operation: "get_price_analysis",
                elapsed: self.timeout,
            }),
        };
        match outcome {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_provider_failures("get_price_analysis");
                }
                self.logger
                    .log_provider_fallback("get_price_analysis", "heuristic_forecast", &e.to_string());
                None
            }
        }
    }
}
