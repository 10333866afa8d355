//! Availability zone scoring and selection
//!
//! Combines zone availability, capacity, price, price stability and an
//! interruption estimate into one ranked list per instance type. Missing
//! data never fails a recommendation: default zones and predicted prices
//! fill the gaps and lower the reported confidence instead. The same price
//! history also drives a short-horizon price forecast.

pub mod forecast;
pub mod pricing;
pub mod selector;
pub mod weights;


pub use forecast::{
    ForecastMethod, LaunchWindow, PriceForecast, PriceForecaster, TrendDirection, VolatilityRisk,
};
pub use pricing::{default_zones, extract_vcpus, predict_price, ZonePriceData};
pub use selector::{compute_confidence, ZoneSelector};
pub use weights::{ScoreWeights, UnknownPreset, WeightPreset};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Data source tags reported in [`SmartAZResult::data_sources`]
pub const SOURCE_ZONE_AVAILABILITY: &str = "zone_availability_api";
pub const SOURCE_PRICE_HISTORY: &str = "price_history_api";
pub const SOURCE_CAPACITY: &str = "capacity_api";
pub const SOURCE_PRICE_PREDICTION: &str = "price_prediction";

/// Score and raw facts for one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartAZRank {
    pub zone: String,
    pub rank: usize,
    /// 0-100, higher is better
    pub combined_score: f64,
    pub availability_score: f64,
    pub capacity_score: f64,
    pub price_score: f64,
    pub stability_score: f64,
    pub interruption_score: f64,

    pub spot_price: f64,
    pub on_demand_price: f64,
    /// Set only when the zone had no observed price sample
    pub price_predicted: bool,
    pub volatility: f64,
    /// Estimated interruption rate in percent
    pub interruption_rate: f64,
    pub available: bool,
    pub restricted: bool,

    pub explanation: String,
}

/// Ranked zones for one instance type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartAZResult {
    pub instance_type: String,
    pub region: String,
    pub rankings: Vec<SmartAZRank>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_az: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_best_az: Option<String>,
    pub insights: Vec<String>,
    pub data_sources: Vec<String>,
    /// 0.1-1.0
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

impl SmartAZResult {
    pub fn predicted_count(&self) -> usize {
        self.rankings.iter().filter(|r| r.price_predicted).count()
    }
}
