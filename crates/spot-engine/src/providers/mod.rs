//! External data provider contracts
//!
//! The engine consumes catalog, spot, price-history, zone and capacity data
//! through these traits. One implementation exists per cloud vendor; a
//! [`ProviderRegistry`] selects the set for a vendor at construction time.

mod catalog;
mod registry;

pub use catalog::{CatalogSnapshot, StaticCatalog};
pub use registry::{ProviderRegistry, ProviderSet};

use crate::error::Result;
use crate::models::{CloudProvider, InstanceSpecs, OperatingSystem, SpotData};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Hardware catalog lookups
#[async_trait]
pub trait InstanceSpecsProvider: Send + Sync {
    async fn get_instance_specs(&self, instance_type: &str) -> Result<InstanceSpecs>;

    async fn get_all_instance_specs(&self) -> Result<Vec<InstanceSpecs>>;

    /// Instances whose vCPU count lies within the range; `max_vcpu == 0` is unbounded
    async fn get_instances_by_vcpu(&self, min_vcpu: u32, max_vcpu: u32) -> Result<Vec<InstanceSpecs>> {
        let all = self.get_all_instance_specs().await?;
        Ok(all
            .into_iter()
            .filter(|s| s.vcpu >= min_vcpu && (max_vcpu == 0 || s.vcpu <= max_vcpu))
            .collect())
    }

    fn cloud_provider(&self) -> CloudProvider;
}

/// Spot pricing and interruption data
#[async_trait]
pub trait SpotDataProvider: Send + Sync {
    async fn fetch_spot_data(&self, region: &str, os: OperatingSystem) -> Result<Vec<SpotData>>;

    async fn supported_regions(&self) -> Result<Vec<String>>;

    /// Force the provider to drop and re-fetch its upstream data
    async fn refresh(&self) -> Result<()>;

    fn cloud_provider(&self) -> CloudProvider;
}

/// Historical spot price statistics
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Whether the provider has credentials and can be queried
    fn is_available(&self) -> bool;

    async fn get_price_analysis(&self, instance_type: &str, lookback_days: u32) -> Result<PriceAnalysis>;

    /// Batch lookup; instance types that fail are left out of the map
    async fn get_batch_price_analysis(
        &self,
        instance_types: &[String],
        lookback_days: u32,
    ) -> Result<HashMap<String, PriceAnalysis>> {
        let mut out = HashMap::with_capacity(instance_types.len());
        for instance_type in instance_types {
            match self.get_price_analysis(instance_type, lookback_days).await {
                Ok(analysis) => {
                    out.insert(instance_type.clone(), analysis);
                }
                Err(e) => debug!(instance_type = %instance_type, error = %e, "Price analysis skipped"),
            }
        }
        Ok(out)
    }
}

/// Per-zone availability of a VM type
#[async_trait]
pub trait ZoneAvailabilityProvider: Send + Sync {
    fn is_available(&self) -> bool;

    async fn get_zone_availability(&self, instance_type: &str, region: &str) -> Result<Vec<ZoneInfo>>;
}

/// Capacity estimate (0-100) of a VM type in a zone
#[async_trait]
pub trait CapacityProvider: Send + Sync {
    async fn get_capacity_score(&self, instance_type: &str, zone: &str) -> Result<u8>;
}

/// Availability of a VM type in one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub zone: String,
    pub available: bool,
    #[serde(default)]
    pub restricted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restriction_message: Option<String>,
    /// 0-100, higher means more capacity is likely
    #[serde(default = "default_capacity_hint")]
    pub capacity_score: u8,
}

/// Capacity assumed when nothing better is known
pub const DEFAULT_CAPACITY_SCORE: u8 = 50;

fn default_capacity_hint() -> u8 {
    DEFAULT_CAPACITY_SCORE
}

impl ZoneInfo {
    /// An available, unrestricted zone with unknown (medium) capacity
    pub fn open(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            available: true,
            restricted: false,
            restriction_message: None,
            capacity_score: DEFAULT_CAPACITY_SCORE,
        }
    }
}

/// Price statistics for one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonePriceStats {
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub volatility: f64,
    pub data_points: u32,
}

/// Price statistics computed from historical samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub instance_type: String,
    pub current_price: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub std_dev: f64,
    /// Coefficient of variation (std_dev / avg_price)
    pub volatility: f64,
    /// Positive means prices are rising
    #[serde(default)]
    pub trend_slope: f64,
    #[serde(default)]
    pub data_points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Span between the oldest and newest sample
    #[serde(default)]
    pub time_span_hours: f64,
    /// Hour of day (UTC, 0-23) to mean price in that hour
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hourly_pattern: BTreeMap<u8, f64>,
    /// Empty when the provider only reports regional figures
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub per_zone: HashMap<String, ZonePriceStats>,
}

impl PriceAnalysis {
    /// Slope as percent of the mean price per sample, clamped to [-1, 1]
    pub fn trend_score(&self) -> f64 {
        if self.avg_price <= 0.0 {
            return 0.0;
        }
        (self.trend_slope / self.avg_price * 100.0).clamp(-1.0, 1.0)
    }
}
