//! In-memory provider backed by a JSON catalog snapshot
//!
//! Serves every provider contract from a single snapshot file. Used by the
//! CLI and by tests; live vendor adapters implement the same traits.

use super::{
    CapacityProvider, InstanceSpecsProvider, PriceAnalysis, PriceHistoryProvider,
    SpotDataProvider, ZoneAvailabilityProvider, ZoneInfo,
};
use crate::error::{ProviderError, Result};
use crate::models::{CloudProvider, InstanceSpecs, OperatingSystem, SpotData};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Serialized catalog contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    pub cloud_provider: CloudProvider,
    pub specs: Vec<InstanceSpecs>,
    pub spot_data: Vec<SpotData>,
    /// Keyed by instance type
    pub price_history: HashMap<String, PriceAnalysis>,
    /// Keyed by `{region}/{instance_type}`
    pub zones: HashMap<String, Vec<ZoneInfo>>,
    /// Keyed by `{zone}/{instance_type}`
    pub capacity: HashMap<String, u8>,
}

impl CatalogSnapshot {
    pub fn zone_key(region: &str, instance_type: &str) -> String {
        format!("{}/{}", region, instance_type)
    }

    pub fn capacity_key(zone: &str, instance_type: &str) -> String {
        format!("{}/{}", zone, instance_type)
    }
}

/// Provider serving a [`CatalogSnapshot`]
pub struct StaticCatalog {
    cloud: CloudProvider,
    inner: RwLock<CatalogSnapshot>,
}

impl StaticCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            cloud: snapshot.cloud_provider,
            inner: RwLock::new(snapshot),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)?;
        Ok(Self::new(snapshot))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&raw)?;
        info!(path = %path.display(), cloud = %catalog.cloud, "Loaded catalog snapshot");
        Ok(catalog)
    }

    /// Swap the served snapshot. The vendor tag is fixed at construction.
    pub async fn replace(&self, snapshot: CatalogSnapshot) {
        let mut inner = self.inner.write().await;
        *inner = snapshot;
        inner.cloud_provider = self.cloud;
    }

    fn has_price_history(&self) -> bool {
        self.inner
            .try_read()
            .map(|s| !s.price_history.is_empty())
            .unwrap_or(true)
    }

    fn has_zones(&self) -> bool {
        self.inner
            .try_read()
            .map(|s| !s.zones.is_empty())
            .unwrap_or(true)
    }
}

#[async_trait]
impl InstanceSpecsProvider for StaticCatalog {
    async fn get_instance_specs(&self, instance_type: &str) -> Result<InstanceSpecs> {
        let inner = self.inner.read().await;
        inner
            .specs
            .iter()
            .find(|s| s.instance_type == instance_type)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("instance type {}", instance_type)))
    }

    async fn get_all_instance_specs(&self) -> Result<Vec<InstanceSpecs>> {
        Ok(self.inner.read().await.specs.clone())
    }

    fn cloud_provider(&self) -> CloudProvider {
        self.cloud
    }
}

#[async_trait]
impl SpotDataProvider for StaticCatalog {
    async fn fetch_spot_data(&self, region: &str, os: OperatingSystem) -> Result<Vec<SpotData>> {
        let inner = self.inner.read().await;
        let data: Vec<SpotData> = inner
            .spot_data
            .iter()
            .filter(|d| d.region == region && d.os == os)
            .cloned()
            .collect();
        debug!(region = %region, os = %os, count = data.len(), "Served spot data");
        Ok(data)
    }

    async fn supported_regions(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        let regions: BTreeSet<String> = inner.spot_data.iter().map(|d| d.region.clone()).collect();
        Ok(regions.into_iter().collect())
    }

    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    fn cloud_provider(&self) -> CloudProvider {
        self.cloud
    }
}

#[async_trait]
impl PriceHistoryProvider for StaticCatalog {
    fn is_available(&self) -> bool {
        self.has_price_history()
    }

    async fn get_price_analysis(&self, instance_type: &str, _lookback_days: u32) -> Result<PriceAnalysis> {
        let inner = self.inner.read().await;
        inner
            .price_history
            .get(instance_type)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("price history for {}", instance_type)))
    }

    async fn get_batch_price_analysis(
        &self,
        instance_types: &[String],
        _lookback_days: u32,
    ) -> Result<HashMap<String, PriceAnalysis>> {
        let inner = self.inner.read().await;
        Ok(instance_types
            .iter()
            .filter_map(|t| inner.price_history.get(t).map(|a| (t.clone(), a.clone())))
            .collect())
    }
}

#[async_trait]
impl ZoneAvailabilityProvider for StaticCatalog {
    fn is_available(&self) -> bool {
        self.has_zones()
    }

    async fn get_zone_availability(&self, instance_type: &str, region: &str) -> Result<Vec<ZoneInfo>> {
        let inner = self.inner.read().await;
        inner
            .zones
            .get(&CatalogSnapshot::zone_key(region, instance_type))
            .cloned()
            .ok_or_else(|| {
                ProviderError::NotFound(format!("zones for {} in {}", instance_type, region))
            })
    }
}

#[async_trait]
impl CapacityProvider for StaticCatalog {
    async fn get_capacity_score(&self, instance_type: &str, zone: &str) -> Result<u8> {
        let inner = self.inner.read().await;
        inner
            .capacity
            .get(&CatalogSnapshot::capacity_key(zone, instance_type))
            .copied()
            .ok_or_else(|| ProviderError::NotFound(format!("capacity for {} in {}", instance_type, zone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstanceCategory, InterruptionFrequency};
    use chrono::Utc;

    fn snapshot() -> CatalogSnapshot {
        let specs = InstanceSpecs {
            instance_type: "m5.large".to_string(),
            vcpu: 2,
            memory_gb: 8.0,
            has_gpu: false,
            gpu_count: 0,
            gpu_type: None,
            gpu_memory_gb: None,
            network_mbps: 10_000,
            storage_gb: 0.0,
            storage_type: None,
            architecture: "x86_64".to_string(),
            category: InstanceCategory::GeneralPurpose,
            generation: Default::default(),
            is_deprecated: false,
            is_burstable: false,
            is_bare_metal: false,
            processor_family: None,
            cloud_provider: CloudProvider::Aws,
        };
        let spot = SpotData {
            instance_type: "m5.large".to_string(),
            region: "us-east-1".to_string(),
            os: OperatingSystem::Linux,
            savings_percent: 70,
            interruption_frequency: InterruptionFrequency::Low,
            spot_price: Some(0.03),
            on_demand_price: Some(0.096),
            cloud_provider: CloudProvider::Aws,
            last_updated: Utc::now(),
        };
        let mut zones = HashMap::new();
        zones.insert(
            CatalogSnapshot::zone_key("us-east-1", "m5.large"),
            vec![ZoneInfo::open("us-east-1a"), ZoneInfo::open("us-east-1b")],
        );
        let mut capacity = HashMap::new();
        capacity.insert(CatalogSnapshot::capacity_key("us-east-1a", "m5.large"), 85);

        CatalogSnapshot {
            cloud_provider: CloudProvider::Aws,
            specs: vec![specs],
            spot_data: vec![spot],
            price_history: HashMap::new(),
            zones,
            capacity,
        }
    }

    #[tokio::test]
    async fn test_lookups() {
        let catalog = StaticCatalog::new(snapshot());

        let specs = catalog.get_instance_specs("m5.large").await.unwrap();
        assert_eq!(specs.vcpu, 2);
        assert!(matches!(
            catalog.get_instance_specs("m5.metal").await,
            Err(ProviderError::NotFound(_))
        ));

        let spot = catalog
            .fetch_spot_data("us-east-1", OperatingSystem::Linux)
            .await
            .unwrap();
        assert_eq!(spot.len(), 1);
        let windows = catalog
            .fetch_spot_data("us-east-1", OperatingSystem::Windows)
            .await
            .unwrap();
        assert!(windows.is_empty());
        assert_eq!(catalog.supported_regions().await.unwrap(), vec!["us-east-1"]);

        let zones = catalog
            .get_zone_availability("m5.large", "us-east-1")
            .await
            .unwrap();
        assert_eq!(zones.len(), 2);
        assert_eq!(
            catalog.get_capacity_score("m5.large", "us-east-1a").await.unwrap(),
            85
        );
    }

    #[tokio::test]
    async fn test_availability_follows_snapshot_contents() {
        let catalog = StaticCatalog::new(snapshot());
        assert!(ZoneAvailabilityProvider::is_available(&catalog));
        assert!(!PriceHistoryProvider::is_available(&catalog));

        catalog.replace(CatalogSnapshot::default()).await;
        assert!(!ZoneAvailabilityProvider::is_available(&catalog));
        assert_eq!(InstanceSpecsProvider::cloud_provider(&catalog), CloudProvider::Aws);
    }

    #[tokio::test]
    async fn test_batch_price_analysis_skips_unknown_types() {
        let mut snap = snapshot();
        snap.price_history.insert(
            "m5.large".to_string(),
            PriceAnalysis {
                instance_type: "m5.large".to_string(),
                current_price: 0.03,
                avg_price: 0.03,
                min_price: 0.028,
                max_price: 0.032,
                std_dev: 0.001,
                volatility: 0.03,
                trend_slope: 0.0,
                data_points: 168,
                last_updated: None,
                time_span_hours: 168.0,
                hourly_pattern: Default::default(),
                per_zone: HashMap::new(),
            },
        );
        let catalog = StaticCatalog::new(snap);

        let types = vec!["m5.large".to_string(), "c5.large".to_string()];
        let batch = catalog.get_batch_price_analysis(&types, 7).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch["m5.large"].data_points, 168);
        assert!(!batch.contains_key("c5.large"));
    }

    #[test]
    fn test_from_json_str() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        let catalog = StaticCatalog::from_json_str(&json).unwrap();
        assert_eq!(SpotDataProvider::cloud_provider(&catalog), CloudProvider::Aws);

        assert!(matches!(
            StaticCatalog::from_json_str("{not json"),
            Err(ProviderError::Json(_))
        ));
    }
}
