//! Provider registry keyed by cloud vendor
//!
//! The caller builds the registry explicitly; there is no global
//! registration.

use super::{
    CapacityProvider, InstanceSpecsProvider, PriceHistoryProvider, SpotDataProvider,
    StaticCatalog, ZoneAvailabilityProvider,
};
use crate::error::{ProviderError, Result};
use crate::models::CloudProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// The providers serving one cloud vendor
#[derive(Clone)]
pub struct ProviderSet {
    pub specs: Arc<dyn InstanceSpecsProvider>,
    pub spot: Arc<dyn SpotDataProvider>,
    pub price_history: Option<Arc<dyn PriceHistoryProvider>>,
    pub zones: Option<Arc<dyn ZoneAvailabilityProvider>>,
    pub capacity: Option<Arc<dyn CapacityProvider>>,
}

impl ProviderSet {
    /// Create a set with only the mandatory catalog and spot providers
    pub fn new(specs: Arc<dyn InstanceSpecsProvider>, spot: Arc<dyn SpotDataProvider>) -> Self {
        Self {
            specs,
            spot,
            price_history: None,
            zones: None,
            capacity: None,
        }
    }

    /// Serve every contract from one in-memory catalog
    pub fn from_catalog(catalog: Arc<StaticCatalog>) -> Self {
        Self {
            specs: catalog.clone(),
            spot: catalog.clone(),
            price_history: Some(catalog.clone()),
            zones: Some(catalog.clone()),
            capacity: Some(catalog),
        }
    }

    pub fn with_price_history(mut self, provider: Arc<dyn PriceHistoryProvider>) -> Self {
        self.price_history = Some(provider);
        self
    }

    pub fn with_zones(mut self, provider: Arc<dyn ZoneAvailabilityProvider>) -> Self {
        self.zones = Some(provider);
        self
    }

    pub fn with_capacity(mut self, provider: Arc<dyn CapacityProvider>) -> Self {
        self.capacity = Some(provider);
        self
    }
}

/// Maps each supported vendor to its provider set
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    sets: HashMap<CloudProvider, ProviderSet>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider set for a vendor
    pub fn register(&mut self, cloud: CloudProvider, set: ProviderSet) -> &mut Self {
        info!(cloud = %cloud, "Registering provider set");
        self.sets.insert(cloud, set);
        self
    }

    pub fn with(mut self, cloud: CloudProvider, set: ProviderSet) -> Self {
        self.register(cloud, set);
        self
    }

    pub fn get(&self, cloud: CloudProvider) -> Result<&ProviderSet> {
        self.sets
            .get(&cloud)
            .ok_or(ProviderError::UnsupportedProvider(cloud))
    }

    pub fn is_supported(&self, cloud: CloudProvider) -> bool {
        self.sets.contains_key(&cloud)
    }

    /// Registered vendors in a stable order
    pub fn supported(&self) -> Vec<CloudProvider> {
        let mut clouds: Vec<_> = self.sets.keys().copied().collect();
        clouds.sort_by_key(|c| c.as_str());
        clouds
    }
}
