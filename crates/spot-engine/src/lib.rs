//! Spot instance scoring and availability zone selection
//!
//! This crate provides the core functionality for:
//! - Filtering spot offerings against workload requirements
//! - Composite scoring, ranking and recommendation text
//! - History-aware re-scoring of the ranked list
//! - Availability zone ranking with predicted-price fallbacks
//! - Short-horizon spot price forecasts
//! - Concurrent batch price analysis
//! - Provider contracts, caching and observability

pub mod analyzer;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod family;
pub mod models;
pub mod observability;
pub mod providers;
pub mod service;
pub mod zones;

pub use analyzer::{validate_requirements, EnhancedScorer, ScoringPolicy, SpotAnalyzer};
pub use batch::{BatchConfig, BatchPriceAnalyzer, BatchResult};
pub use cache::EngineCache;
pub use config::EngineConfig;
pub use error::{AnalysisError, ProviderError, ValidationError};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use providers::{CatalogSnapshot, ProviderRegistry, ProviderSet, StaticCatalog};
pub use service::{
    AnalyzeResponse, AzResponse, BatchResponse, ForecastResponse, ServiceResponse, SpotAdvisor,
};
pub use zones::{
    PriceForecast, PriceForecaster, ScoreWeights, SmartAZRank, SmartAZResult, WeightPreset, ZoneSelector,
};
