//! Core data models for the spot engine
//!
//! These records are cloud-agnostic. Field names are part of the JSON
//! interchange format and must stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported cloud vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    #[default]
    Aws,
    Azure,
    Gcp,
}

impl CloudProvider {
    /// Parse a vendor tag, falling back to AWS for anything unrecognised
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "azure" => CloudProvider::Azure,
            "gcp" => CloudProvider::Gcp,
            _ => CloudProvider::Aws,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gcp => "gcp",
        }
    }

    pub fn default_region(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "us-east-1",
            CloudProvider::Azure => "eastus",
            CloudProvider::Gcp => "us-central1",
        }
    }

    /// Prefix used to namespace cache keys per vendor
    pub fn cache_key_prefix(&self) -> String {
        format!("{}:", self.as_str())
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperatingSystem {
    #[default]
    Linux,
    Windows,
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingSystem::Linux => f.write_str("Linux"),
            OperatingSystem::Windows => f.write_str("Windows"),
        }
    }
}

/// General hardware category of an instance type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceCategory {
    GeneralPurpose,
    ComputeOptimized,
    MemoryOptimized,
    StorageOptimized,
    AcceleratedComputing,
    HighPerformance,
}

/// How often spot capacity of an instance type is reclaimed.
///
/// Variants are declared from least to most frequent so the derived
/// ordering matches the band ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum InterruptionFrequency {
    VeryLow,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl InterruptionFrequency {
    pub const ALL: [InterruptionFrequency; 5] = [
        InterruptionFrequency::VeryLow,
        InterruptionFrequency::Low,
        InterruptionFrequency::Medium,
        InterruptionFrequency::High,
        InterruptionFrequency::VeryHigh,
    ];

    /// Human-readable interruption band
    pub fn label(&self) -> &'static str {
        match self {
            InterruptionFrequency::VeryLow => "<5%",
            InterruptionFrequency::Low => "5-10%",
            InterruptionFrequency::Medium => "10-15%",
            InterruptionFrequency::High => "15-20%",
            InterruptionFrequency::VeryHigh => ">20%",
        }
    }
}

impl fmt::Display for InterruptionFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceGeneration {
    #[default]
    Current,
    Previous,
    Legacy,
    Deprecated,
    #[serde(other)]
    Unknown,
}

/// Hardware facts for one instance type. Read-only after catalog construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpecs {
    pub instance_type: String,
    pub vcpu: u32,
    pub memory_gb: f64,
    #[serde(default)]
    pub has_gpu: bool,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_memory_gb: Option<f64>,
    #[serde(default)]
    pub network_mbps: u32,
    #[serde(default)]
    pub storage_gb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    pub architecture: String,
    pub category: InstanceCategory,
    #[serde(default)]
    pub generation: InstanceGeneration,
    #[serde(default)]
    pub is_deprecated: bool,
    #[serde(default)]
    pub is_burstable: bool,
    #[serde(default)]
    pub is_bare_metal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_family: Option<String>,
    #[serde(default)]
    pub cloud_provider: CloudProvider,
}

/// Spot pricing and interruption facts for one instance type in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotData {
    pub instance_type: String,
    pub region: String,
    #[serde(default)]
    pub os: OperatingSystem,
    /// Savings versus on-demand, 0-100. Zero means no pricing data.
    pub savings_percent: u8,
    pub interruption_frequency: InterruptionFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_demand_price: Option<f64>,
    #[serde(default)]
    pub cloud_provider: CloudProvider,
    pub last_updated: DateTime<Utc>,
}

/// Per-instance score components, kept for explainability
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub savings_score: f64,
    pub stability_score: f64,
    pub fitness_score: f64,
    pub value_score: f64,
    /// Subtracted from the weighted total, within [0, 0.15]
    pub generation_penalty: f64,
}

/// Secondary score factors, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedFactors {
    /// Higher means steadier pricing
    pub volatility: f64,
    /// Higher means prices are flat or falling
    pub trend: f64,
    pub capacity_pool: f64,
    /// Higher means price barely moves with the time of day
    pub time_pattern: f64,
    /// Higher means less contested capacity
    pub popularity: f64,
    /// Weighted combination of the five factors
    pub combined: f64,
}

/// History-aware adjustment applied on top of the base score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedScore {
    /// Score before blending
    pub base_score: f64,
    pub factors: EnhancedFactors,
    /// False when the factors were estimated from instance traits
    pub from_history: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
}

/// One ranked instance with its score and annotations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceAnalysis {
    pub specs: InstanceSpecs,
    pub spot_data: SpotData,
    pub score: f64,
    pub rank: usize,
    pub score_breakdown: ScoreBreakdown,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Present when the history-aware pass re-scored this instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced: Option<EnhancedScore>,
}

/// Workload requirements supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageRequirements {
    pub min_vcpu: i32,
    /// Zero means unbounded
    pub max_vcpu: i32,
    /// Zero means unbounded
    pub min_memory_gb: f64,
    /// Zero means unbounded
    pub max_memory_gb: f64,
    pub requires_gpu: bool,
    pub min_gpu_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    pub min_storage_gb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_category: Option<InstanceCategory>,
    /// x86_64 or arm64
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    pub region: String,
    pub os: OperatingSystem,
    pub max_interruption: InterruptionFrequency,
    pub min_savings_percent: u8,
    pub allow_burstable: bool,
    pub allow_bare_metal: bool,
    /// Allowed instance families (t, m, c, r, D, n2...)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub families: Vec<String>,
    pub top_n: i32,
}

/// Fallback when top_n is unset or non-positive
pub const DEFAULT_TOP_N: usize = 10;

impl Default for UsageRequirements {
    fn default() -> Self {
        Self {
            min_vcpu: 2,
            max_vcpu: 0,
            min_memory_gb: 0.0,
            max_memory_gb: 0.0,
            requires_gpu: false,
            min_gpu_count: 0,
            gpu_type: None,
            min_storage_gb: 0.0,
            preferred_category: None,
            architecture: None,
            region: "us-east-1".to_string(),
            os: OperatingSystem::Linux,
            max_interruption: InterruptionFrequency::Medium,
            min_savings_percent: 0,
            allow_burstable: false,
            allow_bare_metal: false,
            families: Vec::new(),
            top_n: DEFAULT_TOP_N as i32,
        }
    }
}

impl UsageRequirements {
    pub fn effective_top_n(&self) -> usize {
        if self.top_n <= 0 {
            DEFAULT_TOP_N
        } else {
            self.top_n as usize
        }
    }
}

/// Complete output of one analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub requirements: UsageRequirements,
    pub top_instances: Vec<InstanceAnalysis>,
    pub total_analyzed: usize,
    pub filtered_out: usize,
    pub analyzed_at: DateTime<Utc>,
    pub region: String,
    pub cloud_provider: CloudProvider,
}

impl AnalysisResult {
    /// One-line summary of the top recommendation
    pub fn summary(&self) -> String {
        match self.top_instances.first() {
            None => "No suitable instances found matching your requirements. Try relaxing constraints."
                .to_string(),
            Some(top) => format!(
                "Top recommendation: {} ({} vCPU, {:.0} GB RAM) with {}% savings and {} interruption rate. Score: {:.2}",
                top.specs.instance_type,
                top.specs.vcpu,
                top.specs.memory_gb,
                top.spot_data.savings_percent,
                top.spot_data.interruption_frequency,
                top.score,
            ),
        }
    }
}
