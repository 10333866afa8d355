//! Spot instance analysis command

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use spot_engine::{
    CloudProvider, InstanceAnalysis, InstanceCategory, InterruptionFrequency, OperatingSystem,
    SpotAdvisor, UsageRequirements,
};
use tabled::Tabled;

use crate::output::{
    color_score, format_price, format_timestamp, print_info, print_json, print_table, print_warning,
    OutputFormat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CloudArg {
    Aws,
    Azure,
    Gcp,
}

impl From<CloudArg> for CloudProvider {
    fn from(value: CloudArg) -> Self {
        match value {
            CloudArg::Aws => CloudProvider::Aws,
            CloudArg::Azure => CloudProvider::Azure,
            CloudArg::Gcp => CloudProvider::Gcp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InterruptionArg {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl From<InterruptionArg> for InterruptionFrequency {
    fn from(value: InterruptionArg) -> Self {
        match value {
            InterruptionArg::VeryLow => InterruptionFrequency::VeryLow,
            InterruptionArg::Low => InterruptionFrequency::Low,
            InterruptionArg::Medium => InterruptionFrequency::Medium,
            InterruptionArg::High => InterruptionFrequency::High,
            InterruptionArg::VeryHigh => InterruptionFrequency::VeryHigh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    General,
    Compute,
    Memory,
    Storage,
    Accelerated,
    Hpc,
}

impl From<CategoryArg> for InstanceCategory {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::General => InstanceCategory::GeneralPurpose,
            CategoryArg::Compute => InstanceCategory::ComputeOptimized,
            CategoryArg::Memory => InstanceCategory::MemoryOptimized,
            CategoryArg::Storage => InstanceCategory::StorageOptimized,
            CategoryArg::Accelerated => InstanceCategory::AcceleratedComputing,
            CategoryArg::Hpc => InstanceCategory::HighPerformance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OsArg {
    Linux,
    Windows,
}

impl From<OsArg> for OperatingSystem {
    fn from(value: OsArg) -> Self {
        match value {
            OsArg::Linux => OperatingSystem::Linux,
            OsArg::Windows => OperatingSystem::Windows,
        }
    }
}

/// Workload requirements for `analyze`
#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Region to analyze (defaults to the vendor's default region)
    #[arg(long, short)]
    pub region: Option<String>,

    #[arg(long, default_value_t = 2)]
    pub min_vcpu: i32,

    /// 0 means unbounded
    #[arg(long, default_value_t = 0)]
    pub max_vcpu: i32,

    #[arg(long, default_value_t = 0.0)]
    pub min_memory: f64,

    /// 0 means unbounded
    #[arg(long, default_value_t = 0.0)]
    pub max_memory: f64,

    /// Require a GPU
    #[arg(long)]
    pub gpu: bool,

    #[arg(long, default_value_t = 0)]
    pub gpu_count: u32,

    /// GPU model substring, e.g. A100
    #[arg(long)]
    pub gpu_type: Option<String>,

    #[arg(long, default_value_t = 0.0)]
    pub min_storage: f64,

    #[arg(long, value_enum)]
    pub category: Option<CategoryArg>,

    /// x86_64 or arm64
    #[arg(long)]
    pub arch: Option<String>,

    #[arg(long, value_enum, default_value = "linux")]
    pub os: OsArg,

    /// Highest acceptable interruption band (defaults to the configured value)
    #[arg(long, value_enum)]
    pub max_interruption: Option<InterruptionArg>,

    #[arg(long, default_value_t = 0)]
    pub min_savings: u8,

    #[arg(long)]
    pub allow_burstable: bool,

    #[arg(long)]
    pub allow_bare_metal: bool,

    /// Restrict to instance families (repeatable)
    #[arg(long = "family")]
    pub families: Vec<String>,

    /// Number of results (defaults to the configured value)
    #[arg(long)]
    pub top_n: Option<i32>,

    /// Re-rank with spot price history from the catalog
    #[arg(long)]
    pub enhanced: bool,
}

impl AnalyzeArgs {
    pub fn to_requirements(
        &self,
        cloud: CloudProvider,
        default_interruption: InterruptionFrequency,
    ) -> UsageRequirements {
        UsageRequirements {
            min_vcpu: self.min_vcpu,
            max_vcpu: self.max_vcpu,
            min_memory_gb: self.min_memory,
            max_memory_gb: self.max_memory,
            requires_gpu: self.gpu,
            min_gpu_count: self.gpu_count,
            gpu_type: self.gpu_type.clone(),
            min_storage_gb: self.min_storage,
            preferred_category: self.category.map(Into::into),
            architecture: self.arch.clone(),
            region: self
                .region
                .clone()
                .unwrap_or_else(|| cloud.default_region().to_string()),
            os: self.os.into(),
            max_interruption: self
                .max_interruption
                .map(Into::into)
                .unwrap_or(default_interruption),
            min_savings_percent: self.min_savings,
            allow_burstable: self.allow_burstable,
            allow_bare_metal: self.allow_bare_metal,
            families: self.families.clone(),
            top_n: self.top_n.unwrap_or(0),
        }
    }
}

/// Row for the ranked instance table
#[derive(Tabled)]
struct InstanceRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Instance")]
    instance_type: String,
    #[tabled(rename = "vCPU")]
    vcpu: u32,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Savings")]
    savings: String,
    #[tabled(rename = "Interruption")]
    interruption: String,
    #[tabled(rename = "Spot $/h")]
    spot_price: String,
    #[tabled(rename = "Score")]
    score: String,
}

impl From<&InstanceAnalysis> for InstanceRow {
    fn from(a: &InstanceAnalysis) -> Self {
        Self {
            rank: a.rank,
            instance_type: a.specs.instance_type.clone(),
            vcpu: a.specs.vcpu,
            memory: format!("{:.1} GB", a.specs.memory_gb),
            savings: format!("{}%", a.spot_data.savings_percent),
            interruption: a.spot_data.interruption_frequency.label().to_string(),
            spot_price: format_price(a.spot_data.spot_price),
            score: color_score(a.score),
        }
    }
}

pub async fn run(
    advisor: &SpotAdvisor,
    cloud: CloudProvider,
    args: &AnalyzeArgs,
    format: OutputFormat,
) -> Result<()> {
    let requirements = args.to_requirements(cloud, advisor.config().analysis.default_max_interruption);
    let response = advisor.analyze(cloud, &requirements).await;

    let Some(result) = response.result else {
        bail!(response.error.unwrap_or_else(|| "analysis failed".to_string()));
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_info(&format!(
                "{} {}: {} analyzed, {} filtered out ({})",
                result.cloud_provider,
                result.region,
                result.total_analyzed,
                result.filtered_out,
                format_timestamp(&result.analyzed_at)
            ));
            if result.top_instances.is_empty() {
                print_warning(&result.summary());
                return Ok(());
            }

            print_table(result.top_instances.iter().map(InstanceRow::from).collect());
            println!();
            for analysis in &result.top_instances {
                println!("{}: {}", analysis.specs.instance_type, analysis.recommendation);
                for warning in &analysis.warnings {
                    print_warning(warning);
                }
                if let Some(enhanced) = &analysis.enhanced {
                    print_info(&format!(
                        "base score {:.3}, secondary factors {:.3}",
                        enhanced.base_score, enhanced.factors.combined
                    ));
                    for insight in &enhanced.insights {
                        print_info(insight);
                    }
                }
            }
            println!("\n{}", result.summary());
        }
    }

    Ok(())
}
