//! Spot Advisor CLI
//!
//! A command-line tool for ranking spot instance types, picking
//! availability zones and inspecting spot price history from a catalog
//! snapshot.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::analyze::{AnalyzeArgs, CloudArg};
use spot_engine::providers::InstanceSpecsProvider;
use spot_engine::{
    CloudProvider, EngineMetrics, ProviderRegistry, ProviderSet, SpotAdvisor, StaticCatalog,
    StructuredLogger, WeightPreset,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Spot Advisor CLI
#[derive(Parser)]
#[command(name = "spotctl")]
#[command(author, version, about = "Spot instance advisor", long_about = None)]
pub struct Cli {
    /// Catalog snapshot (JSON); defaults to catalog.json in the config dir
    #[arg(long, global = true, env = "SPOT_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Engine configuration file (TOML, JSON or YAML)
    #[arg(long, global = true, env = "SPOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cloud vendor of the request
    #[arg(long, global = true, value_enum, default_value = "aws")]
    pub cloud: CloudArg,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank spot instance types for a workload
    Analyze(AnalyzeArgs),

    /// Rank the availability zones of a region for one instance type
    Zones {
        instance_type: String,

        #[arg(long, short)]
        region: Option<String>,

        /// Weight preset: balanced, high-availability, cost-optimized
        #[arg(long)]
        weights: Option<WeightPreset>,
    },

    /// Forecast the spot price of one instance type 1, 6 and 24 hours ahead
    Forecast {
        instance_type: String,

        #[arg(long, short)]
        region: Option<String>,
    },

    /// Analyze spot price history for many instance types concurrently
    BatchPrices {
        #[arg(required = true)]
        instance_types: Vec<String>,
    },

    /// Show what is derived from instance type names
    Families {
        #[arg(required = true)]
        instance_types: Vec<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn build_advisor(cli: &Cli, metrics: &EngineMetrics) -> Result<SpotAdvisor> {
    let mut engine_config = config::load_engine_config(cli.config.as_deref())?;
    if let Commands::Analyze(args) = &cli.command {
        engine_config.analysis.enhanced_scoring |= args.enhanced;
    }
    let catalog_path = config::catalog_path(cli.catalog.as_deref())?;
    let catalog = StaticCatalog::from_path(&catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;

    let mut registry = ProviderRegistry::new();
    registry.register(
        catalog.cloud_provider(),
        ProviderSet::from_catalog(Arc::new(catalog)),
    );

    let logger = StructuredLogger::new("spotctl");
    let clouds: Vec<String> = registry.supported().iter().map(|c| c.to_string()).collect();
    logger.log_startup(CLI_VERSION, &clouds);

    Ok(SpotAdvisor::new(registry, engine_config)
        .with_metrics(metrics.clone())
        .with_logger(logger))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let cloud: CloudProvider = cli.cloud.into();

    if let Commands::Families { instance_types } = &cli.command {
        return commands::families::run(cloud, instance_types, cli.format);
    }

    let metrics = EngineMetrics::new().context("Failed to create metrics registry")?;
    let advisor = build_advisor(&cli, &metrics)?;
    info!(cloud = %cloud, "Advisor ready");

    let outcome = match &cli.command {
        Commands::Analyze(args) => commands::analyze::run(&advisor, cloud, args, cli.format).await,
        Commands::Zones {
            instance_type,
            region,
            weights,
        } => {
            commands::zones::run(
                &advisor,
                cloud,
                region.as_deref(),
                instance_type,
                *weights,
                cli.format,
            )
            .await
        }
        Commands::Forecast { instance_type, region } => {
            commands::forecast::run(&advisor, cloud, region.as_deref(), instance_type, cli.format).await
        }
        Commands::BatchPrices { instance_types } => {
            commands::batch::run(&advisor, cloud, instance_types, cli.format).await
        }
        Commands::Families { .. } => Ok(()),
    };

    if cli.metrics {
        eprintln!("{}", metrics.encode().context("Failed to encode metrics")?);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use spot_engine::InterruptionFrequency;

    #[test]
    fn test_analyze_flags_map_to_requirements() {
        let cli = Cli::try_parse_from([
            "spotctl",
            "analyze",
            "--min-vcpu",
            "4",
            "--max-vcpu",
            "16",
            "--family",
            "m",
            "--family",
            "c",
            "--max-interruption",
            "low",
            "--cloud",
            "azure",
        ])
        .unwrap();

        let Commands::Analyze(args) = &cli.command else {
            panic!("expected analyze");
        };
        let req = args.to_requirements(cli.cloud.into(), InterruptionFrequency::Medium);
        assert_eq!(req.min_vcpu, 4);
        assert_eq!(req.max_vcpu, 16);
        assert_eq!(req.families, vec!["m", "c"]);
        assert_eq!(req.max_interruption, InterruptionFrequency::Low);
        assert_eq!(req.region, "eastus");
        assert_eq!(req.top_n, 0);
    }

    #[test]
    fn test_zone_weights_preset_parses() {
        let cli = Cli::try_parse_from(["spotctl", "zones", "m5.large", "--weights", "cost-optimized"]).unwrap();
        match cli.command {
            Commands::Zones { weights, .. } => assert_eq!(weights, Some(WeightPreset::CostOptimized)),
            _ => panic!("expected zones"),
        }
        assert!(Cli::try_parse_from(["spotctl", "zones", "m5.large", "--weights", "cheapest"]).is_err());
    }

    #[test]
    fn test_enhanced_flag_and_forecast_parse() {
        let cli = Cli::try_parse_from(["spotctl", "analyze", "--enhanced"]).unwrap();
        let Commands::Analyze(args) = &cli.command else {
            panic!("expected analyze");
        };
        assert!(args.enhanced);

        let cli = Cli::try_parse_from(["spotctl", "forecast", "m5.large", "-r", "us-west-2"]).unwrap();
        match cli.command {
            Commands::Forecast { instance_type, region } => {
                assert_eq!(instance_type, "m5.large");
                assert_eq!(region.as_deref(), Some("us-west-2"));
            }
            _ => panic!("expected forecast"),
        }
    }
}
