//! Instance naming inspection

use anyhow::Result;
use serde::Serialize;
use spot_engine::family::extract_family;
use spot_engine::zones::pricing::{base_rate_per_vcpu, predict_price};
use spot_engine::zones::extract_vcpus;
use spot_engine::CloudProvider;
use tabled::Tabled;

use crate::output::{format_price, print_json, print_table, OutputFormat};

/// What the engine derives from an instance type name alone
#[derive(Debug, Serialize, Tabled)]
pub struct FamilyRow {
    #[tabled(rename = "Instance")]
    pub instance_type: String,
    #[tabled(rename = "Family")]
    pub family: String,
    #[tabled(rename = "vCPU (est)")]
    pub vcpus: u32,
    #[tabled(rename = "Rate/vCPU")]
    #[serde(rename = "rate_per_vcpu")]
    pub rate: String,
    #[tabled(rename = "Predicted $/h")]
    #[serde(rename = "predicted_price")]
    pub predicted: String,
}

pub fn describe(instance_type: &str, cloud: CloudProvider) -> FamilyRow {
    // a single-zone prediction uses the neutral multiplier
    let predicted = predict_price(instance_type, cloud, 0, 1);
    FamilyRow {
        instance_type: instance_type.to_string(),
        family: extract_family(instance_type, cloud),
        vcpus: extract_vcpus(instance_type, cloud),
        rate: format_price(Some(base_rate_per_vcpu(instance_type, cloud))),
        predicted: format_price(Some(predicted.spot_price)),
    }
}

pub fn run(cloud: CloudProvider, instance_types: &[String], format: OutputFormat) -> Result<()> {
    let rows: Vec<FamilyRow> = instance_types.iter().map(|t| describe(t, cloud)).collect();
    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => print_table(rows),
    }
    Ok(())
}
