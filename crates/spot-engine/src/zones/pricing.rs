//! Per-zone price gathering and the prediction fallback
//!
//! Observed prices always win. Zones without an observed sample get a
//! heuristic prediction built from a per-vCPU base rate for the instance
//! family, flagged as predicted.

use crate::family::extract_family;
use crate::models::CloudProvider;
use crate::providers::{PriceAnalysis, ZoneInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// On-demand price estimated as a multiple of the spot price
pub const ON_DEMAND_MULTIPLIER: f64 = 3.0;

/// Volatility assumed for predicted prices
pub const PREDICTED_VOLATILITY: f64 = 0.15;

const FIRST_ZONE_MULTIPLIER: f64 = 1.05;
const LAST_ZONE_MULTIPLIER: f64 = 0.95;

const DEFAULT_VCPUS: u32 = 2;
const METAL_VCPUS: u32 = 96;

/// Price facts for one zone, observed or predicted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonePriceData {
    pub spot_price: f64,
    pub on_demand_price: f64,
    pub volatility: f64,
    pub predicted: bool,
    pub data_points: u32,
}

impl ZonePriceData {
    fn observed(price: f64, volatility: f64, data_points: u32) -> Self {
        Self {
            spot_price: price,
            on_demand_price: price * ON_DEMAND_MULTIPLIER,
            volatility,
            predicted: false,
            data_points,
        }
    }
}

/// Three-zone topology used when zone availability is unknown
pub fn default_zones(cloud: CloudProvider, region: &str) -> Vec<ZoneInfo> {
    let names: [String; 3] = match cloud {
        CloudProvider::Aws => [
            format!("{}a", region),
            format!("{}b", region),
            format!("{}c", region),
        ],
        CloudProvider::Azure => [
            format!("{}-1", region),
            format!("{}-2", region),
            format!("{}-3", region),
        ],
        CloudProvider::Gcp => [
            format!("{}-a", region),
            format!("{}-b", region),
            format!("{}-c", region),
        ],
    };
    names.into_iter().map(ZoneInfo::open).collect()
}

/// Best-effort vCPU count derived from the instance type name
pub fn extract_vcpus(instance_type: &str, cloud: CloudProvider) -> u32 {
    let name = instance_type.to_ascii_lowercase();
    let parsed = match cloud {
        CloudProvider::Aws => aws_size_vcpus(&name),
        CloudProvider::Azure => {
            let series = name.strip_prefix("standard_").unwrap_or(&name);
            leading_number(series.trim_start_matches(|c: char| c.is_ascii_alphabetic()))
        }
        CloudProvider::Gcp => name.rsplit('-').next().and_then(|last| last.parse().ok()),
    };
    parsed.filter(|n| *n > 0).unwrap_or(DEFAULT_VCPUS)
}

fn aws_size_vcpus(name: &str) -> Option<u32> {
    let size = name.split_once('.').map(|(_, size)| size).unwrap_or(name);
    if size.contains("metal") {
        return Some(METAL_VCPUS);
    }
    match size {
        "nano" | "micro" | "small" | "medium" => Some(1),
        "large" => Some(2),
        "xlarge" => Some(4),
        _ => size
            .strip_suffix("xlarge")
            .and_then(|n| n.parse::<u32>().ok())
            .map(|n| n * 4),
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

/// Heuristic spot price per vCPU-hour for the instance family
pub fn base_rate_per_vcpu(instance_type: &str, cloud: CloudProvider) -> f64 {
    let family = extract_family(instance_type, cloud).to_ascii_lowercase();
    let starts = |prefixes: &[&str]| prefixes.iter().any(|p| family.starts_with(p));

    match cloud {
        CloudProvider::Aws => {
            if starts(&["p", "g", "inf", "dl", "trn"]) {
                0.12
            } else if starts(&["r", "x", "u", "z"]) {
                0.025
            } else if starts(&["c"]) {
                0.012
            } else if starts(&["i", "d", "h"]) {
                0.02
            } else {
                0.008
            }
        }
        CloudProvider::Azure => {
            if starts(&["nc", "nd", "nv"]) {
                0.15
            } else if starts(&["m"]) {
                0.03
            } else if starts(&["f"]) {
                0.015
            } else if starts(&["l"]) {
                0.025
            } else {
                0.01
            }
        }
        CloudProvider::Gcp => match family.as_str() {
            "a2" | "a3" | "g2" => 0.10,
            "m1" | "m2" | "m3" => 0.02,
            "c2" | "c2d" | "c3" | "h3" => 0.011,
            "z3" => 0.02,
            _ => 0.009,
        },
    }
}

/// Position multiplier: the first zone is nudged up, the last one down
fn zone_multiplier(position: usize, zone_count: usize) -> f64 {
    if zone_count < 2 {
        1.0
    } else if position == 0 {
        FIRST_ZONE_MULTIPLIER
    } else if position == zone_count - 1 {
        LAST_ZONE_MULTIPLIER
    } else {
        1.0
    }
}

/// Predict a zone price from the instance name alone
pub fn predict_price(
    instance_type: &str,
    cloud: CloudProvider,
    position: usize,
    zone_count: usize,
) -> ZonePriceData {
    let base = base_rate_per_vcpu(instance_type, cloud) * f64::from(extract_vcpus(instance_type, cloud));
    let spot_price = base * zone_multiplier(position, zone_count);
    ZonePriceData {
        spot_price,
        on_demand_price: spot_price * ON_DEMAND_MULTIPLIER,
        volatility: PREDICTED_VOLATILITY,
        predicted: true,
        data_points: 0,
    }
}

/// Observed prices from a price analysis: per-zone figures when present,
/// otherwise the regional average for every zone
pub fn observed_prices(analysis: &PriceAnalysis, zones: &[ZoneInfo]) -> HashMap<String, ZonePriceData> {
    if !analysis.per_zone.is_empty() {
        return analysis
            .per_zone
            .iter()
            .map(|(zone, stats)| {
                (
                    zone.clone(),
                    ZonePriceData::observed(stats.avg_price, stats.volatility, stats.data_points),
                )
            })
            .collect();
    }

    zones
        .iter()
        .map(|z| {
            (
                z.zone.clone(),
                ZonePriceData::observed(analysis.avg_price, analysis.volatility, analysis.data_points),
            )
        })
        .collect()
}

/// Predict prices for zones without a sample. Existing entries are never
/// replaced. Returns the number of zones that were predicted.
pub fn fill_predictions(
    prices: &mut HashMap<String, ZonePriceData>,
    zones: &[ZoneInfo],
    instance_type: &str,
    cloud: CloudProvider,
) -> usize {
    let mut predicted = 0;
    for (position, zone) in zones.iter().enumerate() {
        prices.entry(zone.zone.clone()).or_insert_with(|| {
            predicted += 1;
            let data = predict_price(instance_type, cloud, position, zones.len());
            debug!(
                instance_type = %instance_type,
                zone = %zone.zone,
                price = data.spot_price,
                "Predicted zone price"
            );
            data
        });
    }
    predicted
}
