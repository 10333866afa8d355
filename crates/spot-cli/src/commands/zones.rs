//! Availability zone recommendation command

use anyhow::{bail, Result};
use spot_engine::{CloudProvider, SmartAZRank, SpotAdvisor, WeightPreset};
use tabled::Tabled;

use crate::output::{
    color_confidence, color_zone_score, format_price, print_info, print_json, print_success, print_table,
    OutputFormat,
};

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Capacity")]
    capacity: String,
    #[tabled(rename = "Spot $/h")]
    spot_price: String,
    #[tabled(rename = "Volatility")]
    volatility: String,
    #[tabled(rename = "Interruption")]
    interruption: String,
}

impl From<&SmartAZRank> for ZoneRow {
    fn from(r: &SmartAZRank) -> Self {
        let mut spot_price = format_price(Some(r.spot_price));
        if r.price_predicted {
            spot_price.push_str(" (est)");
        }
        Self {
            rank: r.rank,
            zone: r.zone.clone(),
            score: color_zone_score(r.combined_score),
            capacity: format!("{:.0}", r.capacity_score),
            spot_price,
            volatility: format!("{:.1}%", r.volatility * 100.0),
            interruption: format!("{:.1}%", r.interruption_rate),
        }
    }
}

pub async fn run(
    advisor: &SpotAdvisor,
    cloud: CloudProvider,
    region: Option<&str>,
    instance_type: &str,
    preset: Option<WeightPreset>,
    format: OutputFormat,
) -> Result<()> {
    let weights = preset.map(|p| p.weights());
    let response = advisor
        .recommend_az(cloud, region.unwrap_or_default(), instance_type, weights)
        .await;

    let Some(result) = response.result else {
        bail!(response.error.unwrap_or_else(|| "zone recommendation failed".to_string()));
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_table(result.rankings.iter().map(ZoneRow::from).collect());
            if let Some(best) = &result.best_az {
                print_success(&format!("Best zone for {}: {}", result.instance_type, best));
            }
            for insight in &result.insights {
                print_info(insight);
            }
            println!(
                "\nConfidence: {} (sources: {})",
                color_confidence(result.confidence),
                result.data_sources.join(", ")
            );
        }
    }

    Ok(())
}
