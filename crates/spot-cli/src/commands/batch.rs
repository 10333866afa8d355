//! Batch price analysis command

use anyhow::{bail, Result};
use spot_engine::{CloudProvider, SpotAdvisor};
use tabled::Tabled;

use crate::output::{format_price, print_error, print_info, print_json, print_table, OutputFormat};

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Instance")]
    instance_type: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Volatility")]
    volatility: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Samples")]
    samples: u32,
}

pub async fn run(
    advisor: &SpotAdvisor,
    cloud: CloudProvider,
    instance_types: &[String],
    format: OutputFormat,
) -> Result<()> {
    let response = advisor.batch_prices(cloud, instance_types).await;
    let Some(result) = response.result else {
        bail!(response.error.unwrap_or_else(|| "batch price analysis failed".to_string()));
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let mut names: Vec<&String> = result.analyses.keys().collect();
            names.sort();
            let rows = names
                .into_iter()
                .filter_map(|name| result.analyses.get(name).map(|a| (name, a)))
                .map(|(name, a)| PriceRow {
                    instance_type: name.clone(),
                    current: format_price(Some(a.current_price)),
                    avg: format_price(Some(a.avg_price)),
                    min: format_price(Some(a.min_price)),
                    max: format_price(Some(a.max_price)),
                    volatility: format!("{:.1}%", a.volatility * 100.0),
                    trend: match a.trend_slope {
                        s if s > 0.0 => "rising".to_string(),
                        s if s < 0.0 => "falling".to_string(),
                        _ => "flat".to_string(),
                    },
                    samples: a.data_points,
                })
                .collect::<Vec<_>>();

            if !rows.is_empty() {
                print_table(rows);
            }
            for failure in &result.failed {
                print_error(&format!("{}: {}", failure.instance_type, failure.error));
            }
            print_info(&format!(
                "{} analyzed, {} failed in {}ms",
                result.analyses.len(),
                result.failed.len(),
                result.elapsed.as_millis()
            ));
        }
    }

    Ok(())
}
