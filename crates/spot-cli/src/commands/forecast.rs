//! Spot price forecast command

use anyhow::{bail, Result};
use spot_engine::{CloudProvider, PriceForecast, SpotAdvisor};
use tabled::Tabled;

use crate::output::{
    color_confidence, format_price, format_timestamp, print_info, print_json, print_table, print_warning,
    OutputFormat,
};

#[derive(Tabled)]
struct HorizonRow {
    #[tabled(rename = "Horizon")]
    horizon: &'static str,
    #[tabled(rename = "Spot $/h")]
    price: String,
}

fn horizon_rows(forecast: &PriceForecast) -> Vec<HorizonRow> {
    vec![
        HorizonRow {
            horizon: "now",
            price: format_price(forecast.current_price),
        },
        HorizonRow {
            horizon: "+1h",
            price: format_price(forecast.predicted_price_1h),
        },
        HorizonRow {
            horizon: "+6h",
            price: format_price(forecast.predicted_price_6h),
        },
        HorizonRow {
            horizon: "+24h",
            price: format_price(forecast.predicted_price_24h),
        },
    ]
}

pub async fn run(
    advisor: &SpotAdvisor,
    cloud: CloudProvider,
    region: Option<&str>,
    instance_type: &str,
    format: OutputFormat,
) -> Result<()> {
    let response = advisor
        .forecast_price(cloud, region.unwrap_or_default(), instance_type)
        .await;

    let Some(forecast) = response.result else {
        bail!(response.error.unwrap_or_else(|| "price forecast failed".to_string()));
    };

    match format {
        OutputFormat::Json => print_json(&forecast)?,
        OutputFormat::Table => {
            print_info(&format!(
                "{} in {} ({})",
                forecast.instance_type,
                forecast.region,
                format_timestamp(&forecast.generated_at)
            ));
            if forecast.current_price.is_none() {
                print_warning("No price history available; forecast is a placeholder");
            }
            print_table(horizon_rows(&forecast));
            println!(
                "\nTrend: {}  Volatility risk: {}",
                forecast.trend_direction, forecast.volatility_risk
            );
            match forecast.optimal_launch_window {
                Some(window) => println!("Cheapest launch window: {}", window),
                None => println!("Cheapest launch window: insufficient data"),
            }
            println!("Confidence: {}", color_confidence(forecast.confidence));
        }
    }

    Ok(())
}
