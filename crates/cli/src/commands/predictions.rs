//! Resource exhaustion prediction command

use anyhow::Result;
use colored::Colorize;
use detector_lib::TrendPrediction;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_risk, print_json, print_success, print_table, OutputFormat};

#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "In 24h")]
    predicted: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&TrendPrediction> for PredictionRow {
    fn from(p: &TrendPrediction) -> Self {
        Self {
            item: p.item_key.clone(),
            current: format!("{:.1}%", p.current_value),
            trend: p.trend.to_string(),
            predicted: format!("{:.1}%", p.predicted_value_24h),
            risk: color_risk(p.risk),
            reason: p.reason.clone(),
        }
    }
}

/// Show utilization metrics at risk of exhaustion on a host
pub async fn show_predictions(
    client: &ApiClient,
    host_id: &str,
    threshold: f64,
    format: OutputFormat,
) -> Result<()> {
    let predictions = client.predictions(host_id, threshold).await?;

    match format {
        OutputFormat::Json => print_json(&predictions)?,
        OutputFormat::Table => {
            println!("{}", "Resource Exhaustion Forecast".bold());
            println!("{}", "=".repeat(60));
            println!("Host:      {}", host_id.cyan());
            println!("Threshold: {:.0}%", threshold);
            println!();

            if predictions.is_empty() {
                print_success("No utilization metrics at risk");
                return Ok(());
            }
            print_table(predictions.iter().map(PredictionRow::from).collect());
        }
    }

    Ok(())
}
