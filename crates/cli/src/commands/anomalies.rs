//! Anomaly result CLI commands

use anyhow::Result;
use colored::Colorize;
use detector_lib::{AnomalyDetectionResult, AnomalyScore, AnomalySummary, Severity};
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_severity, format_score, format_timestamp_ms, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

/// Row for the per-host table
#[derive(Tabled)]
struct HostRow {
    #[tabled(rename = "Host ID")]
    host_id: String,
    #[tabled(rename = "Host")]
    host_name: String,
    #[tabled(rename = "Score")]
    total_score: String,
    #[tabled(rename = "Anomalies")]
    anomalies: usize,
    #[tabled(rename = "Worst")]
    worst: String,
}

impl From<&AnomalyDetectionResult> for HostRow {
    fn from(r: &AnomalyDetectionResult) -> Self {
        Self {
            host_id: r.host_id.clone(),
            host_name: r.host_name.clone(),
            total_score: format_score(r.total_score),
            anomalies: r.anomalies.len(),
            worst: color_severity(r.worst_severity()),
        }
    }
}

/// Row for anomaly detail tables
#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Z")]
    z_score: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<&AnomalyScore> for AnomalyRow {
    fn from(a: &AnomalyScore) -> Self {
        Self {
            host: a.host_name.clone(),
            item: a.item_key.clone(),
            current: format!("{:.2}", a.current_value),
            expected: format!("{:.2}", a.expected_value),
            z_score: format!("{:+.2}", a.z_score),
            score: format_score(a.anomaly_score),
            severity: color_severity(a.severity),
            reason: a.reason.clone(),
        }
    }
}

fn print_counts(summary: &AnomalySummary) {
    println!(
        "Hosts:     {} ({} with anomalies)",
        summary.total_hosts, summary.hosts_with_anomalies
    );
    println!(
        "Anomalies: {} {}  {} {}  {} {}  {} {}",
        summary.critical_count,
        color_severity(Severity::Critical),
        summary.high_count,
        color_severity(Severity::High),
        summary.medium_count,
        color_severity(Severity::Medium),
        summary.low_count,
        color_severity(Severity::Low),
    );
}

/// Show the fleet summary and top anomalies
pub async fn show_summary(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary = client.summary().await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            println!("{}", "Fleet Anomaly Summary".bold());
            println!("{}", "=".repeat(60));
            println!("As of:     {}", format_timestamp_ms(summary.timestamp));
            print_counts(&summary);
            println!();

            if summary.top_anomalies.is_empty() {
                print_success("No anomalies detected");
                return Ok(());
            }

            println!("{}", "Top Anomalies".bold());
            print_table(summary.top_anomalies.iter().map(AnomalyRow::from).collect());
        }
    }

    Ok(())
}

/// List per-host results
pub async fn list_hosts(client: &ApiClient, anomalous_only: bool, format: OutputFormat) -> Result<()> {
    let mut results = client.anomalies().await?;
    if anomalous_only {
        results.retain(|r| !r.anomalies.is_empty());
    }

    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Table => {
            println!("{}", "Host Results".bold());
            print_table(results.iter().map(HostRow::from).collect());
            println!("\nTotal: {} hosts", results.len());
        }
    }

    Ok(())
}

/// Show one host's result
pub async fn show_host(client: &ApiClient, host_id: &str, format: OutputFormat) -> Result<()> {
    let result = client.host(host_id).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Host Detection Result".bold());
            println!("{}", "=".repeat(60));
            println!("Host:        {} ({})", result.host_name.cyan(), result.host_id);
            println!("Total score: {}", format_score(result.total_score));
            println!("Worst:       {}", color_severity(result.worst_severity()));
            println!("Detected at: {}", format_timestamp_ms(result.timestamp));
            println!();

            if result.anomalies.is_empty() {
                print_success("All monitored metrics within baseline");
                return Ok(());
            }
            print_table(result.anomalies.iter().map(AnomalyRow::from).collect());
        }
    }

    Ok(())
}

/// Trigger a detection cycle on the service
pub async fn run_detection(client: &ApiClient, format: OutputFormat) -> Result<()> {
    print_info("Running detection cycle...");
    let report = client.detect().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Detection completed for {} hosts",
                report.summary.total_hosts
            ));
            print_counts(&report.summary);
            if report.summary.critical_count > 0 {
                print_warning("Critical anomalies present, see `anomalyctl summary`");
            }
        }
    }

    Ok(())
}
