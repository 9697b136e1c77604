//! Service health and CLI configuration commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{
    color_status, print_error, print_info, print_json, print_success, print_table, OutputFormat,
};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show service health and readiness
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (_, health) = client.health().await?;
    let (_, readiness) = client.readiness().await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "health": health,
            "readiness": readiness,
        }))?,
        OutputFormat::Table => {
            println!("{}", "Detector Health".bold());
            println!("{}", "=".repeat(50));
            println!("Status: {}", color_status(health.status.as_str()));
            match (readiness.ready, readiness.reason.as_deref()) {
                (true, _) => println!("Ready:  {}", color_status("ready")),
                (false, reason) => println!(
                    "Ready:  {} {}",
                    color_status("not ready"),
                    reason.unwrap_or_default()
                ),
            }
            println!();

            let mut rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(c.status.as_str()),
                    message: c.message.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            print_table(rows);
        }
    }

    if !readiness.ready {
        print_error("Service is not ready");
    }
    Ok(())
}

/// Show the stored CLI configuration
pub fn show_config(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            println!("{}", "anomalyctl Configuration".bold());
            println!("{}", "=".repeat(50));
            println!("Path:              {}", Config::config_path()?.display());
            println!(
                "API URL:           {}",
                config.api_url.as_deref().unwrap_or("(default)")
            );
            match config.default_threshold {
                Some(t) => println!("Default threshold: {:.0}%", t),
                None => println!("Default threshold: (default)"),
            }
        }
    }
    Ok(())
}

/// Persist the API URL used when no flag or env var is given
pub fn set_api_url(mut config: Config, url: &str) -> Result<()> {
    url::Url::parse(url)?;
    config.api_url = Some(url.to_string());
    let path = config.save()?;
    print_success(&format!("API URL set to {}", url));
    print_info(&format!("Saved to {}", path.display()));
    Ok(())
}

/// Persist the default `predict` threshold
pub fn set_threshold(mut config: Config, threshold: f64) -> Result<()> {
    anyhow::ensure!(
        (0.0..=100.0).contains(&threshold),
        "Threshold must be between 0 and 100"
    );
    config.default_threshold = Some(threshold);
    let path = config.save()?;
    print_success(&format!("Default threshold set to {:.0}%", threshold));
    print_info(&format!("Saved to {}", path.display()));
    Ok(())
}
