//! Host Anomaly Detector CLI
//!
//! A command-line tool for querying anomaly results, forecasting resource
//! exhaustion and checking the health of the detector service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{anomalies, predictions, status};
use detector_lib::DEFAULT_RISK_THRESHOLD;

/// Host Anomaly Detector CLI
#[derive(Parser)]
#[command(name = "anomalyctl")]
#[command(author, version, about = "CLI for the Host Anomaly Detector", long_about = None)]
pub struct Cli {
    /// API endpoint URL (falls back to the config file, then http://localhost:8080)
    #[arg(long, env = "ANOMALY_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show fleet anomaly counts and the top anomalies
    Summary,

    /// List per-host detection results
    Hosts {
        /// Only show hosts with at least one anomaly
        #[arg(long)]
        anomalous_only: bool,
    },

    /// Show the detection result for one host
    Host {
        /// Host ID
        host_id: String,
    },

    /// Forecast resource exhaustion on a host over the next 24 hours
    Predict {
        /// Host ID
        host_id: String,

        /// Utilization percentage considered at risk
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Run a detection cycle now
    Detect,

    /// Show detector health and readiness
    Health,

    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the stored configuration
    Show,

    /// Store the default API URL
    SetApiUrl {
        /// Detector service URL
        url: String,
    },

    /// Store the default prediction threshold
    SetThreshold {
        /// Utilization percentage (0-100)
        threshold: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    if let Commands::Config(ref config_cmd) = cli.command {
        return match config_cmd {
            ConfigCommands::Show => status::show_config(&config, cli.format),
            ConfigCommands::SetApiUrl { url } => status::set_api_url(config, url),
            ConfigCommands::SetThreshold { threshold } => status::set_threshold(config, *threshold),
        };
    }

    // Initialize client
    let api_url = config.resolve_api_url(cli.api_url.as_deref());
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Summary => anomalies::show_summary(&client, cli.format).await?,
        Commands::Hosts { anomalous_only } => {
            anomalies::list_hosts(&client, anomalous_only, cli.format).await?
        }
        Commands::Host { host_id } => anomalies::show_host(&client, &host_id, cli.format).await?,
        Commands::Predict { host_id, threshold } => {
            let threshold = threshold
                .or(config.default_threshold)
                .unwrap_or(DEFAULT_RISK_THRESHOLD);
            predictions::show_predictions(&client, &host_id, threshold, cli.format).await?
        }
        Commands::Detect => anomalies::run_detection(&client, cli.format).await?,
        Commands::Health => status::show_health(&client, cli.format).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
