//! EcoTrack: emission estimation and environmental lookups.
//!
//! Thin CLI over the estimation crate. Each subcommand runs one lookup
//! through the cached gateway and prints the result as JSON.

mod config;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use common::{ActivityRecord, EcoConfig, Error};
use estimation::{EmissionCalculator, ThirdPartyGateway};

/// EcoTrack emission estimator
#[derive(Parser)]
#[command(name = "ecotrack", about = "Carbon emission estimates and environmental data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate CO2e for one activity.
    Estimate {
        /// Activity type, e.g. car_km or electricity_kwh.
        #[arg(long)]
        activity: String,

        #[arg(long, allow_negative_numbers = true)]
        quantity: f64,

        /// Grid region id for electricity.
        #[arg(long)]
        region: Option<String>,

        /// When the activity happened (RFC 3339).
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },

    /// Current grid carbon intensity forecast (gCO2/kWh).
    Intensity {
        #[arg(long)]
        region: Option<String>,
    },

    /// Weather, air quality and grid intensity at a coordinate.
    Location {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[arg(long)]
        region: Option<String>,
    },

    /// Conditions for the predefined map locations.
    Map,

    /// Places around a coordinate with their air quality.
    Nearby {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        #[arg(long)]
        count: Option<u32>,
    },

    /// Load and validate configuration, then exit.
    CheckConfig,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp: {e}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn config_summary(config: &EcoConfig) -> serde_json::Value {
    json!({
        "request_timeout_ms": config.request_timeout_ms,
        "carbon_interface": {
            "enabled": config.carbon_interface.is_enabled(),
            "base_url": config.carbon_interface.base_url,
            "electricity_country": config.carbon_interface.electricity_country,
            "vehicle_model_configured": config.carbon_interface.vehicle_model().is_some(),
        },
        "carbon_intensity": {
            "base_url": config.carbon_intensity.base_url,
            "region": config.carbon_intensity.default_region(),
        },
        "openweather": {
            "enabled": config.openweather.is_enabled(),
            "base_url": config.openweather.base_url,
            "city": config.openweather.city,
        },
    })
}

async fn run(command: Command, config: EcoConfig) -> Result<(), Error> {
    if let Command::CheckConfig = command {
        return print_json(&config_summary(&config));
    }

    let gateway = Arc::new(ThirdPartyGateway::from_config(&config)?);
    let calculator = EmissionCalculator::new(gateway.clone());

    match command {
        Command::Estimate {
            activity,
            quantity,
            region,
            at,
        } => {
            let mut record = ActivityRecord::new(activity, quantity);
            record.occurred_at = at;
            if let Some(region) = region {
                record = record.in_region(region);
            }
            let estimate = calculator.calculate_emission(&record).await;
            info!(
                "{} x {} -> {} kg ({})",
                record.activity_type, quantity, estimate.emission_kg, estimate.method
            );
            print_json(&json!({
                "activity_type": record.activity_type,
                "quantity": quantity,
                "emission_kg": estimate.emission_kg,
                "method": estimate.method,
            }))
        }
        Command::Intensity { region } => {
            let intensity = gateway.get_grid_intensity(region.as_deref()).await;
            print_json(&json!({
                "region": region,
                "intensity_g_per_kwh": intensity,
                "timestamp": Utc::now(),
            }))
        }
        Command::Location { lat, lon, region } => {
            let conditions = gateway
                .location_conditions(lat, lon, region.as_deref())
                .await?;
            print_json(&conditions)
        }
        Command::Map => print_json(&gateway.map_overview().await),
        Command::Nearby { lat, lon, count } => {
            print_json(&gateway.nearby_conditions(lat, lon, count).await?)
        }
        Command::CheckConfig => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ecotrack=info,estimation=info,carbon_interface_client=info,\
                 carbon_intensity_client=info,openweather_client=info"
                    .into()
            }),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
