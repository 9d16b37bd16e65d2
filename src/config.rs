//! Configuration loader: merges .env, an optional ecotrack.toml and env vars.

use common::{EcoConfig, Error};
use std::path::Path;

const CONFIG_FILE: &str = "ecotrack.toml";

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn is_http_url(raw: &str) -> bool {
    let url = raw.trim();
    url.starts_with("https://") || url.starts_with("http://")
}

fn validate_config(config: &EcoConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.request_timeout_ms == 0 {
        issues.push("request_timeout_ms must be > 0".into());
    }

    for (name, url) in [
        ("carbon_interface.base_url", &config.carbon_interface.base_url),
        ("carbon_intensity.base_url", &config.carbon_intensity.base_url),
        ("openweather.base_url", &config.openweather.base_url),
    ] {
        if !is_http_url(url) {
            issues.push(format!("{name} must be an http(s) URL"));
        }
    }

    if config.carbon_interface.electricity_country.trim().is_empty() {
        issues.push("carbon_interface.electricity_country must not be empty".into());
    }
    if config.openweather.city.trim().is_empty() {
        issues.push("openweather.city must not be empty".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides, read through `var` so tests need not touch
/// the process environment.
fn apply_env_overrides(
    config: &mut EcoConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(raw) = var("REQUEST_TIMEOUT_MS") {
        config.request_timeout_ms = parse_positive_u64(&raw, "REQUEST_TIMEOUT_MS")?;
    }

    if let Some(key) = var("CARBON_INTERFACE_API_KEY") {
        config.carbon_interface.api_key = key.trim().to_string();
    }
    if let Some(url) = var("CARBON_INTERFACE_BASE_URL") {
        config.carbon_interface.base_url = url.trim().to_string();
    }
    if let Some(country) = var("CARBON_INTERFACE_ELECTRICITY_COUNTRY") {
        config.carbon_interface.electricity_country = country.trim().to_ascii_lowercase();
    }
    if let Some(model) = var("CARBON_INTERFACE_VEHICLE_MODEL_ID") {
        config.carbon_interface.vehicle_model_id = model.trim().to_string();
    }

    if let Some(url) = var("CARBON_INTENSITY_BASE_URL") {
        config.carbon_intensity.base_url = url.trim().to_string();
    }
    if let Some(region) = var("CARBON_INTENSITY_REGION") {
        config.carbon_intensity.region = region.trim().to_string();
    }

    if let Some(key) = var("OPENWEATHER_API_KEY") {
        config.openweather.api_key = key.trim().to_string();
    }
    if let Some(url) = var("OPENWEATHER_BASE_URL") {
        config.openweather.base_url = url.trim().to_string();
    }
    if let Some(city) = var("OPENWEATHER_CITY") {
        config.openweather.city = city.trim().to_string();
    }

    Ok(())
}

/// Load configuration from environment and optional config file.
///
/// Missing API keys are not an error; the matching provider is simply
/// skipped at lookup time.
pub fn load_config() -> Result<EcoConfig, Error> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let mut config = EcoConfig::default();

    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read {CONFIG_FILE}: {e}")))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {CONFIG_FILE}: {e}")))?;
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config)?;

    Ok(config)
}
