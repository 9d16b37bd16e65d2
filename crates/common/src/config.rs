//! EcoTrack configuration types.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcoConfig {
    /// Bound applied to every outbound provider request (milliseconds).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub carbon_interface: CarbonInterfaceConfig,

    #[serde(default)]
    pub carbon_intensity: CarbonIntensityConfig,

    #[serde(default)]
    pub openweather: OpenWeatherConfig,
}

/// Per-activity carbon estimate provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonInterfaceConfig {
    /// Bearer token. Empty disables provider estimates.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_carbon_interface_url")]
    pub base_url: String,

    /// ISO country code sent with electricity estimates.
    #[serde(default = "default_electricity_country")]
    pub electricity_country: String,

    /// Vehicle model id. Car estimates are only requested when set.
    #[serde(default)]
    pub vehicle_model_id: String,
}

/// Grid carbon intensity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonIntensityConfig {
    #[serde(default = "default_carbon_intensity_url")]
    pub base_url: String,

    /// Default region id. Empty means the national aggregate.
    #[serde(default)]
    pub region: String,
}

/// Weather and air quality provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    /// Empty disables weather, air quality and nearby lookups.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_openweather_url")]
    pub base_url: String,

    /// City used for recommendation weather.
    #[serde(default = "default_city")]
    pub city: String,
}

impl EcoConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

impl CarbonInterfaceConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn vehicle_model(&self) -> Option<&str> {
        let id = self.vehicle_model_id.trim();
        (!id.is_empty()).then_some(id)
    }
}

impl CarbonIntensityConfig {
    pub fn default_region(&self) -> Option<&str> {
        let region = self.region.trim();
        (!region.is_empty()).then_some(region)
    }
}

impl OpenWeatherConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_carbon_interface_url() -> String {
    "https://www.carboninterface.com/api/v1".into()
}
fn default_electricity_country() -> String {
    "gb".into()
}

fn default_carbon_intensity_url() -> String {
    "https://api.carbonintensity.org.uk".into()
}

fn default_openweather_url() -> String {
    "https://api.openweathermap.org".into()
}
fn default_city() -> String {
    "Colombo".into()
}

impl Default for CarbonInterfaceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_carbon_interface_url(),
            electricity_country: default_electricity_country(),
            vehicle_model_id: String::new(),
        }
    }
}

impl Default for CarbonIntensityConfig {
    fn default() -> Self {
        Self {
            base_url: default_carbon_intensity_url(),
            region: String::new(),
        }
    }
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openweather_url(),
            city: default_city(),
        }
    }
}

impl Default for EcoConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            carbon_interface: CarbonInterfaceConfig::default(),
            carbon_intensity: CarbonIntensityConfig::default(),
            openweather: OpenWeatherConfig::default(),
        }
    }
}
