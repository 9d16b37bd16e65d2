//! Domain types shared across EcoTrack.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ── Activities ────────────────────────────────────────────────────────

/// A loggable behaviour that converts to an emission estimate.
///
/// Names outside the known set are kept as [`ActivityType::Other`] so the
/// calculator can report them as `unknown_type` instead of rejecting them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    CarKm,
    PublicTransportKm,
    ElectricityKwh,
    MeatMeals,
    PlasticItems,
    Other(String),
}

impl ActivityType {
    /// Every activity the application knows how to log.
    pub const KNOWN: [ActivityType; 5] = [
        ActivityType::CarKm,
        ActivityType::PublicTransportKm,
        ActivityType::ElectricityKwh,
        ActivityType::MeatMeals,
        ActivityType::PlasticItems,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::CarKm => "car_km",
            ActivityType::PublicTransportKm => "public_transport_km",
            ActivityType::ElectricityKwh => "electricity_kwh",
            ActivityType::MeatMeals => "meat_meals",
            ActivityType::PlasticItems => "plastic_items",
            ActivityType::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ActivityType::Other(_))
    }
}

impl From<&str> for ActivityType {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "car_km" => ActivityType::CarKm,
            "public_transport_km" => ActivityType::PublicTransportKm,
            "electricity_kwh" => ActivityType::ElectricityKwh,
            "meat_meals" => ActivityType::MeatMeals,
            "plastic_items" => ActivityType::PlasticItems,
            other => ActivityType::Other(other.to_string()),
        }
    }
}

impl From<String> for ActivityType {
    fn from(raw: String) -> Self {
        ActivityType::from(raw.as_str())
    }
}

impl From<ActivityType> for String {
    fn from(activity: ActivityType) -> Self {
        match activity {
            ActivityType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ActivityType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ActivityType::from(s))
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the emission calculator. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub activity_type: ActivityType,
    pub quantity: f64,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub region: Option<String>,
}

impl ActivityRecord {
    pub fn new(activity_type: impl Into<ActivityType>, quantity: f64) -> Self {
        Self {
            activity_type: activity_type.into(),
            quantity,
            occurred_at: None,
            region: None,
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

// ── Estimates ─────────────────────────────────────────────────────────

/// Which step of the fallback chain produced an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    ProviderEstimate,
    GridIntensity,
    LocalFactor,
    InvalidInput,
    UnknownType,
}

impl CalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::ProviderEstimate => "provider_estimate",
            CalculationMethod::GridIntensity => "grid_intensity",
            CalculationMethod::LocalFactor => "local_factor",
            CalculationMethod::InvalidInput => "invalid_input",
            CalculationMethod::UnknownType => "unknown_type",
        }
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CO2e mass in kilograms (3 decimals) and the method that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionEstimate {
    pub emission_kg: f64,
    pub method: CalculationMethod,
}

impl EmissionEstimate {
    pub fn new(emission_kg: f64, method: CalculationMethod) -> Self {
        Self {
            emission_kg,
            method,
        }
    }
}

// ── Environmental conditions ──────────────────────────────────────────

/// Current weather at a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub temp_c: f64,
    #[serde(default)]
    pub humidity: Option<f64>,
    pub condition: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub wind_speed_ms: Option<f64>,
}

/// Pollutant concentrations in μg/m³.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollutantComponents {
    #[serde(default)]
    pub co: Option<f64>,
    #[serde(default)]
    pub no2: Option<f64>,
    #[serde(default)]
    pub o3: Option<f64>,
    #[serde(default)]
    pub so2: Option<f64>,
    #[serde(default)]
    pub pm2_5: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
}

/// Air quality index (1 = good .. 5 = very poor) with components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub aqi: u8,
    #[serde(default)]
    pub components: PollutantComponents,
}

impl AirQuality {
    pub fn label(&self) -> &'static str {
        match self.aqi {
            1 => "Good",
            2 => "Fair",
            3 => "Moderate",
            4 => "Poor",
            5 => "Very Poor",
            _ => "Unknown",
        }
    }
}

/// A populated place near a coordinate, with its weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub weather: WeatherSnapshot,
}
