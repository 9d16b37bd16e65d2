//! Unified error type for EcoTrack.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Carbon Interface API error: {0}")]
    CarbonInterface(String),

    #[error("Carbon Intensity API error: {0}")]
    CarbonIntensity(String),

    #[error("OpenWeather API error: {0}")]
    OpenWeather(String),

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid emission entry: {0}")]
    InvalidEntry(String),

    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("{0}")]
    Other(String),
}
