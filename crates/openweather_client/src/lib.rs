//! OpenWeather API client.
//!
//! Current weather (by coordinates or city), air pollution and the
//! `find` endpoint for places around a coordinate, converted to the shared
//! `WeatherSnapshot` / `AirQuality` / `NearbyPlace` types.

use std::time::Duration;

use common::config::OpenWeatherConfig;
use common::{AirQuality, Error, NearbyPlace, PollutantComponents, WeatherSnapshot};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// OpenWeather API client.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// ── OpenWeather response types ────────────────────────────────────────

/// Response from `/data/2.5/weather`, also the row shape of `/data/2.5/find`.
#[derive(Debug, Deserialize)]
pub struct CurrentWeatherResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub coord: Option<Coord>,
    #[serde(default)]
    pub main: Option<MainReadings>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    #[serde(default)]
    pub wind: Option<Wind>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct MainReadings {
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherCondition {
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Response from `/data/2.5/find`.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    #[serde(default)]
    pub list: Vec<CurrentWeatherResponse>,
}

/// Response from `/data/2.5/air_pollution`.
#[derive(Debug, Deserialize)]
pub struct AirPollutionResponse {
    #[serde(default)]
    pub list: Vec<AirPollutionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AirPollutionEntry {
    pub main: AqiReading,
    #[serde(default)]
    pub components: PollutantComponents,
}

#[derive(Debug, Deserialize)]
pub struct AqiReading {
    pub aqi: u8,
}

impl CurrentWeatherResponse {
    /// Convert to a snapshot; `None` without a temperature reading.
    pub fn into_snapshot(self) -> Option<WeatherSnapshot> {
        let main = self.main?;
        let temp_c = main.temp?;
        let (condition, description) = match self.weather.into_iter().next() {
            Some(w) if !w.main.is_empty() => (w.main, w.description),
            Some(w) => ("Unknown".to_string(), w.description),
            None => ("Unknown".to_string(), None),
        };

        Some(WeatherSnapshot {
            city: self.name,
            temp_c,
            humidity: main.humidity,
            condition,
            description,
            wind_speed_ms: self.wind.and_then(|w| w.speed),
        })
    }

    fn into_place(self) -> Option<NearbyPlace> {
        let coord = self.coord?;
        let name = self.name.clone();
        let weather = self.into_snapshot()?;
        Some(NearbyPlace {
            name,
            lat: coord.lat,
            lon: coord.lon,
            weather,
        })
    }
}

impl AirPollutionResponse {
    pub fn into_air_quality(self) -> Option<AirQuality> {
        let entry = self.list.into_iter().next()?;
        Some(AirQuality {
            aqi: entry.main.aqi,
            components: entry.components,
        })
    }
}

impl FindResponse {
    /// Places that carry coordinates and a temperature reading.
    pub fn into_places(self) -> Vec<NearbyPlace> {
        self.list
            .into_iter()
            .filter_map(CurrentWeatherResponse::into_place)
            .collect()
    }
}

// ── Implementation ────────────────────────────────────────────────────

impl OpenWeatherClient {
    pub fn new(config: &OpenWeatherConfig, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("EcoTrack/1.0")
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build OpenWeather client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&'static str, String)>,
    ) -> Result<T, Error> {
        let url = format!("{}{}", self.base_url, path);

        debug!("Fetching OpenWeather {} {:?}", url, query);

        query.push(("appid", self.api_key.clone()));

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .await
            // The query carries the API key; keep the URL out of error text.
            .map_err(|e| Error::OpenWeather(format!("HTTP error for {path}: {}", e.without_url())))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::OpenWeather(format!(
                "OpenWeather returned {} for {path}: {}",
                status.as_u16(),
                body.chars().take(500).collect::<String>()
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::OpenWeather(format!("JSON parse error for {path}: {}", e.without_url())))
    }

    /// Current weather at a coordinate, metric units.
    pub async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, Error> {
        let resp: CurrentWeatherResponse = self
            .get_json(
                "/data/2.5/weather",
                vec![
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("units", "metric".to_string()),
                ],
            )
            .await?;

        resp.into_snapshot()
            .ok_or_else(|| Error::OpenWeather(format!("No temperature reading for ({lat},{lon})")))
    }

    /// Current weather for a named city, metric units.
    pub async fn weather_for_city(&self, city: &str) -> Result<WeatherSnapshot, Error> {
        let resp: CurrentWeatherResponse = self
            .get_json(
                "/data/2.5/weather",
                vec![("q", city.to_string()), ("units", "metric".to_string())],
            )
            .await?;

        resp.into_snapshot()
            .ok_or_else(|| Error::OpenWeather(format!("No temperature reading for {city}")))
    }

    /// Current air pollution at a coordinate.
    pub async fn air_pollution(&self, lat: f64, lon: f64) -> Result<AirQuality, Error> {
        let resp: AirPollutionResponse = self
            .get_json(
                "/data/2.5/air_pollution",
                vec![("lat", lat.to_string()), ("lon", lon.to_string())],
            )
            .await?;

        resp.into_air_quality()
            .ok_or_else(|| Error::OpenWeather(format!("No air quality rows for ({lat},{lon})")))
    }

    /// Up to `count` places around a coordinate with their current weather.
    pub async fn nearby(&self, lat: f64, lon: f64, count: u32) -> Result<Vec<NearbyPlace>, Error> {
        let resp: FindResponse = self
            .get_json(
                "/data/2.5/find",
                vec![
                    ("lat", lat.to_string()),
                    ("lon", lon.to_string()),
                    ("cnt", count.to_string()),
                    ("units", "metric".to_string()),
                ],
            )
            .await?;

        let places = resp.into_places();
        debug!("Got {} nearby places for ({},{})", places.len(), lat, lon);
        Ok(places)
    }
}
