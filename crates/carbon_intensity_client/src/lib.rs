//! Carbon Intensity API client (GB National Grid).
//!
//! Reads the forecast grid intensity in gCO2/kWh, either for a single
//! region (`/regional/regionid/{id}`) or the national aggregate
//! (`/intensity`).

use std::time::Duration;

use common::config::CarbonIntensityConfig;
use common::Error;
use tracing::debug;

/// Carbon Intensity API client.
#[derive(Debug, Clone)]
pub struct CarbonIntensityClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl CarbonIntensityClient {
    pub fn new(config: &CarbonIntensityConfig, timeout: Duration) -> Result<Self, Error> {
        let base_url = reqwest::Url::parse(config.base_url.trim())
            .map_err(|e| Error::Config(format!("invalid carbon intensity base URL: {e}")))?;

        let client = reqwest::Client::builder()
            .user_agent("EcoTrack/1.0")
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build Carbon Intensity client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Build the endpoint URL; `None` selects the national endpoint.
    pub fn endpoint(&self, region: Option<&str>) -> Result<reqwest::Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config("carbon intensity base URL cannot be a base".into()))?;
            segments.pop_if_empty();
            match region {
                Some(id) => {
                    segments.extend(["regional", "regionid", id]);
                }
                None => {
                    segments.push("intensity");
                }
            }
        }
        Ok(url)
    }

    /// Fetch the current forecast intensity. `Ok(None)` means the response
    /// did not carry a numeric forecast.
    pub async fn forecast(&self, region: Option<&str>) -> Result<Option<f64>, Error> {
        let url = self.endpoint(region)?;

        debug!("Fetching grid carbon intensity: {}", url);

        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::CarbonIntensity(format!("HTTP error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::CarbonIntensity(format!(
                "Carbon Intensity returned {}: {}",
                status.as_u16(),
                body.chars().take(500).collect::<String>()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::CarbonIntensity(format!("JSON parse error: {e}")))?;

        Ok(match region {
            Some(_) => extract_regional_forecast(&body),
            None => extract_national_forecast(&body),
        })
    }
}

/// `data[0].data[0].intensity.forecast` of a regional response.
pub fn extract_regional_forecast(body: &serde_json::Value) -> Option<f64> {
    body.pointer("/data/0/data/0/intensity/forecast")
        .and_then(serde_json::Value::as_f64)
}

/// `data[0].intensity.forecast` of a national response.
pub fn extract_national_forecast(body: &serde_json::Value) -> Option<f64> {
    body.pointer("/data/0/intensity/forecast")
        .and_then(serde_json::Value::as_f64)
}
