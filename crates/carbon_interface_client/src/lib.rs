//! Carbon Interface API client.
//!
//! Posts per-activity estimate requests to `/estimates` and extracts the
//! `carbon_kg` figure. Only electricity and vehicle estimates are mapped.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use common::config::CarbonInterfaceConfig;
use common::{ActivityType, Error};
use serde::Serialize;
use tracing::debug;

/// Carbon Interface API client.
#[derive(Debug, Clone)]
pub struct CarbonInterfaceClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Activity-specific part of an estimate request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatePayload {
    Electricity {
        electricity_unit: &'static str,
        electricity_value: f64,
        country: String,
    },
    Vehicle {
        distance_unit: &'static str,
        distance_value: f64,
        vehicle_model_id: String,
    },
}

/// Body of `POST /estimates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRequest {
    #[serde(flatten)]
    pub payload: EstimatePayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_time: Option<String>,
}

impl EstimateRequest {
    /// Map an activity to a request, or `None` when the provider has no
    /// matching estimate type (or a car estimate lacks a vehicle model).
    pub fn for_activity(
        activity: &ActivityType,
        quantity: f64,
        occurred_at: Option<DateTime<Utc>>,
        config: &CarbonInterfaceConfig,
    ) -> Option<Self> {
        let payload = match activity {
            ActivityType::ElectricityKwh => EstimatePayload::Electricity {
                electricity_unit: "kwh",
                electricity_value: quantity,
                country: config.electricity_country.clone(),
            },
            ActivityType::CarKm => EstimatePayload::Vehicle {
                distance_unit: "km",
                distance_value: quantity,
                vehicle_model_id: config.vehicle_model()?.to_string(),
            },
            _ => return None,
        };

        Some(Self {
            payload,
            measurement_time: occurred_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        })
    }
}

impl CarbonInterfaceClient {
    pub fn new(config: &CarbonInterfaceConfig, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent("EcoTrack/1.0")
            .pool_max_idle_per_host(4)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build Carbon Interface client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
        })
    }

    /// Request an estimate. `Ok(None)` means the provider answered without a
    /// numeric `carbon_kg`.
    pub async fn estimate(&self, request: &EstimateRequest) -> Result<Option<f64>, Error> {
        let url = format!("{}/estimates", self.base_url);

        debug!("Posting Carbon Interface estimate: {} {:?}", url, request.payload);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::CarbonInterface(format!("HTTP error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::CarbonInterface(format!(
                "Carbon Interface returned {}: {}",
                status.as_u16(),
                body.chars().take(500).collect::<String>()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::CarbonInterface(format!("JSON parse error: {e}")))?;

        Ok(extract_carbon_kg(&body))
    }
}

/// Pull `data.attributes.carbon_kg` out of an estimate response.
pub fn extract_carbon_kg(body: &serde_json::Value) -> Option<f64> {
    body.pointer("/data/attributes/carbon_kg")
        .and_then(serde_json::Value::as_f64)
}
