//! Third-party estimation gateway.
//!
//! Fronts the carbon estimate, grid intensity and weather providers. Every
//! lookup is bounded by the request timeout and resolves to `None` (or an
//! empty list) on any failure; provider errors are only logged.
//!
//! Grid intensity, weather, air quality and nearby places go through a
//! [`TtlCache`]. Provider estimates are per-quantity and are not cached.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carbon_interface_client::{CarbonInterfaceClient, EstimateRequest};
use carbon_intensity_client::CarbonIntensityClient;
use chrono::{DateTime, Utc};
use common::config::CarbonInterfaceConfig;
use common::{
    ActivityType, AirQuality, EcoConfig, Error, NearbyPlace, Result, WeatherSnapshot,
};
use openweather_client::OpenWeatherClient;
use tracing::{debug, warn};

use crate::cache::TtlCache;

/// Cache key for the national grid aggregate.
pub const NATIONAL_KEY: &str = "__national__";
/// Nearby places requested when the caller gives no count.
pub const DEFAULT_NEARBY_COUNT: u32 = 10;
/// Upper bound accepted by the `find` endpoint.
pub const MAX_NEARBY_COUNT: u32 = 50;

// ── Provider seams ────────────────────────────────────────────────────

/// Per-activity carbon estimate provider.
#[async_trait]
pub trait EstimateSource: Send + Sync {
    /// `Ok(None)` when the provider answered without a usable figure.
    async fn estimate_kg(&self, request: &EstimateRequest) -> Result<Option<f64>>;
}

/// Grid carbon intensity provider (gCO2/kWh).
#[async_trait]
pub trait IntensitySource: Send + Sync {
    /// `region = None` selects the national aggregate.
    async fn forecast(&self, region: Option<&str>) -> Result<Option<f64>>;
}

/// Weather and air quality provider.
#[async_trait]
pub trait ConditionsSource: Send + Sync {
    async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot>;
    async fn weather_for_city(&self, city: &str) -> Result<WeatherSnapshot>;
    async fn air_pollution(&self, lat: f64, lon: f64) -> Result<AirQuality>;
    async fn nearby(&self, lat: f64, lon: f64, count: u32) -> Result<Vec<NearbyPlace>>;
}

#[async_trait]
impl EstimateSource for CarbonInterfaceClient {
    async fn estimate_kg(&self, request: &EstimateRequest) -> Result<Option<f64>> {
        self.estimate(request).await
    }
}

#[async_trait]
impl IntensitySource for CarbonIntensityClient {
    async fn forecast(&self, region: Option<&str>) -> Result<Option<f64>> {
        CarbonIntensityClient::forecast(self, region).await
    }
}

#[async_trait]
impl ConditionsSource for OpenWeatherClient {
    async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
        OpenWeatherClient::weather_by_coords(self, lat, lon).await
    }

    async fn weather_for_city(&self, city: &str) -> Result<WeatherSnapshot> {
        OpenWeatherClient::weather_for_city(self, city).await
    }

    async fn air_pollution(&self, lat: f64, lon: f64) -> Result<AirQuality> {
        OpenWeatherClient::air_pollution(self, lat, lon).await
    }

    async fn nearby(&self, lat: f64, lon: f64, count: u32) -> Result<Vec<NearbyPlace>> {
        OpenWeatherClient::nearby(self, lat, lon, count).await
    }
}

// ── Gateway ───────────────────────────────────────────────────────────

/// Process-wide gateway owning the provider clients and their caches.
pub struct ThirdPartyGateway {
    estimates: Option<Arc<dyn EstimateSource>>,
    intensity: Arc<dyn IntensitySource>,
    conditions: Option<Arc<dyn ConditionsSource>>,
    provider: CarbonInterfaceConfig,
    default_region: Option<String>,
    default_city: String,
    request_timeout: Duration,
    grid_intensity: TtlCache<String, f64>,
    weather: TtlCache<String, WeatherSnapshot>,
    air_pollution: TtlCache<String, AirQuality>,
    nearby: TtlCache<String, Vec<NearbyPlace>>,
}

impl ThirdPartyGateway {
    /// Gateway with the given grid source and no keyed providers.
    pub fn new(config: &EcoConfig, intensity: Arc<dyn IntensitySource>) -> Self {
        Self {
            estimates: None,
            intensity,
            conditions: None,
            provider: config.carbon_interface.clone(),
            default_region: config.carbon_intensity.default_region().map(str::to_string),
            default_city: config.openweather.city.trim().to_string(),
            request_timeout: config.request_timeout(),
            grid_intensity: TtlCache::new(),
            weather: TtlCache::new(),
            air_pollution: TtlCache::new(),
            nearby: TtlCache::new(),
        }
    }

    /// Build the HTTP clients. Keyed providers are only wired in when their
    /// API key is configured.
    pub fn from_config(config: &EcoConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let intensity = CarbonIntensityClient::new(&config.carbon_intensity, timeout)?;
        let mut gateway = Self::new(config, Arc::new(intensity));

        if config.carbon_interface.is_enabled() {
            let client = CarbonInterfaceClient::new(&config.carbon_interface, timeout)?;
            gateway = gateway.with_estimates(Arc::new(client));
        } else {
            debug!("CARBON_INTERFACE_API_KEY not set, provider estimates disabled");
        }

        if config.openweather.is_enabled() {
            let client = OpenWeatherClient::new(&config.openweather, timeout)?;
            gateway = gateway.with_conditions(Arc::new(client));
        } else {
            debug!("OPENWEATHER_API_KEY not set, weather lookups disabled");
        }

        Ok(gateway)
    }

    pub fn with_estimates(mut self, source: Arc<dyn EstimateSource>) -> Self {
        self.estimates = Some(source);
        self
    }

    pub fn with_conditions(mut self, source: Arc<dyn ConditionsSource>) -> Self {
        self.conditions = Some(source);
        self
    }

    /// Run a provider call under the request timeout.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                timeout_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }

    /// Serve `key` from `cache`, or run `fetch` and cache its outcome.
    async fn cached<V: Clone>(
        &self,
        cache: &TtlCache<String, V>,
        key: String,
        what: &str,
        fetch: impl Future<Output = Result<V>>,
    ) -> Option<V> {
        if let Some(hit) = cache.get(&key) {
            debug!("{} cache hit for {}", what, key);
            return hit;
        }

        let purged = cache.purge_expired();
        if purged > 0 {
            debug!("Purged {} expired {} entries", purged, what);
        }

        let value = match self.bounded(fetch).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("{} lookup for {} failed: {}", what, key, e);
                None
            }
        };
        cache.store(key, value)
    }

    /// Provider CO2e estimate in kg, or `None` when the provider is not
    /// configured, does not cover the activity, or fails.
    pub async fn estimate_provider_kg(
        &self,
        activity: &ActivityType,
        quantity: f64,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Option<f64> {
        if !self.provider.is_enabled() {
            return None;
        }
        let source = self.estimates.as_ref()?;
        let request = EstimateRequest::for_activity(activity, quantity, occurred_at, &self.provider)?;

        match self.bounded(source.estimate_kg(&request)).await {
            Ok(Some(kg)) => Some(kg),
            Ok(None) => {
                debug!("Provider estimate for {} had no carbon_kg", activity);
                None
            }
            Err(e) => {
                warn!("Provider estimate for {} failed: {}", activity, e);
                None
            }
        }
    }

    /// Grid intensity in gCO2/kWh for `region`, the configured default
    /// region, or the national aggregate, in that order.
    pub async fn get_grid_intensity(&self, region: Option<&str>) -> Option<f64> {
        let region_id = region
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or(self.default_region.as_deref());
        let key = region_id.unwrap_or(NATIONAL_KEY).to_string();

        let fetch = async {
            self.intensity
                .forecast(region_id)
                .await?
                .ok_or_else(|| Error::CarbonIntensity("response had no forecast intensity".into()))
        };
        self.cached(&self.grid_intensity, key, "Grid intensity", fetch)
            .await
    }

    /// Current weather at a coordinate.
    pub async fn weather_by_coords(&self, lat: f64, lon: f64) -> Option<WeatherSnapshot> {
        let source = self.conditions.as_ref()?;
        let key = coord_key(lat, lon);
        self.cached(&self.weather, key, "Weather", source.weather_by_coords(lat, lon))
            .await
    }

    /// Current weather for `city`, defaulting to the configured city.
    pub async fn weather_for_city(&self, city: Option<&str>) -> Option<WeatherSnapshot> {
        let source = self.conditions.as_ref()?;
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_city.as_str());
        if city.is_empty() {
            return None;
        }
        let key = format!("city:{}", city.to_lowercase());
        self.cached(&self.weather, key, "Weather", source.weather_for_city(city))
            .await
    }

    /// Air quality at a coordinate.
    pub async fn air_pollution(&self, lat: f64, lon: f64) -> Option<AirQuality> {
        let source = self.conditions.as_ref()?;
        let key = coord_key(lat, lon);
        self.cached(&self.air_pollution, key, "Air pollution", source.air_pollution(lat, lon))
            .await
    }

    /// Places around a coordinate with their weather. Empty on failure.
    pub async fn nearby_places(&self, lat: f64, lon: f64, count: Option<u32>) -> Vec<NearbyPlace> {
        let Some(source) = self.conditions.as_ref() else {
            return Vec::new();
        };
        let count = clamp_nearby_count(count);
        let key = format!("{},{}", coord_key(lat, lon), count);
        self.cached(&self.nearby, key, "Nearby places", source.nearby(lat, lon, count))
            .await
            .unwrap_or_default()
    }
}

/// Coordinates rounded to two decimals (~1 km).
pub fn coord_key(lat: f64, lon: f64) -> String {
    format!("{:.2},{:.2}", lat, lon)
}

pub fn clamp_nearby_count(count: Option<u32>) -> u32 {
    count
        .unwrap_or(DEFAULT_NEARBY_COUNT)
        .clamp(1, MAX_NEARBY_COUNT)
}

#[cfg(test)]
pub(crate) mod stubs {
    //! In-process provider stand-ins that count their calls.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct StubEstimates {
        pub result: Result<Option<f64>>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<EstimateRequest>>,
    }

    impl StubEstimates {
        pub fn returning(kg: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(kg),
                delay: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: Err(Error::CarbonInterface("returned 500".into())),
                delay: None,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn slow(kg: f64, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(Some(kg)),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EstimateSource for StubEstimates {
        async fn estimate_kg(&self, request: &EstimateRequest) -> Result<Option<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.result {
                Ok(kg) => Ok(*kg),
                Err(e) => Err(Error::Other(e.to_string())),
            }
        }
    }

    pub struct StubIntensity {
        pub value: Mutex<Option<f64>>,
        pub fail: bool,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
        pub regions: Mutex<Vec<Option<String>>>,
    }

    impl StubIntensity {
        pub fn returning(value: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                value: Mutex::new(value),
                fail: false,
                delay: None,
                calls: AtomicUsize::new(0),
                regions: Mutex::new(Vec::new()),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                value: Mutex::new(None),
                fail: true,
                delay: None,
                calls: AtomicUsize::new(0),
                regions: Mutex::new(Vec::new()),
            })
        }

        pub fn slow(value: f64, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                value: Mutex::new(Some(value)),
                fail: false,
                delay: Some(delay),
                calls: AtomicUsize::new(0),
                regions: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IntensitySource for StubIntensity {
        async fn forecast(&self, region: Option<&str>) -> Result<Option<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.regions.lock().unwrap().push(region.map(str::to_string));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(Error::CarbonIntensity("connection refused".into()));
            }
            Ok(*self.value.lock().unwrap())
        }
    }

    pub struct StubConditions {
        pub calls: AtomicUsize,
        pub fail: bool,
    }

    impl StubConditions {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: false,
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: true,
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::OpenWeather("returned 401".into()))
            } else {
                Ok(())
            }
        }
    }

    pub fn snapshot(city: &str, condition: &str, temp_c: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            city: city.to_string(),
            temp_c,
            humidity: Some(60.0),
            condition: condition.to_string(),
            description: None,
            wind_speed_ms: Some(3.0),
        }
    }

    #[async_trait]
    impl ConditionsSource for StubConditions {
        async fn weather_by_coords(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot> {
            self.check()?;
            Ok(snapshot(&coord_key(lat, lon), "Clear", 21.0))
        }

        async fn weather_for_city(&self, city: &str) -> Result<WeatherSnapshot> {
            self.check()?;
            Ok(snapshot(city, "Clouds", 29.0))
        }

        async fn air_pollution(&self, _lat: f64, _lon: f64) -> Result<AirQuality> {
            self.check()?;
            Ok(AirQuality {
                aqi: 2,
                components: Default::default(),
            })
        }

        async fn nearby(&self, lat: f64, lon: f64, count: u32) -> Result<Vec<NearbyPlace>> {
            self.check()?;
            Ok((0..count.min(3))
                .map(|i| NearbyPlace {
                    name: format!("Place {i}"),
                    lat: lat + f64::from(i) * 0.01,
                    lon,
                    weather: snapshot("Place", "Rain", 25.0),
                })
                .collect())
        }
    }
}
