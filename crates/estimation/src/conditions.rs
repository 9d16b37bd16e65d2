//! Environmental conditions for map views: weather, air quality and grid
//! intensity per location.

use chrono::{DateTime, Utc};
use common::{AirQuality, Error, Result, WeatherSnapshot};
use futures_util::future::join_all;
use serde::Serialize;

use crate::gateway::ThirdPartyGateway;

/// A predefined map location. `region` is its grid region id, if covered.
#[derive(Debug, Clone, Copy)]
pub struct MapLocation {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub region: Option<&'static str>,
}

const fn loc(name: &'static str, lat: f64, lon: f64, region: Option<&'static str>) -> MapLocation {
    MapLocation {
        name,
        lat,
        lon,
        region,
    }
}

pub const DEFAULT_LOCATIONS: [MapLocation; 18] = [
    loc("London", 51.5074, -0.1278, Some("1")),
    loc("Paris", 48.8566, 2.3522, None),
    loc("Berlin", 52.5200, 13.4050, None),
    loc("Madrid", 40.4168, -3.7038, None),
    loc("Rome", 41.9028, 12.4964, None),
    loc("Amsterdam", 52.3676, 4.9041, None),
    loc("Brussels", 50.8503, 4.3517, None),
    loc("Vienna", 48.2082, 16.3738, None),
    loc("Stockholm", 59.3293, 18.0686, None),
    loc("Copenhagen", 55.6761, 12.5683, None),
    loc("Oslo", 59.9139, 10.7522, None),
    loc("Dublin", 53.3498, -6.2603, None),
    loc("Lisbon", 38.7223, -9.1393, None),
    loc("Athens", 37.9838, 23.7275, None),
    loc("Warsaw", 52.2297, 21.0122, None),
    loc("Prague", 50.0755, 14.4378, None),
    loc("Budapest", 47.4979, 19.0402, None),
    loc("Zurich", 47.3769, 8.5417, None),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub weather: Option<WeatherSnapshot>,
    pub air_pollution: Option<AirQuality>,
    pub grid_intensity: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyConditions {
    pub center: Coordinates,
    pub locations: Vec<LocationConditions>,
    pub timestamp: DateTime<Utc>,
}

pub fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
    let lon_ok = lon.is_finite() && (-180.0..=180.0).contains(&lon);
    if lat_ok && lon_ok {
        Ok(())
    } else {
        Err(Error::InvalidCoordinates { lat, lon })
    }
}

impl ThirdPartyGateway {
    /// Weather, air quality and grid intensity at one coordinate. The three
    /// lookups are independent and run concurrently.
    pub async fn location_conditions(
        &self,
        lat: f64,
        lon: f64,
        region: Option<&str>,
    ) -> Result<LocationConditions> {
        validate_coordinates(lat, lon)?;

        let (weather, air_pollution, grid_intensity) = tokio::join!(
            self.weather_by_coords(lat, lon),
            self.air_pollution(lat, lon),
            self.get_grid_intensity(region),
        );

        Ok(LocationConditions {
            name: None,
            lat,
            lon,
            weather,
            air_pollution,
            grid_intensity,
            timestamp: Utc::now(),
        })
    }

    /// Conditions for every predefined location. Locations outside the grid
    /// provider's coverage report no intensity.
    pub async fn map_overview(&self) -> Vec<LocationConditions> {
        join_all(DEFAULT_LOCATIONS.iter().map(|location| self.map_location(location))).await
    }

    async fn map_location(&self, loc: &MapLocation) -> LocationConditions {
        let grid = async {
            match loc.region {
                Some(region) => self.get_grid_intensity(Some(region)).await,
                None => None,
            }
        };
        let (weather, air_pollution, grid_intensity) = tokio::join!(
            self.weather_by_coords(loc.lat, loc.lon),
            self.air_pollution(loc.lat, loc.lon),
            grid,
        );

        LocationConditions {
            name: Some(loc.name.to_string()),
            lat: loc.lat,
            lon: loc.lon,
            weather,
            air_pollution,
            grid_intensity,
            timestamp: Utc::now(),
        }
    }

    /// Places around a coordinate, each with its air quality.
    pub async fn nearby_conditions(
        &self,
        lat: f64,
        lon: f64,
        count: Option<u32>,
    ) -> Result<NearbyConditions> {
        validate_coordinates(lat, lon)?;

        let places = self.nearby_places(lat, lon, count).await;
        let locations = join_all(places.into_iter().map(|place| async move {
            let air_pollution = self.air_pollution(place.lat, place.lon).await;
            LocationConditions {
                name: Some(place.name),
                lat: place.lat,
                lon: place.lon,
                weather: Some(place.weather),
                air_pollution,
                grid_intensity: None,
                timestamp: Utc::now(),
            }
        }))
        .await;

        Ok(NearbyConditions {
            center: Coordinates { lat, lon },
            locations,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::stubs::{StubConditions, StubIntensity};
    use common::EcoConfig;

    fn gateway(intensity: std::sync::Arc<StubIntensity>) -> ThirdPartyGateway {
        ThirdPartyGateway::new(&EcoConfig::default(), intensity).with_conditions(StubConditions::new())
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(6.9271, 79.8612).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(validate_coordinates(90.5, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.1).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[tokio::test]
    async fn test_location_conditions() {
        let gw = gateway(StubIntensity::returning(Some(120.0)));
        let data = gw
            .location_conditions(6.9271, 79.8612, Some("1"))
            .await
            .expect("valid coordinates");

        assert!(data.weather.is_some());
        assert_eq!(data.air_pollution.map(|a| a.aqi), Some(2));
        assert_eq!(data.grid_intensity, Some(120.0));
    }

    #[tokio::test]
    async fn test_location_conditions_rejects_bad_coordinates() {
        let intensity = StubIntensity::returning(Some(120.0));
        let gw = gateway(intensity.clone());
        let err = gw.location_conditions(123.0, 0.0, None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCoordinates { .. }));
        assert_eq!(intensity.calls(), 0);
    }

    #[tokio::test]
    async fn test_map_overview_only_queries_grid_for_covered_locations() {
        let intensity = StubIntensity::returning(Some(95.0));
        let gw = gateway(intensity.clone());

        let overview = gw.map_overview().await;
        assert_eq!(overview.len(), DEFAULT_LOCATIONS.len());

        let london = overview
            .iter()
            .find(|l| l.name.as_deref() == Some("London"))
            .unwrap();
        assert_eq!(london.grid_intensity, Some(95.0));
        assert!(overview
            .iter()
            .filter(|l| l.name.as_deref() != Some("London"))
            .all(|l| l.grid_intensity.is_none() && l.weather.is_some()));
        assert_eq!(intensity.calls(), 1);
    }

    #[tokio::test]
    async fn test_nearby_conditions() {
        let gw = gateway(StubIntensity::returning(Some(95.0)));
        let nearby = gw
            .nearby_conditions(6.9271, 79.8612, Some(5))
            .await
            .unwrap();

        assert_eq!(nearby.center, Coordinates { lat: 6.9271, lon: 79.8612 });
        assert_eq!(nearby.locations.len(), 3);
        assert!(nearby
            .locations
            .iter()
            .all(|l| l.air_pollution.is_some() && l.grid_intensity.is_none()));
    }
}
